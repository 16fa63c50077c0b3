//! Value generators, one per verb.

pub mod choose;
pub mod primitives;
pub mod unique;
pub mod vocabulary;

use rand::Rng;
use toydata_notation::{Directive, Verb};

use crate::context::GenerationContext;
use crate::errors::GenerationError;
use crate::resolver::{Cardinality, Scope};
use crate::value::GeneratedValue;

/// Generate the value of one directive for row `row`.
///
/// `unique_scope` keys the UNIQUE counter of the field being generated.
/// Object references are composed by the caller and never reach this point.
pub fn generate(
    directive: &Directive,
    row: u64,
    unique_scope: &str,
    scope: Scope<'_>,
    ctx: &mut GenerationContext,
) -> Result<GeneratedValue, GenerationError> {
    let cardinality = Cardinality::of(directive, scope.config)?;

    match &directive.verb {
        Verb::Unique { kind } => repeat(cardinality, ctx, |ctx| {
            Ok(unique::next(*kind, unique_scope, ctx))
        }),
        Verb::Choose { source } => {
            let cap = ctx.options().range_choice_cap;
            choose::generate(source, cardinality, cap, scope, ctx.rng())
        }
        Verb::Date { format } => {
            let (min, max) = (ctx.options().date_min, ctx.options().date_max);
            repeat(cardinality, ctx, |ctx| {
                primitives::date(format, min, max, ctx.rng())
            })
        }
        Verb::Constant { constant } => vocabulary::generate(*constant, cardinality, ctx.rng()),
        Verb::Raw { ty } => repeat(cardinality, ctx, |ctx| Ok(primitives::raw(*ty, ctx.rng()))),
        Verb::SharedRef(name) => scope.shared.aligned(name, row),
        Verb::ConfigRef(name) => Ok(GeneratedValue::Int(scope.config.get(name)?)),
        Verb::Literal(value) => Ok(value.into()),
        Verb::ObjectRef(key) => Err(GenerationError::Unsupported(format!(
            "object reference {key} cannot be used here"
        ))),
    }
}

/// Run `one` once for a scalar, or per element for a counted directive.
///
/// Verbs without a finite source bound `[n]` by the range choice cap.
fn repeat(
    cardinality: Cardinality,
    ctx: &mut GenerationContext,
    mut one: impl FnMut(&mut GenerationContext) -> Result<GeneratedValue, GenerationError>,
) -> Result<GeneratedValue, GenerationError> {
    let count = match cardinality {
        Cardinality::Single => return one(ctx),
        Cardinality::Fixed(count) => count,
        Cardinality::Random => {
            let max = ctx.options().range_choice_cap.max(1);
            ctx.rng().random_range(1..=max) as usize
        }
    };
    (0..count)
        .map(|_| one(ctx))
        .collect::<Result<Vec<_>, _>>()
        .map(GeneratedValue::List)
}
