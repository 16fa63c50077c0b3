use toydata_notation::UniqueKind;

use crate::context::GenerationContext;
use crate::value::GeneratedValue;

/// Next unused value of `scope`.
///
/// Integers count up from the configured base; strings render the raw
/// counter as `unique_0000`.
pub fn next(kind: UniqueKind, scope: &str, ctx: &mut GenerationContext) -> GeneratedValue {
    let counter = ctx.next_unique(scope);
    match kind {
        UniqueKind::Int => GeneratedValue::Int(ctx.options().unique_int_base + counter as i64),
        UniqueKind::Str => GeneratedValue::Text(format!("unique_{counter:04}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerateOptions;

    #[test]
    fn ints_start_at_the_base_and_strings_at_zero() {
        let mut ctx = GenerationContext::new(0, GenerateOptions::default());
        assert_eq!(
            next(UniqueKind::Int, "shared:user_id", &mut ctx),
            GeneratedValue::Int(1000)
        );
        assert_eq!(
            next(UniqueKind::Int, "shared:user_id", &mut ctx),
            GeneratedValue::Int(1001)
        );
        assert_eq!(
            next(UniqueKind::Str, "table:users.handle", &mut ctx),
            GeneratedValue::Text("unique_0000".into())
        );
    }

    #[test]
    fn base_is_configurable() {
        let options = GenerateOptions {
            unique_int_base: 1,
            ..GenerateOptions::default()
        };
        let mut ctx = GenerationContext::new(0, options);
        assert_eq!(next(UniqueKind::Int, "s", &mut ctx), GeneratedValue::Int(1));
    }
}
