use rand::Rng;
use toydata_notation::ChoiceSource;

use crate::errors::GenerationError;
use crate::resolver::{Cardinality, Scope};
use crate::value::GeneratedValue;

/// Draw from a `CHOOSE` source, with replacement.
///
/// `[n]` draws the cardinality from `[1, source size]`; for ranges the size
/// is capped at `range_cap`.
pub fn generate(
    source: &ChoiceSource,
    cardinality: Cardinality,
    range_cap: u64,
    scope: Scope<'_>,
    rng: &mut impl Rng,
) -> Result<GeneratedValue, GenerationError> {
    let pool = Pool::new(source, scope)?;
    let count = match cardinality {
        Cardinality::Single => return Ok(pool.draw(rng)),
        Cardinality::Fixed(count) => count,
        Cardinality::Random => {
            let max = pool.random_cardinality_bound(range_cap).max(1);
            rng.random_range(1..=max) as usize
        }
    };

    Ok(GeneratedValue::List(
        (0..count).map(|_| pool.draw(rng)).collect(),
    ))
}

enum Pool<'a> {
    Literals(&'a [String]),
    Range { lo: i64, hi: i64 },
    Shared(&'a [GeneratedValue]),
}

impl<'a> Pool<'a> {
    fn new(source: &'a ChoiceSource, scope: Scope<'a>) -> Result<Self, GenerationError> {
        let pool = match source {
            ChoiceSource::List(items) => Pool::Literals(items),
            ChoiceSource::Range { lo, hi } => Pool::Range { lo: *lo, hi: *hi },
            ChoiceSource::Named(name) => Pool::Shared(scope.shared.get(name)?),
        };
        if pool.is_empty() {
            return Err(GenerationError::InvalidCardinality(
                "CHOOSE source is empty".to_string(),
            ));
        }
        Ok(pool)
    }

    fn is_empty(&self) -> bool {
        match self {
            Pool::Literals(items) => items.is_empty(),
            Pool::Range { lo, hi } => hi < lo,
            Pool::Shared(values) => values.is_empty(),
        }
    }

    fn random_cardinality_bound(&self, range_cap: u64) -> u64 {
        match self {
            Pool::Literals(items) => items.len() as u64,
            Pool::Range { lo, hi } => (hi.abs_diff(*lo) + 1).min(range_cap),
            Pool::Shared(values) => values.len() as u64,
        }
    }

    fn draw(&self, rng: &mut impl Rng) -> GeneratedValue {
        match self {
            Pool::Literals(items) => {
                GeneratedValue::Text(items[rng.random_range(0..items.len())].clone())
            }
            Pool::Range { lo, hi } => GeneratedValue::Int(rng.random_range(*lo..=*hi)),
            Pool::Shared(values) => values[rng.random_range(0..values.len())].clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::resolver::{ConfigTable, SharedStore};

    fn letters() -> ChoiceSource {
        ChoiceSource::List(vec!["a".into(), "b".into(), "c".into()])
    }

    fn with_scope<T>(f: impl FnOnce(Scope<'_>) -> T) -> T {
        let config = ConfigTable::default();
        let mut shared = SharedStore::default();
        shared.insert(
            "user_id",
            vec![GeneratedValue::Int(1000), GeneratedValue::Int(1001)],
        );
        f(Scope {
            config: &config,
            shared: &shared,
        })
    }

    #[test]
    fn random_cardinality_stays_within_list_size() {
        with_scope(|scope| {
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let mut seen = std::collections::BTreeSet::new();
            for _ in 0..500 {
                let value =
                    generate(&letters(), Cardinality::Random, 5, scope, &mut rng).expect("draw");
                let len = value.as_list().expect("list").len();
                assert!((1..=3).contains(&len));
                seen.insert(len);
            }
            assert_eq!(seen.len(), 3);
        });
    }

    #[test]
    fn fixed_cardinality_is_exact_and_single_is_scalar() {
        with_scope(|scope| {
            let mut rng = ChaCha8Rng::seed_from_u64(12);
            for _ in 0..100 {
                let value =
                    generate(&letters(), Cardinality::Fixed(2), 5, scope, &mut rng).expect("draw");
                assert_eq!(value.as_list().expect("list").len(), 2);
            }
            let single = generate(&letters(), Cardinality::Single, 5, scope, &mut rng).expect("one");
            assert!(["a", "b", "c"].contains(&single.as_str().expect("text")));
        });
    }

    #[test]
    fn ranges_are_inclusive_and_capped() {
        with_scope(|scope| {
            let mut rng = ChaCha8Rng::seed_from_u64(13);
            let source = ChoiceSource::Range { lo: 21, hi: 89 };
            for _ in 0..300 {
                let value =
                    generate(&source, Cardinality::Random, 5, scope, &mut rng).expect("draw");
                let values = value.as_list().expect("list");
                assert!((1..=5).contains(&values.len()));
                for item in values {
                    let item = item.as_i64().expect("int");
                    assert!((21..=89).contains(&item));
                }
            }

            let narrow = ChoiceSource::Range { lo: 4, hi: 5 };
            for _ in 0..100 {
                let value =
                    generate(&narrow, Cardinality::Random, 5, scope, &mut rng).expect("draw");
                assert!(value.as_list().expect("list").len() <= 2);
            }
        });
    }

    #[test]
    fn named_sources_draw_from_shared_columns() {
        with_scope(|scope| {
            let mut rng = ChaCha8Rng::seed_from_u64(14);
            let source = ChoiceSource::Named("user_id".into());
            let value = generate(&source, Cardinality::Single, 5, scope, &mut rng).expect("draw");
            assert!(matches!(value.as_i64(), Some(1000 | 1001)));

            let missing = ChoiceSource::Named("nope".into());
            assert!(matches!(
                generate(&missing, Cardinality::Single, 5, scope, &mut rng),
                Err(GenerationError::UndefinedReference { .. })
            ));
        });
    }
}
