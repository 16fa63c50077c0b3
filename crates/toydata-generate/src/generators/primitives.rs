use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use toydata_notation::RawType;

use crate::errors::GenerationError;
use crate::value::GeneratedValue;

const INT_MAX: i64 = 1000;
const FLOAT_MAX: f64 = 1000.0;
const TEXT_LEN: usize = 10;

/// One random value of a raw type tag.
///
/// `int` is uniform in `[0, 1000]`, `float` uniform in `[0, 1000)` rounded
/// to two decimals, `str` ten alphanumeric characters, `bool` a fair coin.
pub fn raw(ty: RawType, rng: &mut impl Rng) -> GeneratedValue {
    match ty {
        RawType::Int => GeneratedValue::Int(rng.random_range(0..=INT_MAX)),
        RawType::Float => {
            let value: f64 = rng.random_range(0.0..FLOAT_MAX);
            GeneratedValue::Float((value * 100.0).round() / 100.0)
        }
        RawType::Str => GeneratedValue::Text(
            (0..TEXT_LEN)
                .map(|_| rng.sample(Alphanumeric) as char)
                .collect(),
        ),
        RawType::Bool => GeneratedValue::Bool(rng.random_bool(0.5)),
    }
}

/// A uniformly random second between `min` 00:00:00 and `max` 23:59:59,
/// rendered with a strftime `format`.
pub fn date(
    format: &str,
    min: NaiveDate,
    max: NaiveDate,
    rng: &mut impl Rng,
) -> Result<GeneratedValue, GenerationError> {
    if max < min {
        return Err(GenerationError::InvalidCardinality(format!(
            "date range {min}..{max} is inverted"
        )));
    }
    let start = Utc.from_utc_datetime(&min.and_time(NaiveTime::MIN));
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let end = Utc.from_utc_datetime(&max.and_time(end_of_day));
    let span = (end - start).num_seconds();
    let offset = rng.random_range(0..=span);
    let instant = start + chrono::Duration::seconds(offset);
    Ok(GeneratedValue::Text(render(instant, format)?))
}

fn render(instant: DateTime<Utc>, format: &str) -> Result<String, GenerationError> {
    let mut out = String::new();
    write!(out, "{}", instant.format(format)).map_err(|_| {
        GenerationError::Unsupported(format!("DATE format `{format}` cannot be rendered"))
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn raw_values_stay_in_documented_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for _ in 0..200 {
            let int = raw(RawType::Int, &mut rng).as_i64().expect("int");
            assert!((0..=1000).contains(&int));

            let GeneratedValue::Float(float) = raw(RawType::Float, &mut rng) else {
                panic!("expected float");
            };
            assert!((0.0..=1000.0).contains(&float));
            assert_eq!((float * 100.0).round() / 100.0, float);

            let text = raw(RawType::Str, &mut rng);
            let text = text.as_str().expect("text");
            assert_eq!(text.len(), 10);
            assert!(text.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn dates_fall_inside_the_window() {
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let min = NaiveDate::from_ymd_opt(2023, 3, 1).expect("date");
        let max = NaiveDate::from_ymd_opt(2023, 3, 2).expect("date");
        for _ in 0..100 {
            let value = date("%Y-%m-%d", min, max, &mut rng).expect("date");
            let text = value.as_str().expect("text");
            assert!(text == "2023-03-01" || text == "2023-03-02", "{text}");
        }
        let stamped = date("%Y-%m-%dT%H:%M:%S%z", min, min, &mut rng).expect("timestamp");
        assert!(stamped.as_str().expect("text").ends_with("+0000"));
    }
}
