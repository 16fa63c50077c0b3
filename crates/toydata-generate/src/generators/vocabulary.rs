use rand::Rng;
use rand::seq::IndexedRandom;
use toydata_notation::{ConstantRef, Vocabulary};

use crate::errors::GenerationError;
use crate::resolver::Cardinality;
use crate::value::GeneratedValue;

pub const FIRST_NAMES: &[&str] = &[
    "Alice", "Bob", "Charlie", "Diana", "Edward", "Fiona", "George", "Helen", "Ian", "Julia",
    "Kevin", "Luna", "Mark", "Nina", "Oscar", "Paula",
];

pub const LAST_NAMES: &[&str] = &[
    "Anderson", "Brown", "Chen", "Davis", "Evans", "Foster", "Garcia", "Harris", "Jackson", "Kim",
    "Lopez", "Miller", "Nelson", "O'Connor", "Parker", "Quinn",
];

pub const POST_TITLES: &[&str] = &[
    "Introduction to APIs",
    "Building Scalable Systems",
    "Database Design Patterns",
    "Security Best Practices",
    "Testing Strategies",
    "DevOps Fundamentals",
    "Code Review Guidelines",
    "Performance Optimization",
    "Documentation Standards",
];

pub const LOCATIONS: &[&str] = &[
    "San Francisco",
    "New York",
    "London",
    "Tokyo",
    "Berlin",
    "Toronto",
    "Sydney",
    "Amsterdam",
    "Barcelona",
    "Singapore",
    "Austin",
    "Seattle",
    "Portland",
];

pub const PERMISSIONS: &[&str] = &[
    "read", "write", "delete", "admin", "create", "update", "execute", "manage",
];

pub const THEMES: &[&str] = &["light", "dark", "auto"];

pub const LANGUAGES: &[&str] = &["en", "es", "fr", "de", "it", "pt", "ja", "ko", "zh"];

pub const POST_TAGS: &[&str] = &[
    "tech",
    "api",
    "tutorial",
    "guide",
    "tips",
    "best-practices",
    "development",
    "programming",
    "web",
    "mobile",
    "database",
    "security",
    "performance",
];

pub const ADMIN_ACTIVITIES: &[&str] = &[
    "User login",
    "Data backup",
    "System update",
    "Security scan",
    "Cache refresh",
    "Database maintenance",
    "Log rotation",
    "Config update",
];

pub const JOBS: &[&str] = &[
    "Software Engineer",
    "Data Scientist",
    "Product Manager",
    "Designer",
    "DevOps Engineer",
    "QA Engineer",
    "Technical Writer",
    "Support Specialist",
    "Sales Manager",
    "Marketing Analyst",
    "Accountant",
    "Recruiter",
];

/// Entries of a vocabulary. `Name` is backed by the first names and gets a
/// random last name attached per entry.
pub fn entries(vocabulary: Vocabulary) -> &'static [&'static str] {
    match vocabulary {
        Vocabulary::Name | Vocabulary::FirstName => FIRST_NAMES,
        Vocabulary::LastName => LAST_NAMES,
        Vocabulary::PostTitle => POST_TITLES,
        Vocabulary::Location => LOCATIONS,
        Vocabulary::Permission => PERMISSIONS,
        Vocabulary::Theme => THEMES,
        Vocabulary::Language => LANGUAGES,
        Vocabulary::PostTag => POST_TAGS,
        Vocabulary::AdminActivity => ADMIN_ACTIVITIES,
        Vocabulary::Job => JOBS,
    }
}

/// Generate a named constant.
///
/// Singular without count yields one entry; plural without count yields the
/// whole vocabulary. A count samples that many distinct entries.
pub fn generate(
    constant: ConstantRef,
    cardinality: Cardinality,
    rng: &mut impl Rng,
) -> Result<GeneratedValue, GenerationError> {
    let pool = entries(constant.vocabulary);
    let picked: Vec<&str> = match cardinality {
        Cardinality::Single if !constant.plural => {
            let entry = pool.choose(rng).copied().unwrap_or_default();
            return Ok(GeneratedValue::Text(render(constant.vocabulary, entry, rng)));
        }
        Cardinality::Single => pool.to_vec(),
        Cardinality::Fixed(count) => {
            if count > pool.len() {
                return Err(GenerationError::InvalidCardinality(format!(
                    "{} has {} entries; cannot pick {count} distinct ones",
                    constant.vocabulary.plural(),
                    pool.len()
                )));
            }
            pool.choose_multiple(rng, count).copied().collect()
        }
        Cardinality::Random => {
            let count = rng.random_range(1..=pool.len());
            pool.choose_multiple(rng, count).copied().collect()
        }
    };

    Ok(GeneratedValue::List(
        picked
            .into_iter()
            .map(|entry| GeneratedValue::Text(render(constant.vocabulary, entry, rng)))
            .collect(),
    ))
}

fn render(vocabulary: Vocabulary, entry: &str, rng: &mut impl Rng) -> String {
    match vocabulary {
        Vocabulary::Name => {
            let last = LAST_NAMES.choose(rng).copied().unwrap_or_default();
            format!("{entry} {last}")
        }
        _ => entry.to_string(),
    }
}
