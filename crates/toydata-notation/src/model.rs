use std::fmt;

use serde::Serialize;

/// A parsed, typed generation instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directive {
    pub verb: Verb,
    /// Cardinality clause; `None` produces a single value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<CountSpec>,
    /// Notation the directive was parsed from.
    pub raw: String,
}

impl Directive {
    /// Directive emitting a YAML scalar unchanged.
    pub fn literal(value: serde_json::Value) -> Self {
        Self {
            raw: value.to_string(),
            verb: Verb::Literal(value),
            count: None,
        }
    }

    /// Name of the shared column when the whole directive is `[[name]]`.
    pub fn shared_ref(&self) -> Option<&str> {
        match &self.verb {
            Verb::SharedRef(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn object_ref(&self) -> Option<&ObjectKey> {
        match &self.verb {
            Verb::ObjectRef(key) => Some(key),
            _ => None,
        }
    }

    /// Config variables this directive depends on, in source order.
    pub fn config_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        if let Verb::ConfigRef(name) = &self.verb {
            refs.push(name.as_str());
        }
        if let Some(CountSpec::Config(name)) = &self.count {
            refs.push(name.as_str());
        }
        refs
    }
}

/// Closed set of generation verbs, resolved once at parse time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verb", content = "args", rename_all = "snake_case")]
pub enum Verb {
    Unique { kind: UniqueKind },
    Choose { source: ChoiceSource },
    Date { format: String },
    Constant { constant: ConstantRef },
    Raw { ty: RawType },
    ObjectRef(ObjectKey),
    SharedRef(String),
    ConfigRef(String),
    Literal(serde_json::Value),
}

impl Verb {
    /// Short label used for usage counters and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Verb::Unique { .. } => "unique",
            Verb::Choose { .. } => "choose",
            Verb::Date { .. } => "date",
            Verb::Constant { .. } => "constant",
            Verb::Raw { .. } => "raw",
            Verb::ObjectRef(_) => "object_ref",
            Verb::SharedRef(_) => "shared_ref",
            Verb::ConfigRef(_) => "config_ref",
            Verb::Literal(_) => "literal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueKind {
    Int,
    Str,
}

/// Source of a `CHOOSE` draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceSource {
    /// Enumerated literal choices.
    List(Vec<String>),
    /// Inclusive integer range `lo-hi`.
    Range { lo: i64, hi: i64 },
    /// Values of a shared column, resolved at generation time.
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawType {
    Str,
    Int,
    Float,
    Bool,
}

impl RawType {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "str" => Some(RawType::Str),
            "int" => Some(RawType::Int),
            "float" => Some(RawType::Float),
            "bool" => Some(RawType::Bool),
            _ => None,
        }
    }
}

/// A named constant in singular (one entry) or plural (sequence) form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConstantRef {
    pub vocabulary: Vocabulary,
    pub plural: bool,
}

impl ConstantRef {
    pub fn from_word(word: &str) -> Option<Self> {
        Vocabulary::ALL.iter().find_map(|vocabulary| {
            if vocabulary.singular() == word {
                Some(ConstantRef {
                    vocabulary: *vocabulary,
                    plural: false,
                })
            } else if vocabulary.plural() == word {
                Some(ConstantRef {
                    vocabulary: *vocabulary,
                    plural: true,
                })
            } else {
                None
            }
        })
    }
}

/// Built-in vocabularies backing the named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Vocabulary {
    /// Full names, composed from first and last names.
    Name,
    FirstName,
    LastName,
    PostTitle,
    Location,
    Permission,
    Theme,
    Language,
    PostTag,
    AdminActivity,
    Job,
}

impl Vocabulary {
    pub const ALL: [Vocabulary; 11] = [
        Vocabulary::Name,
        Vocabulary::FirstName,
        Vocabulary::LastName,
        Vocabulary::PostTitle,
        Vocabulary::Location,
        Vocabulary::Permission,
        Vocabulary::Theme,
        Vocabulary::Language,
        Vocabulary::PostTag,
        Vocabulary::AdminActivity,
        Vocabulary::Job,
    ];

    pub fn singular(self) -> &'static str {
        match self {
            Vocabulary::Name => "NAME",
            Vocabulary::FirstName => "FIRST_NAME",
            Vocabulary::LastName => "LAST_NAME",
            Vocabulary::PostTitle => "POST_TITLE",
            Vocabulary::Location => "LOCATION",
            Vocabulary::Permission => "PERMISSION",
            Vocabulary::Theme => "THEME",
            Vocabulary::Language => "LANGUAGE",
            Vocabulary::PostTag => "POST_TAG",
            Vocabulary::AdminActivity => "ADMIN_ACTIVITY",
            Vocabulary::Job => "JOB",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Vocabulary::Name => "NAMES",
            Vocabulary::FirstName => "FIRST_NAMES",
            Vocabulary::LastName => "LAST_NAMES",
            Vocabulary::PostTitle => "POST_TITLES",
            Vocabulary::Location => "LOCATIONS",
            Vocabulary::Permission => "PERMISSIONS",
            Vocabulary::Theme => "THEMES",
            Vocabulary::Language => "LANGUAGES",
            Vocabulary::PostTag => "POST_TAGS",
            Vocabulary::AdminActivity => "ADMIN_ACTIVITIES",
            Vocabulary::Job => "JOBS",
        }
    }
}

/// Namespace-qualified object template name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Cardinality clause of a directive or row count of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSpec {
    /// `[N]`, always at least 1.
    Literal(u64),
    /// `[[CONFIG_NAME]]`.
    Config(String),
    /// `[n]`: cardinality drawn at generation time.
    Random,
}

/// Parsed `name[count]` key of a shared column or table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryKey {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<CountSpec>,
}
