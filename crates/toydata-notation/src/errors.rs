use std::fmt;

use thiserror::Error;

/// Errors raised while parsing a single notation string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    /// Malformed notation: unbalanced or wrong-kind brackets, unknown verb,
    /// bad count, inverted range.
    #[error("notation syntax error at position {position} near `{token}`: {message}")]
    Syntax {
        token: String,
        position: usize,
        message: String,
    },
    /// A count that can never produce values (zero or negative).
    #[error("invalid cardinality `{token}`: {message}")]
    InvalidCardinality { token: String, message: String },
}

impl NotationError {
    pub(crate) fn syntax(
        token: impl Into<String>,
        position: usize,
        message: impl Into<String>,
    ) -> Self {
        NotationError::Syntax {
            token: token.into(),
            position,
            message: message.into(),
        }
    }

    pub(crate) fn cardinality(token: impl Into<String>, message: impl Into<String>) -> Self {
        NotationError::InvalidCardinality {
            token: token.into(),
            message: message.into(),
        }
    }

    /// Stable issue code used in validation reports.
    pub fn code(&self) -> &'static str {
        match self {
            NotationError::Syntax { .. } => "notation_syntax",
            NotationError::InvalidCardinality { .. } => "invalid_cardinality",
        }
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Structured validation issue with location and hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    pub path: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            hint,
        }
    }
}

/// Aggregated validation report with errors and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error issue.
    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    /// Add a warning issue.
    pub fn push_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// First error with the given code, if any.
    pub fn find_error(&self, code: &str) -> Option<&ValidationIssue> {
        self.errors.iter().find(|issue| issue.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.errors.len())?;
        for issue in &self.errors {
            write!(f, "; {}: {}", issue.path, issue.message)?;
        }
        Ok(())
    }
}
