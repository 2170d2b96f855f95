use crate::Span;
use std::fmt;
use std::sync::Arc;

/// Detailed error information with source location
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub message: String,
    pub span: Span,
    pub source_id: String,
    pub source_text: Arc<str>,
    pub suggestion: Option<String>,
}

/// Error types for the Fathom engine
///
/// Construction errors (`MalformedRule`) surface when a ruleset is built.
/// Planning errors (`CircularDependency`, `MissingProducer`) surface before any
/// rule of a query runs. Merge errors abort the query that hit them. Rules that
/// finished before the failure stay cached and valid.
#[derive(Debug, Clone)]
pub enum FathomError {
    /// Markup parse error with source location
    Parse(Box<ErrorDetails>),

    /// A selector the tree adapter could not understand
    Selector(String),

    /// A rule that cannot be compiled or planned around
    MalformedRule(String),

    /// The rules needed by a query depend on each other in a loop
    CircularDependency(String),

    /// A query or rule needs a type that no rule could ever add
    MissingProducer { type_name: String },

    /// Someone tried to overwrite an existing note with a different one
    NoteConflict {
        type_name: String,
        existing: serde_json::Value,
        attempted: serde_json::Value,
    },

    /// A fact carried a score, type or note but no output type could be worked out
    UndeterminedType(String),

    /// A right-hand side produced a score above its declared `at_most()` bound
    ScoreBound { score: f64, bound: f64 },

    /// A right-hand side emitted a type outside its declared `type_in()` set
    TypeOutOfBounds {
        type_name: String,
        allowed: Vec<String>,
        inherited: bool,
    },

    /// `get()` was asked for an out-rule key that the ruleset doesn't have
    UnknownKey(String),

    ResourceLimitExceeded {
        limit_name: String,
        limit_value: String,
        actual_value: String,
        suggestion: String,
    },
}

impl FathomError {
    /// Create a parse error with source information
    pub fn parse(
        message: impl Into<String>,
        span: Span,
        source_id: impl Into<String>,
        source_text: Arc<str>,
    ) -> Self {
        Self::Parse(Box::new(ErrorDetails {
            message: message.into(),
            span,
            source_id: source_id.into(),
            source_text,
            suggestion: None,
        }))
    }

    /// Create a parse error with suggestion
    pub fn parse_with_suggestion(
        message: impl Into<String>,
        span: Span,
        source_id: impl Into<String>,
        source_text: Arc<str>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Parse(Box::new(ErrorDetails {
            message: message.into(),
            span,
            source_id: source_id.into(),
            source_text,
            suggestion: Some(suggestion.into()),
        }))
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRule(message.into())
    }
}

impl fmt::Display for FathomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FathomError::Parse(details) => {
                write!(f, "Parse error: {}", details.message)?;
                if let Some(suggestion) = &details.suggestion {
                    write!(f, " (suggestion: {})", suggestion)?;
                }
                write!(
                    f,
                    " at {}:{}:{}",
                    details.source_id, details.span.line, details.span.col
                )
            }
            FathomError::Selector(msg) => write!(f, "Invalid selector: {}", msg),
            FathomError::MalformedRule(msg) => write!(f, "Malformed rule: {}", msg),
            FathomError::CircularDependency(msg) => write!(f, "Circular dependency: {}", msg),
            FathomError::MissingProducer { type_name } => write!(
                f,
                "No rule could add the type '{}', but something requires it",
                type_name
            ),
            FathomError::NoteConflict {
                type_name,
                existing,
                attempted,
            } => write!(
                f,
                "Tried to set the note of type '{}' to {}, but it is already {}. \
                 Overwriting notes is not allowed, since it would make the order of rules matter",
                type_name, attempted, existing
            ),
            FathomError::UndeterminedType(msg) => {
                write!(f, "Could not determine an output type: {}", msg)
            }
            FathomError::ScoreBound { score, bound } => write!(
                f,
                "Score of {} exceeds the declared at_most({})",
                score, bound
            ),
            FathomError::TypeOutOfBounds {
                type_name,
                allowed,
                inherited,
            } => {
                let verb = if *inherited {
                    "inherited from the left-hand side"
                } else {
                    "emitted"
                };
                write!(
                    f,
                    "A right-hand side claimed via type_in() to emit one of [{}] but actually {} '{}'",
                    allowed.join(", "),
                    verb,
                    type_name
                )
            }
            FathomError::UnknownKey(key) => {
                write!(f, "There is no out() rule with the key '{}'", key)
            }
            FathomError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
                suggestion,
            } => write!(
                f,
                "Resource limit exceeded: {} (limit: {}, actual: {}). {}",
                limit_name, limit_value, actual_value, suggestion
            ),
        }
    }
}

impl std::error::Error for FathomError {}

