//! Error types for the generation pipeline
//!
//! Every failure a generation can hit is one of four kinds. Only
//! [`ConfigurationError`] is allowed to reach the caller; the rest are
//! recovered by substituting fallback content.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Pipeline stage, used to tag log lines and fallback reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prompt,
    Invoke,
    Sanitize,
    Validate,
    Fallback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prompt => "prompt",
            Stage::Invoke => "invoke",
            Stage::Sanitize => "sanitize",
            Stage::Validate => "validate",
            Stage::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or unusable credentials/endpoint
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The model endpoint could not be reached or answered badly
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No JSON object could be located in the model reply
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The reply parsed but does not match the content schema
    #[error("Schema validation failed: {0}")]
    SchemaValidation(#[from] SchemaValidationError),
}

impl PipelineError {
    /// Stage at which this error is raised
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Configuration(_) | PipelineError::Transport(_) => Stage::Invoke,
            PipelineError::Parse(_) => Stage::Sanitize,
            PipelineError::SchemaValidation(_) => Stage::Validate,
        }
    }

    /// Only transport failures are worth another network call
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Transport(_))
    }
}

/// Required credentials or endpoint are missing or unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConfigurationError {
    message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// A required setting has no value
    pub fn missing(setting: &str) -> Self {
        Self::new(format!("{} is not set", setting))
    }

    /// A setting has a value that cannot be used
    pub fn invalid(setting: &str, reason: impl fmt::Display) -> Self {
        Self::new(format!("{} is invalid: {}", setting, reason))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Broad classification of a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS failure, reset, ...
    Network,
    /// The caller-supplied timeout elapsed
    Timeout,
    /// Non-success HTTP status
    Status(u16),
    /// 2xx response whose body lacks `choices[0].message.content`
    Envelope,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Network => f.write_str("network failure"),
            TransportErrorKind::Timeout => f.write_str("timed out"),
            TransportErrorKind::Status(code) => write!(f, "HTTP {}", code),
            TransportErrorKind::Envelope => f.write_str("malformed response envelope"),
        }
    }
}

/// The model endpoint call failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {cause}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub cause: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }

    pub fn network(cause: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, cause)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("no response after {}ms", after.as_millis()),
        )
    }

    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Status(code), body)
    }

    pub fn envelope(cause: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Envelope, cause)
    }
}

/// No JSON object could be isolated from the model reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// What is wrong at a given schema path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// The text is not JSON at all
    InvalidJson(String),
    Missing,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    EmptySequence,
    EmptyString,
    NonPositive,
    UnknownTierLabel(String),
    UnexpectedKey,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::InvalidJson(reason) => write!(f, "invalid JSON ({})", reason),
            ViolationKind::Missing => f.write_str("required key is missing"),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ViolationKind::EmptySequence => f.write_str("sequence must not be empty"),
            ViolationKind::EmptyString => f.write_str("text must not be empty"),
            ViolationKind::NonPositive => f.write_str("must be a positive integer"),
            ViolationKind::UnknownTierLabel(label) => {
                write!(f, "unknown tier label {:?}", label)
            }
            ViolationKind::UnexpectedKey => f.write_str("key is not part of the schema"),
        }
    }
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path into the document, e.g. `basic.lesson.project.criteria`
    pub path: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

/// The reply does not conform to the content schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} violation(s): {}", .violations.len(), render_violations(&.violations))]
pub struct SchemaValidationError {
    pub violations: Vec<Violation>,
}

impl SchemaValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Wrap a JSON syntax failure as a single root-level violation
    pub fn invalid_json(error: &serde_json::Error) -> Self {
        Self::new(vec![Violation::new(
            "",
            ViolationKind::InvalidJson(error.to_string()),
        )])
    }

    /// Whether any violation was reported at exactly this path
    pub fn has_violation_at(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
