//! Tierforge Core
//!
//! The pure half of the tiered lesson generation pipeline. Everything in this
//! crate is synchronous and free of I/O:
//!
//! - [`prompt`]: builds the system/user messages sent to the model
//! - [`sanitize`]: isolates the JSON object inside a raw model reply
//! - [`validate`]: checks the JSON against the three-tier schema
//! - [`fallback`]: synthesizes schema-valid content when the model can't be trusted
//! - [`audit`]: advisory checks of duration and narration targets
//!
//! Network invocation and orchestration live in `tierforge-agent`.

pub mod audit;
pub mod error;
pub mod fallback;
pub mod prompt;
pub mod sanitize;
pub mod types;
pub mod validate;

pub use audit::{audit, DesignAudit, Finding, FindingKind};
pub use error::{
    ConfigurationError, ParseError, PipelineError, SchemaValidationError, Stage,
    TransportError, TransportErrorKind, Violation, ViolationKind,
};
pub use fallback::FallbackSynthesizer;
pub use prompt::{Prompt, PromptBuilder};
pub use sanitize::sanitize;
pub use types::{
    ContentSet, ContentVariant, GenerationRequest, LabExercise, Lesson, LineExplanation,
    Project, ScriptStep, Tier,
};
pub use validate::validate;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
