//! Tierforge Agent
//!
//! The I/O half of the tiered lesson generation pipeline: configuration,
//! the [`ModelInvoker`] seam with its chat-completion implementation, and the
//! [`VersionOrchestrator`] that sequences prompt, invocation, sanitizing,
//! validation and fallback.
//!
//! ```no_run
//! use tierforge_agent::VersionOrchestrator;
//! use tierforge_core::GenerationRequest;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = VersionOrchestrator::from_env()?;
//! let request = GenerationRequest::new("Introduction to CSS", "beginners")
//!     .with_prerequisites(["HTML basics"]);
//!
//! let generation = orchestrator.generate(&request).await?;
//! println!("{:?}: {}", generation.source, generation.content_set.get(tierforge_core::Tier::Basic).executive_summary);
//! # Ok(())
//! # }
//! ```

pub mod chat_completion;
pub mod config;
pub mod invoker;
pub mod orchestrator;

pub use chat_completion::ChatCompletionInvoker;
pub use config::{AuthScheme, ModelConfig, PipelineConfig, TierforgeConfig};
pub use invoker::{InvocationParams, InvokeError, ModelInvoker};
pub use orchestrator::{ContentSource, FallbackReason, Generation, VersionOrchestrator};
