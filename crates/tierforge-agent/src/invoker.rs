//! Model invocation seam
//!
//! A [`ModelInvoker`] makes exactly one call to a text-generation service.
//! Retrying is the orchestrator's job, which keeps implementations small and
//! lets tests swap in scripted invokers.

use std::time::Duration;
use thiserror::Error;
use tierforge_core::{ConfigurationError, PipelineError, Prompt, TransportError};

/// Per-call generation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvocationParams {
    pub max_tokens: u32,
    pub temperature: f64,
    /// Upper bound on the whole request, connect to last byte
    pub timeout: Duration,
}

/// Why a single invocation failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// Not recoverable by retrying or by falling back
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<InvokeError> for PipelineError {
    fn from(error: InvokeError) -> Self {
        match error {
            InvokeError::Configuration(e) => PipelineError::Configuration(e),
            InvokeError::Transport(e) => PipelineError::Transport(e),
        }
    }
}

/// Single-attempt access to a text-generation service
#[async_trait::async_trait]
pub trait ModelInvoker: Send + Sync + std::fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Send one prompt and return the raw generated text
    async fn invoke(&self, prompt: &Prompt, params: &InvocationParams)
        -> Result<String, InvokeError>;
}
