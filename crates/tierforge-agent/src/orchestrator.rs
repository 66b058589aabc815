//! Version orchestrator
//!
//! Runs one generation end to end:
//!
//! ```text
//! Built -> Invoked -> Sanitized -> Validated -> Done(model)
//!    any transport / parse / schema failure  -> Done(fallback)
//! ```
//!
//! Only transport failures are retried, and only up to
//! [`PipelineConfig::attempts`]. Malformed model output is not retried: the
//! same prompt is unlikely to fix it, so it goes straight to the fallback.
//! A configuration failure is the one error returned to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tierforge_core::{
    audit, sanitize, validate, ConfigurationError, ContentSet, FallbackSynthesizer,
    GenerationRequest, PipelineError, Prompt, PromptBuilder, Stage,
};
use uuid::Uuid;

use crate::chat_completion::ChatCompletionInvoker;
use crate::config::{PipelineConfig, TierforgeConfig};
use crate::invoker::ModelInvoker;

/// Where the returned content came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Model,
    Fallback,
}

/// Why a generation degraded to fallback content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackReason {
    pub stage: Stage,
    pub message: String,
}

impl From<&PipelineError> for FallbackReason {
    fn from(error: &PipelineError) -> Self {
        Self {
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

/// Result of one `generate` call; the caller takes full ownership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub id: Uuid,
    pub content_set: ContentSet,
    pub source: ContentSource,
    /// Network calls made, retries included
    pub attempts: u32,
    pub fallback_reason: Option<FallbackReason>,
    pub generated_at: DateTime<Utc>,
}

impl Generation {
    fn new(
        content_set: ContentSet,
        source: ContentSource,
        attempts: u32,
        fallback_reason: Option<FallbackReason>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_set,
            source,
            attempts,
            fallback_reason,
            generated_at: Utc::now(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ContentSource::Fallback
    }
}

/// Sole caller-facing entry point of the pipeline
///
/// Holds no per-generation state, so one orchestrator can serve many
/// concurrent `generate` calls.
#[derive(Debug, Clone)]
pub struct VersionOrchestrator {
    invoker: Arc<dyn ModelInvoker>,
    pipeline: PipelineConfig,
}

impl VersionOrchestrator {
    pub fn new(invoker: Arc<dyn ModelInvoker>, pipeline: PipelineConfig) -> Self {
        Self { invoker, pipeline }
    }

    /// Build an orchestrator backed by a chat-completion endpoint
    pub fn from_config(config: TierforgeConfig) -> Result<Self, ConfigurationError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigurationError::new(format!("Failed to create HTTP client: {}", e)))?;
        let invoker = ChatCompletionInvoker::with_http_client(config.model, http_client);
        Ok(Self::new(Arc::new(invoker), config.pipeline))
    }

    /// Build from `.env`, `tierforge.toml` and the process environment
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_config(TierforgeConfig::from_env()?)
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// Generate the three tiers for one request
    ///
    /// Never fails for transport, parse or schema problems; those yield
    /// fallback content with [`ContentSource::Fallback`].
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Generation, ConfigurationError> {
        let prompt = PromptBuilder::build(request);
        tracing::info!(
            stage = %Stage::Prompt,
            outcome = "built",
            topic = %request.topic,
            chars = prompt.system_message.len() + prompt.user_message.len(),
            "Prompt built"
        );

        let mut attempts = 0;
        match self.run_model_stages(&prompt, &mut attempts).await {
            Ok(content_set) => {
                let report = audit(&content_set);
                for finding in &report.findings {
                    tracing::warn!(stage = %Stage::Validate, "Design target missed: {}", finding);
                }
                tracing::info!(
                    stage = "done",
                    outcome = "model",
                    attempts,
                    topic = %request.topic,
                    "Generation complete"
                );
                Ok(Generation::new(content_set, ContentSource::Model, attempts, None))
            }
            Err(PipelineError::Configuration(error)) => {
                tracing::error!(
                    stage = %Stage::Invoke,
                    outcome = "configuration_error",
                    "Generation aborted: {}",
                    error
                );
                Err(error)
            }
            Err(error) => {
                tracing::warn!(
                    stage = %error.stage(),
                    outcome = "failed",
                    attempts,
                    "Falling back to synthesized content: {}",
                    error
                );
                let content_set = FallbackSynthesizer::synthesize(request);
                tracing::info!(stage = %Stage::Fallback, outcome = "synthesized");
                tracing::info!(
                    stage = "done",
                    outcome = "fallback",
                    attempts,
                    topic = %request.topic,
                    "Generation complete"
                );
                Ok(Generation::new(
                    content_set,
                    ContentSource::Fallback,
                    attempts,
                    Some(FallbackReason::from(&error)),
                ))
            }
        }
    }

    async fn run_model_stages(
        &self,
        prompt: &Prompt,
        attempts: &mut u32,
    ) -> Result<ContentSet, PipelineError> {
        let raw = self.invoke_with_retry(prompt, attempts).await?;

        let json = sanitize(&raw).map_err(|error| {
            tracing::warn!(stage = %Stage::Sanitize, outcome = "failed", "{}", error);
            error
        })?;
        tracing::info!(stage = %Stage::Sanitize, outcome = "ok", chars = json.len());

        let content_set = validate(json).map_err(|error| {
            tracing::warn!(
                stage = %Stage::Validate,
                outcome = "failed",
                violations = error.violations.len(),
                "{}",
                error
            );
            error
        })?;
        tracing::info!(stage = %Stage::Validate, outcome = "ok");

        Ok(content_set)
    }

    async fn invoke_with_retry(
        &self,
        prompt: &Prompt,
        attempts: &mut u32,
    ) -> Result<String, PipelineError> {
        let params = self.pipeline.invocation_params();
        let max_attempts = self.pipeline.attempts();

        loop {
            *attempts += 1;
            match self.invoker.invoke(prompt, &params).await {
                Ok(raw) => {
                    tracing::info!(
                        stage = %Stage::Invoke,
                        outcome = "ok",
                        invoker = self.invoker.name(),
                        attempt = *attempts,
                        chars = raw.len()
                    );
                    return Ok(raw);
                }
                Err(error) => {
                    let error = PipelineError::from(error);
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    if *attempts >= max_attempts {
                        tracing::warn!(
                            stage = %Stage::Invoke,
                            outcome = "exhausted",
                            attempt = *attempts,
                            "Model call failed after {} attempts: {}",
                            max_attempts,
                            error
                        );
                        return Err(error);
                    }

                    let backoff = self.pipeline.backoff_for(*attempts);
                    tracing::warn!(
                        stage = %Stage::Invoke,
                        outcome = "retrying",
                        attempt = *attempts,
                        "Model call failed (attempt {}/{}), retrying in {:?}: {}",
                        attempts,
                        max_attempts,
                        backoff,
                        error
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
