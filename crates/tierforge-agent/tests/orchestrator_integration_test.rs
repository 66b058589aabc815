//! Orchestrator routing tests with scripted model invokers
//!
//! Covers the model path, transport retries, parse/schema fallbacks and the
//! fatal configuration path.

use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tierforge_agent::{
    ContentSource, InvocationParams, InvokeError, ModelInvoker, PipelineConfig,
    VersionOrchestrator,
};
use tierforge_core::{
    validate, ConfigurationError, GenerationRequest, Prompt, Stage, Tier, TransportError,
};

/// Replays canned replies; repeats the last one once the script runs out
#[derive(Debug)]
struct ScriptedInvoker {
    replies: Mutex<VecDeque<Result<String, InvokeError>>>,
    last: Mutex<Option<Result<String, InvokeError>>>,
    calls: AtomicU32,
    seen_prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedInvoker {
    fn new(replies: Vec<Result<String, InvokeError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            seen_prompts: Mutex::new(Vec::new()),
        })
    }

    fn always(reply: Result<String, InvokeError>) -> Arc<Self> {
        Self::new(vec![reply])
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ModelInvoker for ScriptedInvoker {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(
        &self,
        prompt: &Prompt,
        _params: &InvocationParams,
    ) -> Result<String, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_prompts.lock().unwrap().push(prompt.clone());

        let next = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(TransportError::network("script exhausted").into())),
        }
    }
}

fn css_request() -> GenerationRequest {
    GenerationRequest::new("Introduction to CSS", "beginners")
        .with_prerequisites(["HTML basics"])
        .with_duration_minutes(60)
}

fn fast_pipeline() -> PipelineConfig {
    PipelineConfig::default()
        .with_max_attempts(2)
        .with_retry_backoff(Duration::ZERO)
}

fn orchestrator(invoker: Arc<ScriptedInvoker>) -> VersionOrchestrator {
    VersionOrchestrator::new(invoker, fast_pipeline())
}

fn variant(label: &str, minutes: u32) -> serde_json::Value {
    json!({
        "tier_label": label,
        "assumptions": ["Learner knows HTML basics"],
        "executive_summary": format!("{} introduction to CSS", label),
        "lesson": {
            "script": [
                {
                    "segment_name": "What CSS does",
                    "narration": "CSS describes how HTML elements are presented.",
                    "code": null,
                    "video_reference": "css-intro"
                },
                {
                    "segment_name": "Selectors",
                    "narration": "Selectors choose which elements a rule applies to.",
                    "code": "h1 { color: navy; }",
                    "video_reference": "css-selectors"
                }
            ],
            "lab_ngc": {
                "title": "Style a recipe page",
                "instructions": "Write a stylesheet for the provided page.",
                "steps": ["Link the stylesheet", "Style headings", "Style lists"],
                "starter_code": "/* styles */",
                "solution_code": "h1 { color: navy; }\nul { padding: 0; }"
            },
            "project": {
                "title": "Portfolio styling",
                "brief": "Style a one-page portfolio.",
                "criteria": ["Consistent colours", "Readable typography"],
                "steps": ["Pick a palette", "Write rules", "Review"],
                "line_explanations": [
                    {"line": "body { margin: 0; }", "explanation": "Removes default page margin"}
                ],
                "sample_code": "body { margin: 0; }"
            },
            "estimated_duration_minutes": minutes
        }
    })
}

fn three_tier_payload() -> serde_json::Value {
    json!({
        "basic": variant("Basic", 180),
        "intermediate": variant("Intermediate", 360),
        "creative": variant("Creative", 600)
    })
}

#[tokio::test]
async fn valid_model_output_is_returned_as_model_content() {
    let invoker = ScriptedInvoker::always(Ok(three_tier_payload().to_string()));
    let generation = orchestrator(invoker.clone())
        .generate(&css_request())
        .await
        .unwrap();

    assert_eq!(generation.source, ContentSource::Model);
    assert_eq!(generation.attempts, 1);
    assert!(generation.fallback_reason.is_none());
    for (tier, variant) in generation.content_set.iter() {
        assert_eq!(variant.tier_label, tier.label());
        assert!(!variant.lesson.script.is_empty());
    }
    assert_eq!(
        generation.content_set[Tier::Creative].lesson.estimated_duration_minutes,
        600
    );
    assert_eq!(invoker.calls(), 1);
}

#[tokio::test]
async fn fenced_model_output_is_sanitized() {
    let reply = format!(
        "Here are the three versions:\n```json\n{}\n```\nEnjoy!",
        serde_json::to_string_pretty(&three_tier_payload()).unwrap()
    );
    let invoker = ScriptedInvoker::always(Ok(reply));
    let generation = orchestrator(invoker).generate(&css_request()).await.unwrap();

    assert_eq!(generation.source, ContentSource::Model);
}

#[tokio::test]
async fn prompt_carries_the_request() {
    let invoker = ScriptedInvoker::always(Ok(three_tier_payload().to_string()));
    orchestrator(invoker.clone())
        .generate(&css_request())
        .await
        .unwrap();

    let prompts = invoker.seen_prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user_message.contains("Introduction to CSS"));
    assert!(prompts[0].user_message.contains("HTML basics"));
    assert!(prompts[0].system_message.contains("lab_ngc"));
}

#[tokio::test]
async fn persistent_transport_errors_fall_back_after_bounded_retries() {
    let invoker = ScriptedInvoker::always(Err(TransportError::status(503, "overloaded").into()));
    let generation = orchestrator(invoker.clone())
        .generate(&css_request())
        .await
        .unwrap();

    assert_eq!(generation.source, ContentSource::Fallback);
    assert_eq!(invoker.calls(), 2);
    assert_eq!(generation.attempts, 2);

    let reason = generation.fallback_reason.as_ref().unwrap();
    assert_eq!(reason.stage, Stage::Invoke);
    assert!(reason.message.contains("503"));

    let json = serde_json::to_string(&generation.content_set).unwrap();
    assert!(validate(&json).is_ok());
}

#[tokio::test]
async fn transient_transport_error_is_retried() {
    let invoker = ScriptedInvoker::new(vec![
        Err(TransportError::timeout(Duration::from_secs(1)).into()),
        Ok(three_tier_payload().to_string()),
    ]);
    let generation = orchestrator(invoker.clone())
        .generate(&css_request())
        .await
        .unwrap();

    assert_eq!(generation.source, ContentSource::Model);
    assert_eq!(generation.attempts, 2);
    assert_eq!(invoker.calls(), 2);
}

#[tokio::test]
async fn single_attempt_pipeline_does_not_retry() {
    let invoker = ScriptedInvoker::always(Err(TransportError::network("refused").into()));
    let orchestrator = VersionOrchestrator::new(invoker.clone(), fast_pipeline().with_max_attempts(1));
    let generation = orchestrator.generate(&css_request()).await.unwrap();

    assert!(generation.is_fallback());
    assert_eq!(invoker.calls(), 1);
}

#[tokio::test]
async fn prose_without_json_falls_back_without_retry() {
    let invoker = ScriptedInvoker::always(Ok("I'm sorry, I can't help with that.".to_string()));
    let generation = orchestrator(invoker.clone())
        .generate(&css_request())
        .await
        .unwrap();

    assert_eq!(generation.source, ContentSource::Fallback);
    assert_eq!(invoker.calls(), 1);
    assert_eq!(
        generation.fallback_reason.as_ref().unwrap().stage,
        Stage::Sanitize
    );
}

#[tokio::test]
async fn incomplete_json_falls_back_with_echoed_duration() {
    let mut payload = three_tier_payload();
    payload["basic"]["lesson"]
        .as_object_mut()
        .unwrap()
        .remove("lab_ngc");
    let reply = format!(
        "Sure, here is the content you asked for: {} Hope this helps!",
        payload
    );

    let invoker = ScriptedInvoker::always(Ok(reply));
    let generation = orchestrator(invoker.clone())
        .generate(&css_request())
        .await
        .unwrap();

    assert_eq!(generation.source, ContentSource::Fallback);
    assert_eq!(invoker.calls(), 1);
    assert_eq!(
        generation.content_set[Tier::Basic].lesson.estimated_duration_minutes,
        60
    );

    let reason = generation.fallback_reason.unwrap();
    assert_eq!(reason.stage, Stage::Validate);
    assert!(reason.message.contains("basic.lesson.lab_ngc"));
}

#[tokio::test]
async fn configuration_error_is_surfaced_without_fallback() {
    let invoker = ScriptedInvoker::always(Err(InvokeError::Configuration(
        ConfigurationError::missing("TIERFORGE_LLM_API_KEY"),
    )));
    let err = orchestrator(invoker.clone())
        .generate(&css_request())
        .await
        .unwrap_err();

    assert!(err.message().contains("TIERFORGE_LLM_API_KEY"));
    assert_eq!(invoker.calls(), 1);
}

#[tokio::test]
async fn concurrent_generations_are_independent() {
    let invoker = ScriptedInvoker::always(Ok(three_tier_payload().to_string()));
    let orchestrator = orchestrator(invoker.clone());

    let handles: Vec<_> = ["CSS Grid", "Flexbox", "Animations"]
        .into_iter()
        .map(|topic| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .generate(&GenerationRequest::new(topic, "beginners"))
                    .await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let generation = handle.await.unwrap().unwrap();
        assert_eq!(generation.source, ContentSource::Model);
        ids.insert(generation.id);
    }

    assert_eq!(ids.len(), 3);
    assert_eq!(invoker.calls(), 3);
}

/// Collects formatted log output for assertions
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    fn completion_line(&self) -> String {
        let logs = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
        logs.lines()
            .find(|line| line.contains("Generation complete"))
            .unwrap_or_default()
            .to_string()
    }
}

async fn generate_with_logs(invoker: Arc<ScriptedInvoker>) -> String {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    orchestrator(invoker)
        .generate(&css_request())
        .await
        .unwrap();
    capture.completion_line()
}

#[tokio::test]
async fn completion_is_logged_with_stage_and_outcome() {
    let line =
        generate_with_logs(ScriptedInvoker::always(Ok(three_tier_payload().to_string()))).await;
    assert!(line.contains("stage="), "{}", line);
    assert!(line.contains("done"), "{}", line);
    assert!(line.contains("outcome="), "{}", line);
    assert!(line.contains("model"), "{}", line);

    let line = generate_with_logs(ScriptedInvoker::always(Ok("no json".to_string()))).await;
    assert!(line.contains("stage="), "{}", line);
    assert!(line.contains("fallback"), "{}", line);
}
