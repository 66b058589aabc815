use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tierforge_core::{ConfigurationError, Prompt, TransportError};

use crate::config::{AuthScheme, ModelConfig, ENV_API_KEY, ENV_ENDPOINT};
use crate::invoker::{InvocationParams, InvokeError, ModelInvoker};

/// Longest slice of an error body kept in a transport error
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Client for OpenAI-style `/chat/completions` endpoints
#[derive(Debug, Clone)]
pub struct ChatCompletionInvoker {
    name: String,
    config: ModelConfig,
    http_client: reqwest::Client,
}

impl ChatCompletionInvoker {
    pub fn new(config: ModelConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Share a connection pool with other clients
    pub fn with_http_client(config: ModelConfig, http_client: reqwest::Client) -> Self {
        let name = config
            .model
            .clone()
            .unwrap_or_else(|| "chat-completion".to_string());
        Self {
            name,
            config,
            http_client,
        }
    }

    /// Full request URL
    ///
    /// Endpoints that already name the route, or carry a query string as
    /// Azure deployments do (`?api-version=...`), are used verbatim.
    pub fn endpoint(&self) -> String {
        let base = self.config.endpoint.trim().trim_end_matches('/');
        if base.contains('?') || base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }

    fn auth_header(&self) -> Result<(&'static str, HeaderValue), ConfigurationError> {
        let (name, value) = match self.config.auth {
            AuthScheme::Bearer => ("authorization", format!("Bearer {}", self.config.api_key)),
            AuthScheme::ApiKey => ("api-key", self.config.api_key.clone()),
        };
        let mut value = HeaderValue::from_str(&value)
            .map_err(|_| ConfigurationError::invalid(ENV_API_KEY, "not a valid HTTP header value"))?;
        value.set_sensitive(true);
        Ok((name, value))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait::async_trait]
impl ModelInvoker for ChatCompletionInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        prompt: &Prompt,
        params: &InvocationParams,
    ) -> Result<String, InvokeError> {
        let request = ChatCompletionRequest {
            model: self.config.model.as_deref(),
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user_message,
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let (auth_name, auth_value) = self.auth_header()?;
        let url = reqwest::Url::parse(&self.endpoint())
            .map_err(|e| ConfigurationError::invalid(ENV_ENDPOINT, e))?;

        tracing::debug!(
            invoker = %self.name,
            url = %url,
            max_tokens = params.max_tokens,
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(auth_name, auth_value)
            .timeout(params.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify(e, params))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError::status(status.as_u16(), truncate(&error_text)).into());
        }

        let body = response.text().await.map_err(|e| classify(e, params))?;
        let completion: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| TransportError::envelope(format!("response is not JSON: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| TransportError::envelope("missing choices[0].message.content"))?;

        tracing::debug!(invoker = %self.name, chars = content.len(), "Chat completion received");
        Ok(content)
    }
}

fn classify(error: reqwest::Error, params: &InvocationParams) -> InvokeError {
    if error.is_timeout() {
        TransportError::timeout(params.timeout).into()
    } else {
        TransportError::network(error.to_string()).into()
    }
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        short.push('…');
        short
    }
}
