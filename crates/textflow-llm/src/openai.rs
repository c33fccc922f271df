//! OpenAI-compatible chat-completions adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::errors::{ConfigurationError, ProviderError, SDKError};
use crate::provider::{ProviderAdapter, ProviderFactory};
use crate::types::{FinishReason, Request, Response, ResponseFormat, Role, Usage};

pub const OPENAI_PROVIDER: &str = "openai";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug)]
pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_env() -> Result<Self, SDKError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigurationError::new("OPENAI_API_KEY is not set"))?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        Ok(Self::new(api_key).with_base_url(base_url))
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        OPENAI_PROVIDER
    }

    async fn complete(&self, request: Request) -> Result<Response, SDKError> {
        let body = build_chat_body(&request);
        tracing::debug!(model = %request.model, "sending chat completion request");

        let response = self
            .client
            .post(self.endpoint("/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_transport_error(err, "post"))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        let text = response
            .text()
            .await
            .map_err(|err| map_transport_error(err, "read body"))?;

        if !status.is_success() {
            return Err(map_http_status(status.as_u16(), &text, retry_after));
        }
        parse_chat_response(&text)
    }
}

pub struct OpenAiFactory;

impl ProviderFactory for OpenAiFactory {
    fn provider_id(&self) -> &'static str {
        OPENAI_PROVIDER
    }

    fn from_env(&self) -> Option<Arc<dyn ProviderAdapter>> {
        OpenAiAdapter::from_env()
            .ok()
            .map(|adapter| Arc::new(adapter) as Arc<dyn ProviderAdapter>)
    }
}

pub fn build_chat_body(request: &Request) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            json!({ "role": role, "content": message.content })
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(top_p) = request.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(ResponseFormat::JsonObject) = request.response_format {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

pub fn parse_chat_response(body: &str) -> Result<Response, SDKError> {
    let completion: ChatCompletion = serde_json::from_str(body)
        .map_err(|err| SDKError::Decode(format!("chat completion json decode failed: {err}")))?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| SDKError::Decode("chat completion has no choices".to_string()))?;

    let usage = completion
        .usage
        .map(|usage| Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        })
        .unwrap_or_default();
    let reason = choice.finish_reason.unwrap_or_else(|| "stop".to_string());

    Ok(Response {
        id: completion.id,
        model: completion.model,
        provider: OPENAI_PROVIDER.to_string(),
        text: choice.message.content.unwrap_or_default(),
        finish_reason: FinishReason {
            raw: Some(reason.clone()),
            reason,
        },
        usage,
    })
}

pub fn map_http_status(status: u16, body: &str, retry_after: Option<Duration>) -> SDKError {
    let message = error_message(body);
    let error =
        ProviderError::new(OPENAI_PROVIDER, Some(status), message).with_retry_after(retry_after);
    match status {
        429 => SDKError::RateLimit(error),
        401 | 403 => SDKError::Authentication(error),
        408 | 409 | 500..=599 => SDKError::Server(error),
        _ => SDKError::InvalidRequest(error),
    }
}

/// Only failures on the wire are transient. A request that could not be built
/// (bad base URL, bad header) fails the same way on every retry.
fn map_transport_error(err: reqwest::Error, action: &str) -> SDKError {
    if err.is_builder() {
        return SDKError::Configuration(ConfigurationError::new(format!(
            "http {action} could not be built: {err}"
        )));
    }
    if err.is_decode() {
        return SDKError::Decode(format!("http {action} failed: {err}"));
    }
    SDKError::Network(format!("http {action} failed: {err}"))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "<empty body>".to_string()
            } else {
                body.trim().to_string()
            }
        })
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}
