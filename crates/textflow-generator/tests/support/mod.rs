#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use textflow_generator::{GeneratorConfig, GraphGenerator, RetryBackoffConfig};
use textflow_llm::{
    Client, ConfigurationError, FinishReason, ProviderAdapter, ProviderError, Request, Response,
    SDKError, Usage,
};

pub const PROVIDER: &str = "scripted";

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub request: Request,
    pub at: Instant,
}

/// Replays queued outcomes in order and records every request it receives.
#[derive(Clone, Default)]
pub struct ScriptedAdapter {
    pub outcomes: Arc<Mutex<VecDeque<Result<Response, SDKError>>>>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
    pub repeat_last: Arc<Mutex<Option<Result<Response, SDKError>>>>,
}

impl ScriptedAdapter {
    pub fn push(&self, outcome: Result<Response, SDKError>) {
        self.outcomes
            .lock()
            .expect("outcomes mutex")
            .push_back(outcome);
    }

    /// Returns `outcome` for every call once the queue is empty.
    pub fn always(&self, outcome: Result<Response, SDKError>) {
        *self.repeat_last.lock().expect("repeat mutex") = Some(outcome);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls mutex").len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub fn prompt(&self, index: usize) -> String {
        self.calls()[index].request.messages[0].content.clone()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: Request) -> Result<Response, SDKError> {
        self.calls.lock().expect("calls mutex").push(RecordedCall {
            request,
            at: Instant::now(),
        });
        if let Some(outcome) = self.outcomes.lock().expect("outcomes mutex").pop_front() {
            return outcome;
        }
        self.repeat_last
            .lock()
            .expect("repeat mutex")
            .clone()
            .unwrap_or_else(|| {
                Err(SDKError::Configuration(ConfigurationError::new(
                    "no response queued",
                )))
            })
    }
}

pub fn text_response(text: &str) -> Result<Response, SDKError> {
    Ok(Response {
        id: "resp".to_string(),
        model: "test-model".to_string(),
        provider: PROVIDER.to_string(),
        text: text.to_string(),
        finish_reason: FinishReason::stop(),
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
        },
    })
}

pub fn rate_limited() -> Result<Response, SDKError> {
    Err(SDKError::RateLimit(ProviderError::new(
        PROVIDER,
        Some(429),
        "Rate limit exceeded",
    )))
}

pub fn server_error() -> Result<Response, SDKError> {
    Err(SDKError::Server(ProviderError::new(
        PROVIDER,
        Some(500),
        "internal error",
    )))
}

pub fn auth_error() -> Result<Response, SDKError> {
    Err(SDKError::Authentication(ProviderError::new(
        PROVIDER,
        Some(401),
        "invalid api key",
    )))
}

pub fn generator_with_backoff(initial_delay_ms: u64) -> (GraphGenerator, ScriptedAdapter) {
    let adapter = ScriptedAdapter::default();
    let mut client = Client::default();
    client.register_provider(Arc::new(adapter.clone()));

    let config = GeneratorConfig {
        backoff: RetryBackoffConfig {
            initial_delay_ms,
            backoff_factor: 2.0,
            max_delay_ms: 10_000,
            jitter: false,
        },
        ..GeneratorConfig::default()
    };
    (GraphGenerator::new(Arc::new(client)).with_config(config), adapter)
}

pub fn generator() -> (GraphGenerator, ScriptedAdapter) {
    generator_with_backoff(10)
}
