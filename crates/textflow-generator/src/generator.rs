use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use textflow_graph::{Diagnostic, Graph, validate};
use textflow_llm::{Client, Message, Request, ResponseFormat, Usage};
use tracing::{error, info, warn};

use crate::{
    GenerationEvent, GenerationEventKind, GenerationEventSink, GeneratorConfig,
    GraphGenerationError, NOT_JSON_MESSAGE, backoff_delay, initial_prompt, repair_prompt,
};

/// Per-call knobs. `max_retries` counts retries after the first call, so the
/// backend is invoked at most `max_retries + 1` times.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f64,
    pub max_retries: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GeneratorConfig::default().params()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationOutcome {
    pub graph: Graph,
    pub warnings: Vec<Diagnostic>,
    pub attempts: u32,
    pub usage: Usage,
}

#[derive(Clone)]
pub struct GraphGenerator {
    client: Arc<Client>,
    config: GeneratorConfig,
    events: GenerationEventSink,
}

impl GraphGenerator {
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            config: GeneratorConfig::default(),
            events: GenerationEventSink::default(),
        }
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: GenerationEventSink) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub async fn generate(
        &self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<Graph, GraphGenerationError> {
        self.generate_detailed(text, params)
            .await
            .map(|outcome| outcome.graph)
    }

    /// Runs the generate, validate, repair loop.
    ///
    /// Parse and validation failures rewrite the prompt and retry at once.
    /// Retryable backend failures keep the prompt and retry after a backoff.
    /// Any other backend failure ends the call.
    pub async fn generate_detailed(
        &self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<GenerationOutcome, GraphGenerationError> {
        let max_attempts = params.max_retries.saturating_add(1);
        let mut telemetry = Telemetry::new(&self.events);
        let mut usage = Usage::default();
        let mut prompt = initial_prompt(text);
        let mut repairing = false;
        let mut last_failure: Option<String> = None;

        for attempt in 0..max_attempts {
            info!(
                attempt = attempt + 1,
                max_attempts,
                model = %params.model,
                repair = repairing,
                "generation attempt"
            );
            telemetry.emit(GenerationEventKind::AttemptStarted {
                attempt,
                max_attempts,
                repair: repairing,
            });

            let started = Instant::now();
            let response = match self.client.complete(self.build_request(&prompt, params)).await {
                Ok(response) => response,
                Err(source) if source.retryable() => {
                    warn!(attempt = attempt + 1, error = %source, "transient backend failure");
                    if attempt + 1 >= max_attempts {
                        telemetry.emit(GenerationEventKind::Failed {
                            attempt,
                            reason: source.to_string(),
                        });
                        return Err(GraphGenerationError::Backend {
                            attempts: attempt + 1,
                            source,
                        });
                    }
                    let delay = backoff_delay(attempt, &self.config.backoff, &source);
                    telemetry.emit(GenerationEventKind::BackendRetrying {
                        attempt,
                        delay_ms: millis(delay),
                        error: source.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(source) => {
                    error!(
                        attempt = attempt + 1,
                        error = %source,
                        "backend failure is not retryable"
                    );
                    telemetry.emit(GenerationEventKind::Failed {
                        attempt,
                        reason: source.to_string(),
                    });
                    return Err(GraphGenerationError::Fatal {
                        attempt: attempt + 1,
                        source,
                    });
                }
            };

            let call_ms = millis(started.elapsed());
            usage.accumulate(&response.usage);
            info!(
                attempt = attempt + 1,
                call_ms,
                total_tokens = response.usage.total_tokens,
                "generation call completed"
            );
            telemetry.emit(GenerationEventKind::AttemptCompleted {
                attempt,
                call_ms,
                usage: response.usage,
            });

            let document: Value = match serde_json::from_str(&response.text) {
                Ok(document) => document,
                Err(parse_error) => {
                    warn!(
                        attempt = attempt + 1,
                        error = %parse_error,
                        "response was not valid JSON"
                    );
                    telemetry.emit(GenerationEventKind::ParseFailed {
                        attempt,
                        error: parse_error.to_string(),
                    });
                    last_failure = Some(format!("invalid JSON: {parse_error}"));
                    prompt = repair_prompt(text, &response.text, NOT_JSON_MESSAGE);
                    repairing = true;
                    continue;
                }
            };

            match validate(&document, &self.config.schema) {
                Ok(validated) => {
                    info!(
                        attempt = attempt + 1,
                        nodes = validated.graph.nodes().len(),
                        edges = validated.graph.edges().len(),
                        warnings = validated.warnings.len(),
                        "graph validation succeeded"
                    );
                    telemetry.emit(GenerationEventKind::Succeeded {
                        attempt,
                        node_count: validated.graph.nodes().len(),
                        edge_count: validated.graph.edges().len(),
                        warnings_count: validated.warnings.len(),
                        usage,
                    });
                    return Ok(GenerationOutcome {
                        graph: validated.graph,
                        warnings: validated.warnings,
                        attempts: attempt + 1,
                        usage,
                    });
                }
                Err(validation) => {
                    warn!(
                        attempt = attempt + 1,
                        errors = validation.errors_count,
                        "graph validation failed"
                    );
                    telemetry.emit(GenerationEventKind::ValidationFailed {
                        attempt,
                        errors_count: validation.errors_count,
                    });
                    let rendered = serde_json::to_string_pretty(&document)
                        .unwrap_or_else(|_| response.text.clone());
                    let message = validation.to_string();
                    prompt = repair_prompt(text, &rendered, &message);
                    last_failure = Some(message);
                    repairing = true;
                }
            }
        }

        error!(attempts = max_attempts, "graph generation exhausted all attempts");
        telemetry.emit(GenerationEventKind::Failed {
            attempt: max_attempts.saturating_sub(1),
            reason: "attempts exhausted".to_string(),
        });
        Err(GraphGenerationError::AttemptsExhausted {
            attempts: max_attempts,
            last_failure,
        })
    }

    fn build_request(&self, prompt: &str, params: &GenerationParams) -> Request {
        let mut request = Request::new(params.model.clone(), vec![Message::user(prompt)]);
        request.temperature = Some(params.temperature);
        request.top_p = Some(self.config.top_p);
        request.max_tokens = Some(self.config.max_tokens);
        request.response_format = Some(ResponseFormat::JsonObject);
        request
    }
}

/// Sequences events for a single generation call.
struct Telemetry<'a> {
    sink: &'a GenerationEventSink,
    started: Instant,
    next_sequence: u64,
}

impl<'a> Telemetry<'a> {
    fn new(sink: &'a GenerationEventSink) -> Self {
        Self {
            sink,
            started: Instant::now(),
            next_sequence: 0,
        }
    }

    fn emit(&mut self, kind: GenerationEventKind) {
        if !self.sink.is_enabled() {
            return;
        }
        self.sink.emit(GenerationEvent {
            sequence_no: self.next_sequence,
            elapsed_ms: millis(self.started.elapsed()),
            kind,
        });
        self.next_sequence += 1;
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
