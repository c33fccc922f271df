use serde::{Deserialize, Serialize};
use textflow_llm::Usage;
use tokio::sync::mpsc;

use std::sync::Arc;

/// Advisory progress report emitted during one generation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationEvent {
    pub sequence_no: u64,
    pub elapsed_ms: u64,
    pub kind: GenerationEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationEventKind {
    AttemptStarted {
        attempt: u32,
        max_attempts: u32,
        repair: bool,
    },
    AttemptCompleted {
        attempt: u32,
        call_ms: u64,
        usage: Usage,
    },
    ParseFailed {
        attempt: u32,
        error: String,
    },
    ValidationFailed {
        attempt: u32,
        errors_count: usize,
    },
    BackendRetrying {
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    Succeeded {
        attempt: u32,
        node_count: usize,
        edge_count: usize,
        warnings_count: usize,
        usage: Usage,
    },
    Failed {
        attempt: u32,
        reason: String,
    },
}

pub trait GenerationEventObserver: Send + Sync {
    fn on_event(&self, event: &GenerationEvent);
}

impl<F> GenerationEventObserver for F
where
    F: Fn(&GenerationEvent) + Send + Sync,
{
    fn on_event(&self, event: &GenerationEvent) {
        self(event);
    }
}

pub type SharedGenerationEventObserver = Arc<dyn GenerationEventObserver>;
pub type GenerationEventSender = mpsc::UnboundedSender<GenerationEvent>;
pub type GenerationEventReceiver = mpsc::UnboundedReceiver<GenerationEvent>;

#[derive(Clone, Default)]
pub struct GenerationEventSink {
    observer: Option<SharedGenerationEventObserver>,
    sender: Option<GenerationEventSender>,
}

impl GenerationEventSink {
    pub fn with_observer(observer: SharedGenerationEventObserver) -> Self {
        Self {
            observer: Some(observer),
            sender: None,
        }
    }

    pub fn with_sender(sender: GenerationEventSender) -> Self {
        Self {
            observer: None,
            sender: Some(sender),
        }
    }

    pub fn observer(mut self, observer: SharedGenerationEventObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn sender(mut self, sender: GenerationEventSender) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.observer.is_some() || self.sender.is_some()
    }

    pub fn emit(&self, event: GenerationEvent) {
        if let Some(observer) = self.observer.as_ref() {
            observer.on_event(&event);
        }
        if let Some(sender) = self.sender.as_ref() {
            let _ = sender.send(event);
        }
    }
}

pub fn generation_event_channel() -> (GenerationEventSender, GenerationEventReceiver) {
    mpsc::unbounded_channel()
}
