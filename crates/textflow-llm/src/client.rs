//! Provider routing and middleware.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::errors::{ConfigurationError, SDKError};
use crate::provider::{ProviderAdapter, builtin_factories};
use crate::types::{Request, Response};

/// Wraps every `complete()` call. The first middleware added sees the request
/// first and the response last.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle_complete(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> Result<Response, SDKError>;
}

/// The rest of the chain below a middleware, ending at the provider adapter.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    adapter: &'a dyn ProviderAdapter,
}

impl<'a> Next<'a> {
    pub fn run(self, request: Request) -> BoxFuture<'a, Result<Response, SDKError>> {
        Box::pin(async move {
            match self.chain.split_first() {
                Some((middleware, rest)) => {
                    let next = Next {
                        chain: rest,
                        adapter: self.adapter,
                    };
                    middleware.handle_complete(request, next).await
                }
                None => self.adapter.complete(request).await,
            }
        })
    }
}

/// Logs each backend call with its provider, latency and token usage.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallLogMiddleware;

#[async_trait]
impl Middleware for CallLogMiddleware {
    async fn handle_complete(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> Result<Response, SDKError> {
        let provider = request.provider.clone().unwrap_or_default();
        let model = request.model.clone();
        let started = Instant::now();
        let result = next.run(request).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(response) => tracing::debug!(
                provider = %provider,
                model = %model,
                elapsed_ms,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "backend call finished"
            ),
            Err(error) => tracing::debug!(
                provider = %provider,
                model = %model,
                elapsed_ms,
                retryable = error.retryable(),
                error = %error,
                "backend call failed"
            ),
        }
        result
    }
}

#[derive(Clone, Default)]
pub struct Client {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    default_provider: Option<String>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Client {
    /// Registers a provider; the first one registered becomes the default.
    pub fn register_provider(&mut self, provider: Arc<dyn ProviderAdapter>) {
        let name = provider.name().to_string();
        self.default_provider.get_or_insert_with(|| name.clone());
        self.providers.insert(name, provider);
    }

    pub fn set_default_provider(&mut self, provider: impl Into<String>) {
        self.default_provider = Some(provider.into());
    }

    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    pub fn default_provider(&self) -> Option<&str> {
        self.default_provider.as_deref()
    }

    /// Registers every built-in provider whose credentials are present and
    /// installs call logging.
    pub fn from_env() -> Result<Self, SDKError> {
        let mut client = Self::default();
        for factory in builtin_factories() {
            if let Some(adapter) = factory.from_env() {
                tracing::debug!(provider = factory.provider_id(), "provider configured from env");
                client.register_provider(adapter);
            }
        }
        if client.providers.is_empty() {
            return Err(
                ConfigurationError::new("no provider credentials found in environment").into(),
            );
        }
        client.add_middleware(Arc::new(CallLogMiddleware));
        Ok(client)
    }

    /// Routes to `request.provider`, falling back to the default provider.
    pub async fn complete(&self, mut request: Request) -> Result<Response, SDKError> {
        let name = request
            .provider
            .clone()
            .or_else(|| self.default_provider.clone())
            .ok_or_else(|| ConfigurationError::new("no provider configured"))?;
        let adapter = self.providers.get(&name).ok_or_else(|| {
            ConfigurationError::new(format!("provider '{name}' not registered"))
        })?;
        request.provider = Some(name);

        Next {
            chain: self.middleware.as_slice(),
            adapter: adapter.as_ref(),
        }
        .run(request)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FinishReason, Message, Usage};
    use std::sync::Mutex;

    struct EchoAdapter {
        name: String,
    }

    #[async_trait]
    impl ProviderAdapter for EchoAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(&self, request: Request) -> Result<Response, SDKError> {
            Ok(Response {
                id: "resp".to_string(),
                model: request.model,
                provider: self.name.clone(),
                text: request.messages[0].content.clone(),
                finish_reason: FinishReason::stop(),
                usage: Usage::default(),
            })
        }
    }

    fn echo(name: &str) -> Arc<dyn ProviderAdapter> {
        Arc::new(EchoAdapter {
            name: name.to_string(),
        })
    }

    /// Records entry and exit, and tags the prompt on the way down.
    struct TraceMiddleware {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for TraceMiddleware {
        async fn handle_complete(
            &self,
            mut request: Request,
            next: Next<'_>,
        ) -> Result<Response, SDKError> {
            self.log
                .lock()
                .expect("log mutex should lock")
                .push(format!("enter {}", self.label));
            request.messages[0].content.push_str(self.label);
            let result = next.run(request).await;
            self.log
                .lock()
                .expect("log mutex should lock")
                .push(format!("exit {}", self.label));
            result
        }
    }

    fn request() -> Request {
        Request::new("model", vec![Message::user(">")])
    }

    #[tokio::test(flavor = "current_thread")]
    async fn complete_middleware_chain_expected_first_added_outermost() {
        let mut client = Client::default();
        client.register_provider(echo("test"));
        let log = Arc::new(Mutex::new(Vec::new()));
        for label in ["a", "b"] {
            client.add_middleware(Arc::new(TraceMiddleware {
                label,
                log: log.clone(),
            }));
        }

        let response = client
            .complete(request())
            .await
            .expect("completion should succeed");

        assert_eq!(response.text, ">ab");
        assert_eq!(
            log.lock().expect("log mutex should lock").as_slice(),
            ["enter a", "enter b", "exit b", "exit a"]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn complete_call_log_middleware_expected_response_unchanged() {
        let mut client = Client::default();
        client.register_provider(echo("test"));
        client.add_middleware(Arc::new(CallLogMiddleware));

        let response = client
            .complete(request())
            .await
            .expect("completion should succeed");
        assert_eq!(response.text, ">");
        assert_eq!(response.provider, "test");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn complete_request_provider_expected_routed_over_default() {
        let mut client = Client::default();
        client.register_provider(echo("first"));
        client.register_provider(echo("second"));
        assert_eq!(client.default_provider(), Some("first"));

        let mut routed = request();
        routed.provider = Some("second".to_string());
        let response = client
            .complete(routed)
            .await
            .expect("completion should succeed");
        assert_eq!(response.provider, "second");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn complete_without_provider_expected_configuration_error() {
        let client = Client::default();
        let error = client.complete(request()).await.unwrap_err();
        assert!(matches!(error, SDKError::Configuration(_)));
        assert!(!error.retryable());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn complete_unknown_provider_expected_configuration_error() {
        let mut client = Client::default();
        client.set_default_provider("missing");
        let error = client.complete(request()).await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "configuration error: provider 'missing' not registered"
        );
    }
}
