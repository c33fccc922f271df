//! Provider adapter contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::SDKError;
use crate::openai::OpenAiFactory;
use crate::types::{Request, Response};

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: Request) -> Result<Response, SDKError>;
}

/// Factory for building adapters from environment variables.
pub trait ProviderFactory: Send + Sync {
    fn provider_id(&self) -> &'static str;
    fn from_env(&self) -> Option<Arc<dyn ProviderAdapter>>;
}

/// Factories consulted by `Client::from_env`, in registration order.
pub fn builtin_factories() -> Vec<Arc<dyn ProviderFactory>> {
    vec![Arc::new(OpenAiFactory)]
}
