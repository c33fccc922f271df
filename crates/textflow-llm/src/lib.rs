//! Text-generation backend abstraction for textflow.
//!
//! Provides the request/response types, the error taxonomy used to decide
//! whether a failed call may be retried, the provider adapter contract, and a
//! client that routes requests to a registered provider.

pub mod client;
pub mod errors;
pub mod openai;
pub mod provider;
pub mod types;

pub use client::*;
pub use errors::*;
pub use openai::*;
pub use provider::*;
pub use types::*;
