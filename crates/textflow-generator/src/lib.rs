//! Natural-language to flowchart generation.
//!
//! Drives a text-generation backend through a generate, validate, repair loop:
//! malformed or schema-violating output is answered with a repair prompt and
//! retried immediately, while transient backend failures are retried after an
//! exponential backoff.

pub mod config;
pub mod errors;
pub mod events;
pub mod generator;
pub mod prompts;
pub mod retry;

pub use config::*;
pub use errors::*;
pub use events::*;
pub use generator::*;
pub use prompts::*;
pub use retry::*;
