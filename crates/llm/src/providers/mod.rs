//! Concrete generation providers.

pub mod ollama;

pub use ollama::{classify_send_error, classify_status, OllamaClient};
