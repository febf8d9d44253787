//! Provider integration crate for the Campus Assistant.
//!
//! This crate provides provider-agnostic abstractions for the two kinds of
//! external model calls the conversation engine makes:
//! - **Generation** through [`LlmClient`] (single-shot request/response)
//! - **Translation** through [`TranslationProvider`]
//!
//! Both are wrapped by a shared [`RetryPolicy`] that applies an explicit
//! timeout and bounded exponential backoff on transient failures.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use campus_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What is the hostel fee?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod retry;
pub mod translate;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
pub use retry::RetryPolicy;
pub use translate::{LlmTranslationProvider, TranslationProvider};
