//! Prompt system for the Campus Assistant.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions with separate system and user templates
//! - Built-in defaults that workspace files can override
//! - Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use defaults::{builtin_prompt, RAG_ANSWER_PROMPT_ID};
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition};
