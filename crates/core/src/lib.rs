//! Campus Assistant Core Library
//!
//! This crate provides the foundational utilities shared by every other crate
//! in the workspace:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (global settings and the engine configuration)
//! - The language catalogue

pub mod config;
pub mod error;
pub mod languages;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, EngineConfig};
pub use error::{AppError, AppResult};
