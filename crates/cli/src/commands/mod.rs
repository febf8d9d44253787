//! Command handlers for the Campus Assistant CLI.

pub mod admin;
pub mod chat;
pub mod escalations;
pub mod knowledge;

pub use admin::{LanguagesCommand, ReindexCommand, SweepCommand, WelcomeCommand};
pub use chat::ChatCommand;
pub use escalations::EscalationsCommand;
pub use knowledge::KnowledgeCommand;
