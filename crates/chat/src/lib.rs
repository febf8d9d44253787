//! Campus Assistant conversation engine.
//!
//! A [`ConversationPipeline`] answers one student message at a time:
//!
//! 1. detect the message language and translate it to the pivot language
//! 2. load (or create) the session and classify the intent
//! 3. retrieve FAQ entries and document chunks
//! 4. generate an answer and score its confidence from retrieval quality
//! 5. decide on escalation, translate back and propose follow-up questions
//!
//! Provider failures are absorbed inside the pipeline. Only an unavailable
//! knowledge store fails a request.

pub mod confidence;
pub mod context;
pub mod escalation;
pub mod generator;
pub mod intent;
pub mod language;
pub mod messages;
pub mod pipeline;
pub mod runtime;
pub mod session_store;
pub mod suggestions;
pub mod translation;
pub mod types;

pub use context::{ContextManager, SessionGuard};
pub use escalation::{EscalationDecision, EscalationPolicy};
pub use generator::{Generated, ResponseGenerator};
pub use intent::IntentDetector;
pub use language::LanguageDetector;
pub use pipeline::ConversationPipeline;
pub use runtime::Runtime;
pub use session_store::{MemorySessionStore, SessionStore, SqliteSessionStore};
pub use suggestions::SuggestionGenerator;
pub use translation::{Translation, Translator};
pub use types::{
    ChatRequest, ChatResponse, Citation, EscalationReason, EscalationRecord, EscalationStatus,
    ReindexResponse, Session, SessionPhase, SourceSnippet, Turn, TurnRole, WelcomeResponse,
};

#[cfg(test)]
mod tests;
