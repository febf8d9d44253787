//! Wiring from configuration to a ready pipeline.

use crate::context::ContextManager;
use crate::generator::ResponseGenerator;
use crate::pipeline::ConversationPipeline;
use crate::session_store::{MemorySessionStore, SessionStore, SqliteSessionStore};
use crate::translation::Translator;
use campus_core::{AppConfig, AppResult};
use campus_knowledge::{
    create_provider, KnowledgeIndex, KnowledgeStore, MemoryKnowledgeStore, Retriever,
    SqliteKnowledgeStore,
};
use campus_llm::{create_client, LlmTranslationProvider, RetryPolicy};
use campus_prompt::{load_prompt, RAG_ANSWER_PROMPT_ID};
use std::sync::Arc;

/// Everything a front end needs to serve requests.
pub struct Runtime {
    pub pipeline: Arc<ConversationPipeline>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub context: Arc<ContextManager>,
}

impl Runtime {
    /// Open stores and construct providers. The index is not built here.
    pub fn open(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        let engine = &config.engine;

        let (knowledge, sessions): (Arc<dyn KnowledgeStore>, Arc<dyn SessionStore>) =
            match config.database_path() {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    tracing::debug!(path = %path.display(), "Opening SQLite stores");
                    (
                        Arc::new(SqliteKnowledgeStore::open(&path)?),
                        Arc::new(SqliteSessionStore::open(&path)?),
                    )
                }
                None => {
                    tracing::debug!("Using in-memory stores");
                    (
                        Arc::new(MemoryKnowledgeStore::new()),
                        Arc::new(MemorySessionStore::new()),
                    )
                }
            };

        let retry = RetryPolicy::from_config(&engine.providers);
        let endpoint = config.endpoint.as_deref();

        let mut retrieval = engine.retrieval.clone();
        if retrieval.embedding.provider == "ollama" {
            if let Some(model) = config.embedding_model() {
                retrieval.embedding.model = model;
            }
        }
        let embedder = create_provider(&retrieval.embedding, endpoint, retry)?;
        let retriever = Arc::new(Retriever::new(
            knowledge.clone(),
            Arc::new(KnowledgeIndex::new()),
            embedder,
            retrieval,
        ));

        let client = create_client(&config.provider, endpoint)?;
        let prompt = load_prompt(&config.prompts_dir(), RAG_ANSWER_PROMPT_ID)?;
        let generator = ResponseGenerator::new(
            client.clone(),
            config.model.clone(),
            prompt,
            retry,
            engine.retrieval.min_relevance,
        );
        let translator = Translator::new(
            Arc::new(LlmTranslationProvider::new(client, config.model.clone())),
            retry,
        );

        let context = Arc::new(ContextManager::new(sessions.clone(), engine.session.clone()));
        let pipeline = Arc::new(ConversationPipeline::new(
            engine,
            retriever,
            context.clone(),
            generator,
            translator,
        ));

        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            languages = engine.languages.supported.len(),
            "Conversation runtime ready"
        );

        Ok(Self {
            pipeline,
            knowledge,
            sessions,
            context,
        })
    }
}
