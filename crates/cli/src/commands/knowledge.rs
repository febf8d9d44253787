//! Knowledge command handler.
//!
//! Handles FAQ import, document ingestion and retrieval previews against the
//! campus knowledge base.

use campus_chat::Runtime;
use campus_core::{config::AppConfig, AppError, AppResult};
use campus_knowledge::{import_faqs, ingest_paths, IngestOptions};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Import FAQ entries from a YAML or JSON file
    ImportFaqs(KnowledgeImportFaqsCommand),
    /// Ingest text and markdown documents
    AddDocs(KnowledgeAddDocsCommand),
    /// Remove a document and its chunks
    RemoveDoc(KnowledgeRemoveDocCommand),
    /// Enable or disable an FAQ entry
    SetActive(KnowledgeSetActiveCommand),
    /// Show the retrieval results for a query
    Search(KnowledgeSearchCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::ImportFaqs(cmd) => cmd.execute(config).await,
            KnowledgeAction::AddDocs(cmd) => cmd.execute(config).await,
            KnowledgeAction::RemoveDoc(cmd) => cmd.execute(config),
            KnowledgeAction::SetActive(cmd) => cmd.execute(config),
            KnowledgeAction::Search(cmd) => cmd.execute(config).await,
            KnowledgeAction::Stats(cmd) => cmd.execute(config),
        }
    }
}

/// Reindex so that embeddings for new content are cached in the store.
async fn refresh_index(runtime: &Runtime) -> AppResult<usize> {
    let response = runtime.pipeline.reindex_knowledge_base().await?;
    Ok(response.indexed)
}

/// Import FAQ entries
#[derive(Args, Debug)]
pub struct KnowledgeImportFaqsCommand {
    /// YAML (or .json) file holding a list of FAQ entries
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeImportFaqsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Importing FAQs from {:?}", self.file);

        let runtime = Runtime::open(config)?;
        let imported = import_faqs(runtime.knowledge.as_ref(), &self.file)?;
        let indexed = refresh_index(&runtime).await?;

        if self.json {
            let output = serde_json::json!({
                "imported": imported,
                "indexed": indexed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Imported {} FAQs ({} items indexed)", imported, indexed);
        }
        Ok(())
    }
}

/// Ingest documents
#[derive(Args, Debug)]
pub struct KnowledgeAddDocsCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Category label for every ingested document
    #[arg(long, default_value = "general")]
    pub category: String,

    /// Language code of the documents
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeAddDocsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Ingesting {} paths", self.paths.len());

        let runtime = Runtime::open(config)?;
        let options = IngestOptions {
            category: self.category.clone(),
            language: self.language.clone(),
        };
        let stats = ingest_paths(
            runtime.knowledge.as_ref(),
            &self.paths,
            &options,
            &config.engine.retrieval,
        )?;
        let indexed = refresh_index(&runtime).await?;

        if self.json {
            let output = serde_json::json!({
                "documents": stats.documents,
                "chunks": stats.chunks,
                "bytes": stats.bytes,
                "skipped": stats.skipped,
                "indexed": indexed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} documents ({} chunks, {} bytes, {} skipped)",
                stats.documents, stats.chunks, stats.bytes, stats.skipped
            );
        }
        Ok(())
    }
}

/// Remove a document
#[derive(Args, Debug)]
pub struct KnowledgeRemoveDocCommand {
    /// Document id (path relative to the ingested directory)
    pub id: String,
}

impl KnowledgeRemoveDocCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let runtime = Runtime::open(config)?;
        if runtime.knowledge.remove_document(&self.id)? {
            println!("Removed document {}", self.id);
            Ok(())
        } else {
            Err(AppError::Knowledge(format!("Unknown document: {}", self.id)))
        }
    }
}

/// Enable or disable an FAQ
#[derive(Args, Debug)]
pub struct KnowledgeSetActiveCommand {
    /// FAQ id
    pub id: String,

    /// Disable the entry instead of enabling it
    #[arg(long)]
    pub inactive: bool,
}

impl KnowledgeSetActiveCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let runtime = Runtime::open(config)?;
        let active = !self.inactive;
        if runtime.knowledge.set_faq_active(&self.id, active)? {
            println!(
                "FAQ {} {}",
                self.id,
                if active { "enabled" } else { "disabled" }
            );
            Ok(())
        } else {
            Err(AppError::Knowledge(format!("Unknown FAQ: {}", self.id)))
        }
    }
}

/// Preview retrieval
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Query text (in the pivot language)
    pub query: String,

    /// Number of results
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Category to prefer on ties
    #[arg(long)]
    pub category: Option<String>,
}

impl KnowledgeSearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let runtime = Runtime::open(config)?;
        refresh_index(&runtime).await?;

        let top_k = self.top_k.unwrap_or(config.engine.retrieval.top_k);
        let results = runtime
            .pipeline
            .retriever()
            .retrieve(&self.query, top_k, self.category.as_deref())
            .await?;

        if results.is_empty() {
            println!("No results above the relevance floor");
            return Ok(());
        }
        for (i, result) in results.iter().enumerate() {
            println!(
                "{}. [{:.3}] {} ({}, {}, {:?})",
                i + 1,
                result.score,
                result.item.title,
                result.item.source_type.as_str(),
                result.item.category,
                result.match_source
            );
        }
        Ok(())
    }
}

/// Show knowledge base stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let runtime = Runtime::open(config)?;
        let stats = runtime.knowledge.stats()?;

        if self.json {
            let output = serde_json::json!({
                "faqs": stats.faqs,
                "activeFaqs": stats.active_faqs,
                "documents": stats.documents,
                "chunks": stats.chunks,
                "cachedEmbeddings": stats.cached_embeddings,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Knowledge base:");
            println!("  FAQs: {} ({} active)", stats.faqs, stats.active_faqs);
            println!("  Documents: {}", stats.documents);
            println!("  Chunks: {}", stats.chunks);
            println!("  Cached embeddings: {}", stats.cached_embeddings);
        }
        Ok(())
    }
}
