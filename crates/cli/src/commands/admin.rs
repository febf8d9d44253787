//! Reindex, welcome, languages and sweep command handlers.

use campus_chat::Runtime;
use campus_core::{config::AppConfig, AppResult};
use clap::Args;

/// Rebuild the knowledge index from the store
#[derive(Args, Debug)]
pub struct ReindexCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ReindexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing reindex command");

        let runtime = Runtime::open(config)?;
        let response = runtime.pipeline.reindex_knowledge_base().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            println!("Indexed {} knowledge items", response.indexed);
        }
        Ok(())
    }
}

/// Show the welcome message
#[derive(Args, Debug)]
pub struct WelcomeCommand {
    /// Language code
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl WelcomeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let runtime = Runtime::open(config)?;
        let welcome = runtime
            .pipeline
            .welcome_message(self.language.as_deref())
            .await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&welcome)?);
        } else {
            println!("{}", welcome.response);
            println!();
            for question in &welcome.suggested_questions {
                println!("  - {}", question);
            }
        }
        Ok(())
    }
}

/// List supported languages
#[derive(Args, Debug)]
pub struct LanguagesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LanguagesCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let runtime = Runtime::open(config)?;
        let languages = runtime.pipeline.supported_languages();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&languages)?);
        } else {
            for language in languages {
                println!(
                    "{:<4} {:<12} {}",
                    language.code, language.name, language.native_name
                );
            }
        }
        Ok(())
    }
}

/// Expire sessions that have been inactive past the configured limit
#[derive(Args, Debug)]
pub struct SweepCommand {}

impl SweepCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing sweep command");

        let runtime = Runtime::open(config)?;
        let expired = runtime.context.sweep_expired()?;
        println!("Expired {} sessions", expired);
        Ok(())
    }
}
