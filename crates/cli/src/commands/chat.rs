//! Chat command handler.

use campus_chat::{ChatRequest, ChatResponse, ConversationPipeline, Runtime};
use campus_core::{config::AppConfig, AppResult};
use clap::Args;
use std::io::{BufRead, Write};

/// Ask the assistant a question
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Message to send; omit to start an interactive session
    pub message: Option<String>,

    /// Continue an existing session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Preferred response language code (e.g. hi, ta)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");
        tracing::debug!("Chat options: {:?}", self);

        let runtime = Runtime::open(config)?;
        let indexed = runtime.pipeline.reindex_knowledge_base().await?;
        tracing::debug!(indexed = indexed.indexed, "Knowledge index ready");

        match &self.message {
            Some(message) => {
                let response = self
                    .send(&runtime.pipeline, message, self.session.clone())
                    .await?;
                self.print(&response)
            }
            None => {
                // Long-lived session: expire idle conversations in the background
                let sweeper = runtime.context.clone().spawn_sweeper();
                let result = self.interactive(&runtime.pipeline).await;
                sweeper.abort();
                result
            }
        }
    }

    async fn send(
        &self,
        pipeline: &ConversationPipeline,
        message: &str,
        session: Option<String>,
    ) -> AppResult<ChatResponse> {
        let mut request = ChatRequest::new(message);
        if let Some(id) = session {
            request = request.in_session(id);
        }
        if let Some(language) = &self.language {
            request = request.with_language(language.clone());
        }
        pipeline.chat(request).await
    }

    async fn interactive(&self, pipeline: &ConversationPipeline) -> AppResult<()> {
        let welcome = pipeline.welcome_message(self.language.as_deref()).await;
        println!("{}\n", welcome.response);

        let mut session = self.session.clone();
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let message = line.trim();
            if message.is_empty() {
                continue;
            }
            if matches!(message, "exit" | "quit") {
                break;
            }

            let response = self.send(pipeline, message, session.clone()).await?;
            session = Some(response.session_id.clone());
            self.print(&response)?;
        }
        Ok(())
    }

    fn print(&self, response: &ChatResponse) -> AppResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(response)?);
            return Ok(());
        }

        println!("{}", response.response);
        println!();
        println!(
            "[{} -> {}] confidence {}{}",
            response.detected_language,
            response.response_language,
            response.confidence,
            if response.needs_escalation {
                ", escalated to staff"
            } else {
                ""
            }
        );
        for source in &response.sources {
            println!("  source: {} ({:.2})", source.title, source.score);
        }
        if !response.suggested_questions.is_empty() {
            println!("You can also ask:");
            for question in &response.suggested_questions {
                println!("  - {}", question);
            }
        }
        println!("session: {}", response.session_id);
        Ok(())
    }
}
