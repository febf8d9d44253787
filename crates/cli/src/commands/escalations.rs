//! Escalation queue command handlers.

use campus_chat::{EscalationStatus, Runtime};
use campus_core::{config::AppConfig, AppError, AppResult};
use clap::{Args, Subcommand};

/// Escalation queue administration
#[derive(Args, Debug)]
pub struct EscalationsCommand {
    #[command(subcommand)]
    pub action: EscalationsAction,
}

#[derive(Subcommand, Debug)]
pub enum EscalationsAction {
    /// List escalated turns, newest first
    List(EscalationsListCommand),
    /// Mark an escalation as handled
    Resolve(EscalationsResolveCommand),
}

impl EscalationsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            EscalationsAction::List(cmd) => cmd.execute(config),
            EscalationsAction::Resolve(cmd) => cmd.execute(config),
        }
    }
}

/// List escalated turns
#[derive(Args, Debug)]
pub struct EscalationsListCommand {
    /// Filter by status (pending, resolved)
    #[arg(long)]
    pub status: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl EscalationsListCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let status = match self.status.as_deref() {
            Some(raw) => Some(EscalationStatus::parse(raw).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Unknown status '{}'. Expected pending or resolved",
                    raw
                ))
            })?),
            None => None,
        };

        let runtime = Runtime::open(config)?;
        let records = runtime.sessions.list_escalations(status)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        if records.is_empty() {
            println!("No escalations");
            return Ok(());
        }
        for record in records {
            let reasons: Vec<&str> = record.reasons.iter().map(|r| r.as_str()).collect();
            println!(
                "{}  {}  {:<8}  session {}  {}{}",
                record.id,
                record.created_at.format("%Y-%m-%d %H:%M"),
                record.status.as_str(),
                record.session_id,
                reasons.join(","),
                record
                    .assignee
                    .map(|a| format!("  ({})", a))
                    .unwrap_or_default()
            );
        }
        Ok(())
    }
}

/// Mark an escalation as handled
#[derive(Args, Debug)]
pub struct EscalationsResolveCommand {
    /// Escalation id
    pub id: String,

    /// Staff member who handled it
    #[arg(long)]
    pub assignee: String,
}

impl EscalationsResolveCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let runtime = Runtime::open(config)?;
        if runtime
            .sessions
            .resolve_escalation(&self.id, &self.assignee)?
        {
            println!("Resolved {}", self.id);
            Ok(())
        } else {
            Err(AppError::InvalidInput(format!(
                "No pending escalation with id {}",
                self.id
            )))
        }
    }
}
