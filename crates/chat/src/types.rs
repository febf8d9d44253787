//! Conversation data model and the request/response contract.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A knowledge item an assistant turn relied on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub item_id: String,
    pub title: String,
    pub score: f32,
}

/// One message within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub role: TurnRole,

    /// Text as shown to the student
    pub content: String,

    /// Pivot-language rendering used for retrieval and prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_text: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Language the message was detected in (user turns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,

    /// Language the answer was delivered in (assistant turns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// 0-100, assistant turns only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,

    #[serde(default)]
    pub sources: Vec<Citation>,

    #[serde(default)]
    pub escalated: bool,

    /// Set when a translation for this turn fell back to the original text
    #[serde(default)]
    pub translation_degraded: bool,
}

impl Turn {
    fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            pivot_text: None,
            timestamp: Utc::now(),
            detected_language: None,
            response_language: None,
            intent: None,
            confidence: None,
            sources: Vec::new(),
            escalated: false,
            translation_degraded: false,
        }
    }

    pub fn user(content: impl Into<String>, detected_language: impl Into<String>) -> Self {
        Self {
            detected_language: Some(detected_language.into()),
            ..Self::new(TurnRole::User, content)
        }
    }

    pub fn assistant(content: impl Into<String>, response_language: impl Into<String>) -> Self {
        Self {
            response_language: Some(response_language.into()),
            ..Self::new(TurnRole::Assistant, content)
        }
    }

    /// Pivot-language text, falling back to the displayed content.
    pub fn pivot(&self) -> &str {
        self.pivot_text.as_deref().unwrap_or(&self.content)
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    New,
    Active,
    Idle,
    Expired,
}

/// A conversation with one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,

    /// Language the student last wrote in
    pub language: String,

    /// Intent of the most recent exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_intent: Option<String>,

    /// Set once a sweep (or a late lookup) expires the session
    #[serde(default)]
    pub expired: bool,

    /// Append-only, oldest first
    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl Session {
    pub fn new(language: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            last_active: now,
            language: language.into(),
            last_intent: None,
            expired: false,
            turns: Vec::new(),
        }
    }

    pub fn phase(&self, now: DateTime<Utc>, idle_after: Duration, expire_after: Duration) -> SessionPhase {
        let inactive = now - self.last_active;
        if self.expired || inactive >= expire_after {
            SessionPhase::Expired
        } else if self.turns.is_empty() {
            SessionPhase::New
        } else if inactive >= idle_after {
            SessionPhase::Idle
        } else {
            SessionPhase::Active
        }
    }

    /// The most recent `exchanges` user/assistant pairs.
    pub fn active_window(&self, exchanges: usize) -> &[Turn] {
        let keep = exchanges.saturating_mul(2);
        let start = self.turns.len().saturating_sub(keep);
        &self.turns[start..]
    }

    /// Number of immediately preceding assistant turns below `ceiling`.
    pub fn low_confidence_streak(&self, ceiling: u8) -> u32 {
        let mut streak = 0;
        for turn in self.turns.iter().rev().filter(|t| t.role == TurnRole::Assistant) {
            match turn.confidence {
                Some(confidence) if confidence < ceiling => streak += 1,
                _ => break,
            }
        }
        streak
    }

    /// Pivot-language text of every user turn.
    pub fn asked_questions(&self) -> Vec<&str> {
        self.turns
            .iter()
            .filter(|t| t.role == TurnRole::User)
            .map(|t| t.pivot())
            .collect()
    }
}

/// Why a turn was handed to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    LowConfidence,
    EmptyRetrieval,
    TriggerKeyword,
    ConsecutiveLowConfidence,
    GenerationFailure,
    RateLimited,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowConfidence => "low_confidence",
            Self::EmptyRetrieval => "empty_retrieval",
            Self::TriggerKeyword => "trigger_keyword",
            Self::ConsecutiveLowConfidence => "consecutive_low_confidence",
            Self::GenerationFailure => "generation_failure",
            Self::RateLimited => "rate_limited",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            Self::LowConfidence,
            Self::EmptyRetrieval,
            Self::TriggerKeyword,
            Self::ConsecutiveLowConfidence,
            Self::GenerationFailure,
            Self::RateLimited,
        ]
        .into_iter()
        .find(|reason| reason.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationStatus {
    Pending,
    Resolved,
}

impl EscalationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

/// A turn handed to a human operator. At most one per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub id: String,
    pub session_id: String,
    pub turn_id: String,
    pub created_at: DateTime<Utc>,
    pub status: EscalationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub reasons: Vec<EscalationReason>,
}

impl EscalationRecord {
    pub fn pending(session_id: &str, turn_id: &str, reasons: Vec<EscalationReason>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            turn_id: turn_id.to_string(),
            created_at: Utc::now(),
            status: EscalationStatus::Pending,
            assignee: None,
            reasons,
        }
    }
}

/// Inbound chat message from a channel adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.preferred_language = Some(language.into());
        self
    }
}

/// A retrieved snippet as shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnippet {
    pub title: String,
    pub content: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub detected_language: String,
    pub response_language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    pub confidence: u8,
    pub sources: Vec<SourceSnippet>,
    pub needs_escalation: bool,
    pub suggested_questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeResponse {
    pub response: String,
    pub suggested_questions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexResponse {
    pub indexed: usize,
}
