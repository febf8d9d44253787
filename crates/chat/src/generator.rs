//! Prompt assembly, the generation call and confidence scoring.

use crate::confidence::{self, citation_tag};
use crate::types::{Turn, TurnRole};
use campus_core::languages::display_name;
use campus_core::{AppError, AppResult};
use campus_knowledge::{RetrievalResult, SourceType};
use campus_llm::{LlmClient, LlmRequest, RetryPolicy};
use campus_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

const NO_SOURCES: &str = "(no relevant sources were found)";

/// An answer and the confidence derived for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    /// Pivot-language answer text
    pub answer: String,
    /// 0-100, computed from retrieval quality
    pub confidence: u8,
    pub model: String,
}

/// Produces answers from retrieved context with one provider call per turn.
pub struct ResponseGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    retry: RetryPolicy,
    relevance_floor: f32,
}

impl ResponseGenerator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
        retry: RetryPolicy,
        relevance_floor: f32,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
            retry,
            relevance_floor,
        }
    }

    /// Build the generation request for a turn.
    pub fn build_request(
        &self,
        query: &str,
        history: &[Turn],
        results: &[RetrievalResult],
        response_language: &str,
    ) -> AppResult<LlmRequest> {
        let mut variables = HashMap::new();
        variables.insert(
            "language".to_string(),
            display_name(response_language).to_string(),
        );
        variables.insert("context".to_string(), format_sources(results));
        variables.insert("history".to_string(), format_history(history));
        variables.insert("query".to_string(), query.to_string());

        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, self.model.clone());
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = built.temperature {
            request = request.with_temperature(temperature);
        }
        Ok(request)
    }

    /// Generate an answer to `query`.
    ///
    /// Transient provider failures are retried per the shared policy; the
    /// final failure is returned for the caller to degrade.
    pub async fn generate(
        &self,
        query: &str,
        history: &[Turn],
        results: &[RetrievalResult],
        response_language: &str,
    ) -> AppResult<Generated> {
        let request = self.build_request(query, history, results, response_language)?;
        let start = Instant::now();

        let response = self
            .retry
            .run("generation", || self.client.complete(&request))
            .await?;

        let answer = response.content.trim().to_string();
        if answer.is_empty() {
            return Err(AppError::Llm(format!(
                "{} returned an empty answer",
                self.client.provider_name()
            )));
        }

        let confidence = confidence::score(results, &answer, self.relevance_floor);
        tracing::debug!(
            provider = self.client.provider_name(),
            model = %response.model,
            confidence,
            tokens = response.usage.total_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated answer"
        );

        Ok(Generated {
            answer,
            confidence,
            model: response.model,
        })
    }
}

/// Numbered source list for the prompt, one tagged block per result.
pub fn format_sources(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return NO_SOURCES.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let kind = match result.item.source_type {
                SourceType::Faq => "FAQ",
                SourceType::DocumentChunk => "Document",
            };
            format!(
                "{} {}: {} (id: {})\n{}",
                citation_tag(i),
                kind,
                result.item.title,
                result.item.id,
                result.item.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Conversation history in the pivot language.
pub fn format_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                TurnRole::User => "Student",
                TurnRole::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, turn.pivot())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
