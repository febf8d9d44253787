//! Per-message orchestration.

use crate::context::{ContextManager, SessionGuard};
use crate::escalation::EscalationPolicy;
use crate::generator::ResponseGenerator;
use crate::intent::{IntentDetector, GENERAL_INTENT};
use crate::language::LanguageDetector;
use crate::messages::{APOLOGY_MESSAGE, STARTER_QUESTIONS, UNAVAILABLE_MESSAGE, WELCOME_MESSAGE};
use crate::suggestions::SuggestionGenerator;
use crate::translation::Translator;
use crate::types::{
    ChatRequest, ChatResponse, Citation, EscalationReason, EscalationRecord, ReindexResponse,
    SourceSnippet, Turn, WelcomeResponse,
};
use campus_core::config::{EngineConfig, LanguageConfig};
use campus_core::languages::{lookup, LanguageInfo};
use campus_core::{AppError, AppResult};
use campus_knowledge::{RetrievalResult, Retriever};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Characters of snippet text returned to the caller per source.
const SOURCE_PREVIEW_CHARS: usize = 200;

/// Answers student messages end to end.
pub struct ConversationPipeline {
    languages: LanguageConfig,
    top_k: usize,
    detector: LanguageDetector,
    translator: Translator,
    retriever: Arc<Retriever>,
    context: Arc<ContextManager>,
    generator: ResponseGenerator,
    escalation: EscalationPolicy,
    intents: IntentDetector,
    suggestions: SuggestionGenerator,
}

impl ConversationPipeline {
    pub fn new(
        config: &EngineConfig,
        retriever: Arc<Retriever>,
        context: Arc<ContextManager>,
        generator: ResponseGenerator,
        translator: Translator,
    ) -> Self {
        Self {
            languages: config.languages.clone(),
            top_k: config.retrieval.top_k,
            detector: LanguageDetector::new(&config.languages),
            translator,
            retriever,
            context,
            generator,
            escalation: EscalationPolicy::new(
                config.escalation.clone(),
                config.retrieval.min_relevance,
            ),
            intents: IntentDetector::new(),
            suggestions: SuggestionGenerator::new(config.suggestions.max),
        }
    }

    pub fn context(&self) -> &Arc<ContextManager> {
        &self.context
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    /// Answer one message.
    ///
    /// Translation and generation failures degrade into the response. Fails
    /// only for an empty message, an unavailable knowledge store, or a
    /// session-store failure.
    pub async fn chat(&self, request: ChatRequest) -> AppResult<ChatResponse> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(AppError::InvalidInput("Message is empty".to_string()));
        }

        let preferred = request
            .preferred_language
            .as_deref()
            .filter(|code| self.languages.is_supported(code));
        if let (Some(code), None) = (request.preferred_language.as_deref(), preferred) {
            tracing::warn!(language = code, "Ignoring unsupported preferred language");
        }

        let initial_language = preferred.unwrap_or(&self.languages.default);
        let mut guard = self
            .context
            .begin(request.session_id.as_deref(), initial_language)
            .await?;

        let span = tracing::info_span!("chat", session = %guard.id());
        self.process(&mut guard, message, preferred)
            .instrument(span)
            .await
    }

    async fn process(
        &self,
        guard: &mut SessionGuard,
        message: &str,
        preferred: Option<&str>,
    ) -> AppResult<ChatResponse> {
        let start = Instant::now();
        let pivot = self.languages.pivot.as_str();

        let detected = match self.detector.detect(message) {
            Some(code) => {
                self.context.set_language(guard, &code)?;
                code
            }
            None => {
                tracing::debug!(
                    fallback = %guard.session().language,
                    "Language not detected, using session language"
                );
                guard.session().language.clone()
            }
        };
        let response_language = preferred.unwrap_or(&detected).to_string();

        let inbound = self.translator.translate(message, &detected, pivot).await;
        let query = inbound.text.as_str();
        let intent = self.intents.detect(query);
        let category_hint = if intent != GENERAL_INTENT {
            Some(intent.clone())
        } else {
            guard.session().last_intent.clone()
        };

        let mut forced = None;
        let results: Vec<RetrievalResult> = if inbound.rate_limited {
            forced = Some(EscalationReason::RateLimited);
            Vec::new()
        } else {
            self.retriever
                .retrieve(query, self.top_k, category_hint.as_deref())
                .await?
        };

        let (answer, confidence) = if forced.is_some() {
            (UNAVAILABLE_MESSAGE.to_string(), 0)
        } else {
            let history = self.context.active_window(guard);
            match self
                .generator
                .generate(query, history, &results, &response_language)
                .await
            {
                Ok(generated) => (generated.answer, generated.confidence),
                Err(e) if e.is_rate_limited() => {
                    tracing::warn!(error = %e, "Generation rate limited");
                    forced = Some(EscalationReason::RateLimited);
                    (UNAVAILABLE_MESSAGE.to_string(), 0)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Generation failed");
                    forced = Some(EscalationReason::GenerationFailure);
                    (APOLOGY_MESSAGE.to_string(), 0)
                }
            }
        };

        let streak = guard
            .session()
            .low_confidence_streak(self.escalation.low_confidence_ceiling());
        let mut decision = self.escalation.decide(confidence, &results, query, streak);
        if let Some(reason) = forced {
            decision.force(reason);
        }

        let outbound = self
            .translator
            .translate(&answer, pivot, &response_language)
            .await;
        // The student gets the untranslated answer, so say why
        let reply = if outbound.rate_limited {
            decision.force(EscalationReason::RateLimited);
            if answer == UNAVAILABLE_MESSAGE {
                outbound.text
            } else {
                format!("{}\n\n{}", UNAVAILABLE_MESSAGE, outbound.text)
            }
        } else {
            outbound.text
        };

        let mut asked = guard.session().asked_questions();
        asked.push(query);
        let pivot_suggestions = self.suggestions.suggest(&results, &intent, &asked);
        let suggested_questions = self
            .translate_all(&pivot_suggestions, pivot, &response_language)
            .await;

        let user_turn = Turn {
            pivot_text: Some(inbound.text.clone()),
            intent: Some(intent.clone()),
            translation_degraded: inbound.degraded,
            ..Turn::user(message, detected.as_str())
        };
        let assistant_turn = Turn {
            pivot_text: Some(answer),
            intent: Some(intent.clone()),
            confidence: Some(confidence),
            sources: results
                .iter()
                .map(|r| Citation {
                    item_id: r.item.id.clone(),
                    title: r.item.title.clone(),
                    score: r.score,
                })
                .collect(),
            escalated: decision.escalate(),
            translation_degraded: outbound.degraded,
            ..Turn::assistant(reply.clone(), response_language.as_str())
        };
        let record = decision.escalate().then(|| {
            EscalationRecord::pending(guard.id(), &assistant_turn.id, decision.reasons.clone())
        });

        if self
            .context
            .append_exchange(guard, user_turn, assistant_turn, record.as_ref())?
        {
            if let Some(record) = &record {
                tracing::info!(
                    turn = %record.turn_id,
                    reasons = ?record.reasons,
                    "Escalated turn"
                );
            }
        }
        self.context.set_last_intent(guard, &intent)?;

        tracing::info!(
            detected = %detected,
            response_language = %response_language,
            intent = %intent,
            results = results.len(),
            confidence,
            escalate = decision.escalate(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Answered message"
        );

        Ok(ChatResponse {
            response: reply,
            session_id: guard.id().to_string(),
            detected_language: detected,
            response_language,
            intent: Some(intent),
            confidence,
            sources: results.iter().map(source_snippet).collect(),
            needs_escalation: decision.escalate(),
            suggested_questions,
        })
    }

    /// Rebuild the knowledge index from the store.
    pub async fn reindex_knowledge_base(&self) -> AppResult<ReindexResponse> {
        let indexed = self.retriever.reindex_all().await?;
        Ok(ReindexResponse { indexed })
    }

    /// Greeting and starter questions in `language` (or the default).
    pub async fn welcome_message(&self, language: Option<&str>) -> WelcomeResponse {
        let language = language
            .filter(|code| self.languages.is_supported(code))
            .unwrap_or(&self.languages.default);
        let pivot = self.languages.pivot.as_str();

        let response = self
            .translator
            .translate(WELCOME_MESSAGE, pivot, language)
            .await
            .text;
        let starters: Vec<String> = STARTER_QUESTIONS
            .iter()
            .take(self.suggestions_max())
            .map(|q| q.to_string())
            .collect();
        let suggested_questions = self.translate_all(&starters, pivot, language).await;

        WelcomeResponse {
            response,
            suggested_questions,
        }
    }

    /// The configured languages with display names.
    pub fn supported_languages(&self) -> Vec<LanguageInfo> {
        self.languages
            .supported
            .iter()
            .filter_map(|code| lookup(code).copied())
            .collect()
    }

    fn suggestions_max(&self) -> usize {
        self.suggestions.max()
    }

    async fn translate_all(&self, texts: &[String], from: &str, to: &str) -> Vec<String> {
        let mut translated = Vec::with_capacity(texts.len());
        for text in texts {
            translated.push(self.translator.translate(text, from, to).await.text);
        }
        translated
    }
}

fn source_snippet(result: &RetrievalResult) -> SourceSnippet {
    let text = &result.item.text;
    let content = match text.char_indices().nth(SOURCE_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.clone(),
    };
    SourceSnippet {
        title: result.item.title.clone(),
        content,
        score: result.score,
    }
}
