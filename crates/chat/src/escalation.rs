//! When to hand a turn to a human operator.

use crate::types::EscalationReason;
use campus_core::config::EscalationConfig;
use campus_knowledge::text::{contains_phrase, normalize, tokens};
use campus_knowledge::RetrievalResult;

/// Outcome of [`EscalationPolicy::decide`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscalationDecision {
    pub reasons: Vec<EscalationReason>,
}

impl EscalationDecision {
    pub fn escalate(&self) -> bool {
        !self.reasons.is_empty()
    }

    /// Add a reason decided outside the policy (e.g. a provider failure).
    pub fn force(&mut self, reason: EscalationReason) {
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }
}

pub struct EscalationPolicy {
    config: EscalationConfig,
    relevance_floor: f32,
    triggers: Vec<String>,
}

impl EscalationPolicy {
    pub fn new(config: EscalationConfig, relevance_floor: f32) -> Self {
        let triggers = config
            .trigger_keywords
            .iter()
            .map(|k| normalize(k))
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            config,
            relevance_floor,
            triggers,
        }
    }

    pub fn low_confidence_ceiling(&self) -> u8 {
        self.config.low_confidence_ceiling
    }

    /// Whether `confidence` counts towards the low-confidence streak.
    pub fn is_low(&self, confidence: u8) -> bool {
        confidence < self.config.low_confidence_ceiling
    }

    /// Decide on escalation for a turn.
    ///
    /// `prior_low_streak` is the number of immediately preceding assistant
    /// turns that were low-confidence.
    pub fn decide(
        &self,
        confidence: u8,
        results: &[RetrievalResult],
        query: &str,
        prior_low_streak: u32,
    ) -> EscalationDecision {
        let mut decision = EscalationDecision::default();

        if confidence < self.config.confidence_threshold {
            decision.force(EscalationReason::LowConfidence);
        }

        if !results.iter().any(|r| r.score >= self.relevance_floor) {
            decision.force(EscalationReason::EmptyRetrieval);
        }

        if self.matches_trigger(query).is_some() {
            decision.force(EscalationReason::TriggerKeyword);
        }

        let run = if self.is_low(confidence) {
            prior_low_streak.saturating_add(1)
        } else {
            0
        };
        if self.config.consecutive_low_limit > 0 && run >= self.config.consecutive_low_limit {
            decision.force(EscalationReason::ConsecutiveLowConfidence);
        }

        decision
    }

    /// The first trigger phrase found in `query`, if any.
    ///
    /// Single-word triggers match as word prefixes so inflections
    /// ("complaints", "urgently") still count; phrases match whole words.
    pub fn matches_trigger(&self, query: &str) -> Option<&str> {
        let normalized = normalize(query);
        let words = tokens(query);
        self.triggers
            .iter()
            .find(|trigger| {
                if trigger.contains(' ') {
                    contains_phrase(&normalized, trigger)
                } else {
                    words.iter().any(|w| w.starts_with(trigger.as_str()))
                }
            })
            .map(|t| t.as_str())
    }
}
