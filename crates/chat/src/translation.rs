//! Degrading, entity-preserving translation.
//!
//! Numbers, currency amounts and e-mail addresses are swapped for `⟦n⟧`
//! placeholders before text reaches the provider and restored afterwards,
//! so they survive any number of round trips unchanged.

use campus_core::languages::provider_code;
use campus_core::AppResult;
use campus_llm::{RetryPolicy, TranslationProvider};
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Outcome of a translation. Never an error: failures fall back to the
/// original text with `degraded` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub degraded: bool,
    /// The provider refused the call because of rate limiting or quota
    pub rate_limited: bool,
}

impl Translation {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            degraded: false,
            rate_limited: false,
        }
    }
}

/// Wraps a [`TranslationProvider`] with retry, entity masking and fallback.
pub struct Translator {
    provider: Arc<dyn TranslationProvider>,
    retry: RetryPolicy,
}

impl Translator {
    pub fn new(provider: Arc<dyn TranslationProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// Translate `text` from `from` to `to`.
    ///
    /// A no-op when both codes map to the same provider language or the text
    /// is blank.
    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Translation {
        if provider_code(from) == provider_code(to) || text.trim().is_empty() {
            return Translation::unchanged(text);
        }

        let masked = mask_entities(text);
        match self.call_provider(&masked.text, from, to).await {
            Ok(translated) => Translation {
                text: masked.restore(&translated),
                degraded: false,
                rate_limited: false,
            },
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.provider_name(),
                    from,
                    to,
                    error = %e,
                    "Translation failed, returning original text"
                );
                Translation {
                    text: text.to_string(),
                    degraded: true,
                    rate_limited: e.is_rate_limited(),
                }
            }
        }
    }

    async fn call_provider(&self, text: &str, from: &str, to: &str) -> AppResult<String> {
        self.retry
            .run("translation", || self.provider.translate(text, from, to))
            .await
    }
}

/// Text with entities replaced by placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MaskedText {
    pub text: String,
    pub entities: Vec<String>,
}

impl MaskedText {
    /// Put the original entities back into `translated`.
    ///
    /// Placeholders the provider dropped are appended so no entity is lost.
    pub fn restore(&self, translated: &str) -> String {
        let Some(pattern) = placeholder_pattern() else {
            return translated.to_string();
        };

        let mut seen = vec![false; self.entities.len()];
        let restored = pattern
            .replace_all(translated, |caps: &regex::Captures<'_>| {
                let index: Option<usize> = caps.get(1).and_then(|m| m.as_str().parse().ok());
                match index.and_then(|i| self.entities.get(i).map(|e| (i, e))) {
                    Some((i, entity)) => {
                        seen[i] = true;
                        entity.clone()
                    }
                    None => caps[0].to_string(),
                }
            })
            .into_owned();

        let missing: Vec<&str> = self
            .entities
            .iter()
            .zip(&seen)
            .filter(|(_, seen)| !**seen)
            .map(|(entity, _)| entity.as_str())
            .collect();
        if missing.is_empty() {
            restored
        } else {
            tracing::debug!(missing = missing.len(), "Provider dropped entity placeholders");
            format!("{} ({})", restored, missing.join(", "))
        }
    }
}

fn entity_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+|(?:[₹$€£]\s?|Rs\.?\s?)?\d[\d,]*(?:[.:/-]\d+)*(?:/-|%)?",
            )
            .ok()
        })
        .as_ref()
}

fn placeholder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"⟦\s*(\d+)\s*⟧").ok())
        .as_ref()
}

pub(crate) fn mask_entities(text: &str) -> MaskedText {
    let Some(pattern) = entity_pattern() else {
        return MaskedText {
            text: text.to_string(),
            entities: Vec::new(),
        };
    };

    let mut entities = Vec::new();
    let masked = pattern
        .replace_all(text, |caps: &regex::Captures<'_>| {
            entities.push(caps[0].to_string());
            format!("⟦{}⟧", entities.len() - 1)
        })
        .into_owned();

    MaskedText {
        text: masked,
        entities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct EchoProvider {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl TranslationProvider for EchoProvider {
        fn provider_name(&self) -> &str {
            "echo"
        }

        async fn translate(&self, text: &str, _from: &str, to: &str) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("[{}] {}", to, text))
        }
    }

    struct FailingProvider {
        error: fn() -> AppError,
    }

    #[async_trait::async_trait]
    impl TranslationProvider for FailingProvider {
        fn provider_name(&self) -> &str {
            "failing"
        }

        async fn translate(&self, _text: &str, _from: &str, _to: &str) -> AppResult<String> {
            Err((self.error)())
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            base_backoff: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_same_language_is_noop() {
        let provider = Arc::new(EchoProvider {
            calls: AtomicU32::new(0),
        });
        let translator = Translator::new(provider.clone(), fast_retry());

        let out = translator.translate("Hello", "en", "en").await;
        assert_eq!(out.text, "Hello");
        assert!(!out.degraded);

        // Rajasthani is served through Hindi
        translator.translate("नमस्ते", "raj", "hi").await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_entities_survive_translation() {
        let translator = Translator::new(
            Arc::new(EchoProvider {
                calls: AtomicU32::new(0),
            }),
            fast_retry(),
        );

        let out = translator
            .translate(
                "फीस ₹50,000 है, 31-07-2025 तक admissions@college.edu पर लिखें",
                "hi",
                "en",
            )
            .await;

        assert!(out.text.starts_with("[en] "));
        assert!(out.text.contains("₹50,000"));
        assert!(out.text.contains("31-07-2025"));
        assert!(out.text.contains("admissions@college.edu"));
    }

    #[tokio::test]
    async fn test_failure_degrades_to_original() {
        let translator = Translator::new(
            Arc::new(FailingProvider {
                error: || AppError::Unavailable("down".to_string()),
            }),
            fast_retry(),
        );

        let out = translator.translate("फीस कितनी है?", "hi", "en").await;
        assert_eq!(out.text, "फीस कितनी है?");
        assert!(out.degraded);
        assert!(!out.rate_limited);
    }

    #[tokio::test]
    async fn test_rate_limit_is_flagged() {
        let translator = Translator::new(
            Arc::new(FailingProvider {
                error: || AppError::RateLimited("quota".to_string()),
            }),
            fast_retry(),
        );

        let out = translator.translate("Hello", "en", "hi").await;
        assert!(out.degraded);
        assert!(out.rate_limited);
    }

    #[test]
    fn test_mask_entities() {
        let masked = mask_entities("Fee ₹50,000 for 2024-25, class at 10:30, 75% attendance");
        assert_eq!(
            masked.entities,
            vec!["₹50,000", "2024-25", "10:30", "75%"]
        );
        assert_eq!(
            masked.text,
            "Fee ⟦0⟧ for ⟦1⟧, class at ⟦2⟧, ⟦3⟧ attendance"
        );
    }

    #[test]
    fn test_restore_tolerates_spacing_and_drops() {
        let masked = mask_entities("Pay ₹500 by 15/08");
        assert_eq!(masked.restore("Bhugtan ⟦ 0 ⟧ karein"), "Bhugtan ₹500 karein (15/08)");
    }

    #[test]
    fn test_plain_text_has_no_entities() {
        let masked = mask_entities("Where is the library?");
        assert!(masked.entities.is_empty());
        assert_eq!(masked.restore("Pustakalay kahan hai?"), "Pustakalay kahan hai?");
    }
}
