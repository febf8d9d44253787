//! Translation provider contract.
//!
//! A translation provider performs single-pair translation. The default
//! implementation prompts a generation model; any dedicated translation
//! service can implement [`TranslationProvider`] instead.

use std::sync::Arc;

use campus_core::languages::{display_name, provider_code};
use campus_core::AppResult;

use crate::client::{LlmClient, LlmRequest};

/// Single-pair text translation.
#[async_trait::async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Get the provider name.
    fn provider_name(&self) -> &str;

    /// Translate `text` from `from` to `to` (language codes).
    async fn translate(&self, text: &str, from: &str, to: &str) -> AppResult<String>;
}

const TRANSLATION_SYSTEM_PROMPT: &str = "You are a translation engine for a university help desk. \
Translate the user's text exactly as instructed. Keep every token of the form ⟦n⟧ unchanged. \
Reply with the translation only, without quotes or commentary.";

/// Translation backed by a generation model.
pub struct LlmTranslationProvider {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmTranslationProvider {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn build_request(&self, text: &str, from: &str, to: &str) -> LlmRequest {
        let from_name = display_name(provider_code(from));
        let to_name = display_name(provider_code(to));
        let prompt = format!(
            "Translate from {} to {}:\n\n{}",
            from_name, to_name, text
        );

        LlmRequest::new(prompt, self.model.clone())
            .with_system(TRANSLATION_SYSTEM_PROMPT)
            .with_temperature(0.0)
    }
}

#[async_trait::async_trait]
impl TranslationProvider for LlmTranslationProvider {
    fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> AppResult<String> {
        let request = self.build_request(text, from, to);
        let response = self.client.complete(&request).await?;
        Ok(response.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmResponse;
    use std::sync::Mutex;

    struct RecordingClient {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            Ok(LlmResponse::text("  hostel ki suvidha  \n", &request.model))
        }
    }

    #[tokio::test]
    async fn test_translation_prompt_and_trim() {
        let client = Arc::new(RecordingClient {
            prompts: Mutex::new(Vec::new()),
        });
        let provider = LlmTranslationProvider::new(client.clone(), "llama3.2");

        let out = provider
            .translate("hostel facility", "en", "raj")
            .await
            .unwrap();

        assert_eq!(out, "hostel ki suvidha");
        let prompts = client.prompts.lock().unwrap();
        // Rajasthani is routed through Hindi
        assert!(prompts[0].starts_with("Translate from English to Hindi"));
    }
}
