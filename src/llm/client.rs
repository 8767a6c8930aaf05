use crate::error::{Result, VersabotError};
use crate::llm::types::*;
use log::debug;
use reqwest::Client;
use std::env;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A forecast request is abandoned after this long.
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(120);

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            timeout: DEFAULT_AI_TIMEOUT,
        }
    }

    /// Reads the key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| VersabotError::Config(format!("{} is not set", API_KEY_VAR)))?;
        Ok(Self::new(key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends one user prompt with a system instruction and returns the reply text.
    pub async fn generate_text(
        &self,
        model: &str,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let payload = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), prompt)],
            system_instruction: Some(Content::text(None, system_prompt.trim())),
            generation_config: GenerationConfig {
                response_mime_type: "text/plain".to_string(),
                temperature: None,
            },
        };

        debug!("Requesting {} ({} prompt chars)", model, prompt.len());
        let res = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| VersabotError::from_transport(e, self.timeout))?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res
                .text()
                .await
                .map_err(|e| VersabotError::from_transport(e, self.timeout))?;
            return Err(VersabotError::Upstream(format!(
                "Gemini API error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await.map_err(|e| {
            if e.is_decode() {
                VersabotError::Upstream("malformed model reply".to_string())
            } else {
                VersabotError::from_transport(e, self.timeout)
            }
        })?;

        body.first_text()
            .map(str::to_string)
            .ok_or_else(|| VersabotError::Upstream("Model returned no text".to_string()))
    }
}
