//! Local LLM completion client.
//!
//! Talks to an OpenAI-style `/v1/completions` endpoint (Ollama, llama.cpp,
//! vLLM). Transport failures never reach the caller: `complete` returns an
//! empty string and the pipeline degrades to heuristic-only behavior.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use shelfmark_core::LlmSettings;

use crate::json::extract_json_object;

/// Temperature increment per JSON retry attempt.
const RETRY_TEMPERATURE_STEP: f64 = 0.2;

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

/// Client for a local text-completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs_f64(settings.timeout_s))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One completion call. Empty string on any transport or decode failure.
    pub async fn complete(&self, prompt: &str, temperature: f64) -> String {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "temperature": temperature,
        });
        debug!(
            "Completion request: model={}, temperature={:.1}, prompt_chars={}",
            self.model,
            temperature,
            prompt.len()
        );
        let response = match self.client.post(&self.base_url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("Error obtaining completion: {}", e);
                return String::new();
            }
        };
        if !response.status().is_success() {
            error!("Completion endpoint returned status {}", response.status());
            return String::new();
        }
        match response.json::<CompletionResponse>().await {
            Ok(data) => data
                .choices
                .first()
                .map(|c| c.text.trim().to_string())
                .unwrap_or_default(),
            Err(e) => {
                error!("Error decoding completion response: {}", e);
                String::new()
            }
        }
    }

    /// Repeatedly complete until the response contains a recoverable JSON
    /// object, escalating temperature each attempt. Returns the last raw
    /// response when the retry budget is exhausted.
    pub async fn complete_json_with_retry(
        &self,
        prompt: &str,
        temperature: f64,
        max_retries: usize,
    ) -> String {
        let mut temp = temperature;
        let mut last = String::new();
        for attempt in 0..max_retries {
            last = self.complete(prompt, temp).await;
            if let Some(object) = extract_json_object(&last) {
                if serde_json::from_str::<serde_json::Value>(object).is_ok() {
                    return last;
                }
            }
            temp += RETRY_TEMPERATURE_STEP;
            info!("Retry {}: new temperature={:.1}", attempt + 1, temp);
        }
        last
    }
}
