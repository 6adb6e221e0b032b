//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use rivalwatch_core::AppConfig;
use rivalwatch_scraper::RequestGate;
use serde::Deserialize;
use serde_json::json;

use crate::error::AnalystError;

/// Characters of an error body kept in [`AnalystError::Api`].
const ERROR_BODY_EXCERPT: usize = 300;

#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    /// `None` when no API key is configured.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        config.openai_api_key.as_ref().map(|api_key| Self {
            api_key: api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.llm_model.clone(),
            timeout_secs: config.llm_timeout_secs,
        })
    }
}

/// One chat turn: a system instruction plus a user prompt.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider to return a single JSON object.
    pub json_object: bool,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Chat-completions client. Clones share the HTTP pool and the request gate.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    gate: RequestGate,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns [`AnalystError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig, gate: RequestGate) -> Result<Self, AnalystError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .build()
            .map_err(AnalystError::Client)?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            gate,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat turn and return the assistant message text.
    ///
    /// # Errors
    ///
    /// - [`AnalystError::Timeout`] / [`AnalystError::Http`]: transport failure.
    /// - [`AnalystError::Api`]: non-2xx response, with a body excerpt.
    /// - [`AnalystError::MalformedEnvelope`]: body is not a chat completion.
    /// - [`AnalystError::EmptyContent`]: no choices or blank content.
    pub async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, AnalystError> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_object {
            body["response_format"] = json!({ "type": "json_object" });
        }

        self.gate.wait_if_needed().await;
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AnalystError::from_transport)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(AnalystError::from_transport)?;

        if !status.is_success() {
            return Err(AnalystError::Api {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_EXCERPT).collect(),
            });
        }

        let completion: ChatCompletion = serde_json::from_str(&text)
            .map_err(|e| AnalystError::MalformedEnvelope(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(AnalystError::EmptyContent)?;

        tracing::debug!(
            model = %self.model,
            content_chars = content.len(),
            "chat completion received"
        );
        Ok(content)
    }
}

/// Strip a surrounding Markdown code fence, if any.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
