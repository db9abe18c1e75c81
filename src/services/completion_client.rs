use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    error::{PlannerError, Result},
    services::prompt::SYSTEM_PROMPT,
};

pub const DEFAULT_COMPLETION_URL: &str = "https://api.a0.dev/ai/llm";
pub const DEFAULT_CHAT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Anything that can turn a prompt into completion text.
#[async_trait]
pub trait CompletionEndpoint: Send + Sync + std::fmt::Debug {
    async fn send_completion(&self, prompt: &str) -> Result<String>;
}

/// Wire format spoken by the completion endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `POST {messages}` answered with `{"completion": "..."}`
    Simple,
    /// OpenAI-compatible `POST /chat/completions`
    ChatCompletions { model: String },
}

#[derive(Clone, Debug)]
pub struct HttpCompletionClient {
    url: String,
    api_key: Option<String>,
    flavor: ApiFlavor,
    system_prompt: String,
    max_tokens: Option<u32>,
    max_retries: usize,
    timeout: Duration,
}

impl Default for HttpCompletionClient {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETION_URL)
    }
}

impl HttpCompletionClient {
    /// Client for the simple `{messages} -> {completion}` API
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            flavor: ApiFlavor::Simple,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_tokens: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Client for an OpenAI-compatible chat completions API rooted at `base_url`
    pub fn chat(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            flavor: ApiFlavor::ChatCompletions {
                model: model.into(),
            },
            max_tokens: Some(4000),
            ..Self::new(base_url)
        }
    }

    /// Build a client from `TRIPAI_MODEL`, `OPENAI_API_KEY`, `OPENAI_BASE_URL` /
    /// `OPENROUTER_BASE_URL` and `TRIPAI_COMPLETION_URL`.
    ///
    /// A configured model selects the chat completions flavor, which then requires an API key.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok();

        if let Ok(model) = std::env::var("TRIPAI_MODEL") {
            let api_key = api_key.ok_or_else(|| {
                PlannerError::Config(
                    "OPENAI_API_KEY must be set when TRIPAI_MODEL selects a chat completions model"
                        .to_string(),
                )
            })?;
            let base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("OPENROUTER_BASE_URL"))
                .unwrap_or_else(|_| DEFAULT_CHAT_BASE_URL.to_string());
            return Ok(Self::chat(base_url, model).with_api_key(api_key));
        }

        let url = std::env::var("TRIPAI_COMPLETION_URL")
            .unwrap_or_else(|_| DEFAULT_COMPLETION_URL.to_string());
        let mut client = Self::new(url);
        client.api_key = api_key;
        Ok(client)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn flavor(&self) -> &ApiFlavor {
        &self.flavor
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn request_url(&self) -> String {
        match self.flavor {
            ApiFlavor::Simple => self.url.clone(),
            ApiFlavor::ChatCompletions { .. } => build_chat_url(&self.url),
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        let messages = vec![
            json!({ "role": "system", "content": self.system_prompt }),
            json!({ "role": "user", "content": prompt }),
        ];

        match &self.flavor {
            ApiFlavor::Simple => json!({ "messages": messages }),
            ApiFlavor::ChatCompletions { model } => {
                let mut body = json!({
                    "model": model,
                    "messages": messages,
                });
                if let Some(max_tokens) = self.max_tokens {
                    body["max_tokens"] = json!(max_tokens);
                }
                body
            }
        }
    }

    async fn post_with_retries(&self, body: &Value) -> Result<Value> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| PlannerError::Unknown(format!("Failed to build HTTP client: {err}")))?;

        let request_url = self.request_url();
        let mut attempt = 0;
        let mut backoff = Duration::from_millis(250);

        loop {
            let mut request = client
                .post(&request_url)
                .header("Content-Type", "application/json")
                .json(body);
            if let Some(api_key) = &self.api_key {
                request = request.header("Authorization", format!("Bearer {}", api_key));
            }

            let response = request.send().await.map_err(|err| {
                if err.is_timeout() {
                    PlannerError::Timeout(format!("completion request timed out: {err}"))
                } else {
                    PlannerError::Completion(format!("HTTP request failed: {err}"))
                }
            })?;

            let status = response.status();
            let headers = response.headers().clone();
            let response_text = response
                .text()
                .await
                .map_err(|err| PlannerError::Completion(format!("Failed to read response: {err}")))?;

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_duration = headers
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(backoff);

                if attempt < self.max_retries {
                    warn!(target: "tripai::completion", attempt, "rate limited, retrying");
                    tokio::time::sleep(retry_after_duration).await;
                    attempt += 1;
                    backoff *= 2;
                    continue;
                }

                return Err(PlannerError::RateLimit {
                    retry_after: retry_after_duration.as_secs().max(1),
                });
            }

            if status.is_server_error() && attempt < self.max_retries {
                warn!(target: "tripai::completion", attempt, %status, "server error, retrying");
                tokio::time::sleep(backoff).await;
                attempt += 1;
                backoff *= 2;
                continue;
            }

            if !status.is_success() {
                let api_message = serde_json::from_str::<Value>(&response_text)
                    .ok()
                    .and_then(|value| {
                        value
                            .get("error")
                            .and_then(|error| error.get("message"))
                            .and_then(|message| message.as_str())
                            .map(|s| s.to_string())
                    })
                    .unwrap_or(response_text);

                return Err(PlannerError::Completion(format!(
                    "AI API error: {} {}",
                    status, api_message
                )));
            }

            let response_json: Value = serde_json::from_str(&response_text).map_err(|err| {
                PlannerError::Completion(format!("Failed to parse response JSON: {err}"))
            })?;

            if let Some(error) = response_json.get("error").filter(|error| !error.is_null()) {
                let error_message = error
                    .get("message")
                    .and_then(|value| value.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| error.to_string());
                return Err(PlannerError::Completion(format!("API error: {}", error_message)));
            }

            return Ok(response_json);
        }
    }
}

#[async_trait]
impl CompletionEndpoint for HttpCompletionClient {
    async fn send_completion(&self, prompt: &str) -> Result<String> {
        let body = self.request_body(prompt);
        let response = self.post_with_retries(&body).await?;

        let content = match self.flavor {
            ApiFlavor::Simple => response.get("completion").and_then(Value::as_str),
            ApiFlavor::ChatCompletions { .. } => response
                .get("choices")
                .and_then(|choices| choices.get(0))
                .and_then(|choice| choice.get("message"))
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str),
        };

        match content {
            Some(text) if !text.trim().is_empty() => {
                debug!(target: "tripai::completion", chars = text.len(), "completion received");
                Ok(text.to_string())
            }
            _ => Err(PlannerError::Completion(
                "Failed to generate itinerary: response contained no completion".to_string(),
            )),
        }
    }
}

fn build_chat_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}
