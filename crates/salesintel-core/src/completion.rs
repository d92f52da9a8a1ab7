//! Generative completion client.
//!
//! [`CompletionClient`] is the seam every agent calls through. [`GeminiClient`] implements
//! it against the Gemini `generateContent` endpoint in JSON mode, passing the agent's schema
//! as `responseSchema`. The client holds no per-call state and can be shared across tasks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::CompletionError;
use crate::schema::SchemaDescriptor;
use crate::security::{SecretValue, redact};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER: &str = "Gemini";

/// Unvalidated model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub text: String,
    pub model: Option<String>,
}

impl RawResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<RawResponse, CompletionError>;
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretValue,
    temperature: f32,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, api_key: SecretValue) -> Result<Self, CompletionError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| CompletionError::Transport {
                message: format!("failed to build HTTP client: {err}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config
                .model
                .trim()
                .trim_start_matches("models/")
                .to_string(),
            api_key,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request_body(&self, prompt: &str, schema: &SchemaDescriptor) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "responseMimeType": "application/json",
                "responseSchema": schema.to_response_schema(),
            },
        })
    }

    /// Pull the candidate text out of a `generateContent` envelope.
    fn parse_response(body: &Value) -> Result<RawResponse, CompletionError> {
        let candidates = body["candidates"].as_array();
        let Some(candidate) = candidates.and_then(|items| items.first()) else {
            let message = match body["promptFeedback"]["blockReason"].as_str() {
                Some(reason) => format!("prompt blocked: {reason}"),
                None => "response contains no candidates".to_string(),
            };
            return Err(CompletionError::MalformedEnvelope { message });
        };

        let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
            let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
            CompletionError::MalformedEnvelope {
                message: format!("candidate has no content parts (finish reason: {reason})"),
            }
        })?;

        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();

        Ok(RawResponse {
            text,
            model: body["modelVersion"].as_str().map(str::to_string),
        })
    }

    fn map_http_error(
        status: StatusCode,
        retry_after_secs: Option<u64>,
        body_text: &str,
    ) -> CompletionError {
        match status.as_u16() {
            401 | 403 => CompletionError::AuthFailed {
                provider: PROVIDER.to_string(),
            },
            429 => CompletionError::RateLimited { retry_after_secs },
            code => CompletionError::Api {
                status: code,
                message: redact(body_text.trim()),
            },
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            CompletionError::Transport {
                message: redact(&err.to_string()),
            }
        }
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<RawResponse, CompletionError> {
        let body = self.build_request_body(prompt, schema);

        debug!(
            model = self.model.as_str(),
            schema = schema.name,
            prompt_chars = prompt.len(),
            "sending Gemini completion request"
        );

        let response = self
            .client
            .post(self.endpoint_url())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body_text = response
            .text()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, retry_after_secs, &body_text));
        }

        let envelope: Value =
            serde_json::from_str(&body_text).map_err(|err| CompletionError::MalformedEnvelope {
                message: format!("invalid JSON envelope: {err}"),
            })?;

        let raw = Self::parse_response(&envelope)?;
        debug!(
            response_chars = raw.text.len(),
            model_version = raw.model.as_deref().unwrap_or("unknown"),
            "received Gemini completion"
        );
        Ok(raw)
    }
}
