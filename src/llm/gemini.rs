//! Google Gemini API integration
//!
//! Single-turn `generateContent` calls: one user prompt in, the text of the
//! first candidate out.

use crate::llm::{async_trait, GenerationSettings, Generator, LlmError, LlmResponse, TokenUsage};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

// Constants for Gemini API
pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Request timeout for a single generation call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Gemini API request types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    // Missing entirely when the prompt was blocked
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Google Gemini API client implementation
pub struct GeminiBackend {
    api_key: String,
    client: reqwest::Client,
    model_name: String,
    base_url: String,
    settings: GenerationSettings,
}

impl GeminiBackend {
    /// Create a new Gemini client
    pub fn new(api_key: String, model_name: String) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, model_name, API_BASE_URL.to_string())
    }

    /// Create a client that talks to a different endpoint (proxies, tests)
    pub fn with_base_url(
        api_key: String,
        model_name: String,
        base_url: String,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            client,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings: GenerationSettings::default(),
        })
    }

    /// Override the sampling parameters
    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
                role: Some("user".to_string()),
            }],
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(self.settings.max_output_tokens),
                temperature: Some(self.settings.temperature),
                top_p: Some(self.settings.top_p),
            }),
        }
    }

    /// Send a prompt and return the full response including usage
    pub async fn send_prompt(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let api_url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model_name, self.api_key
        );

        let started = Instant::now();
        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(
            model = %self.model_name,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Gemini response received"
        );

        if !status.is_success() {
            return Err(LlmError::ApiError(describe_error(status.as_u16(), &body)));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)?;
        into_llm_response(gemini_response)
    }
}

/// Build a readable message from an error body, falling back to the raw text
fn describe_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<GeminiErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = if envelope.error.code == 0 {
                status
            } else {
                envelope.error.code
            };
            format!(
                "{} {}: {}",
                code, envelope.error.status, envelope.error.message
            )
        }
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}

fn into_llm_response(response: GeminiResponse) -> Result<LlmResponse, LlmError> {
    // Check for prompt feedback indicating a block
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        let error_msg = format!(
            "Gemini API request blocked. Reason: {}. No candidates generated.",
            reason
        );
        warn!("{}", error_msg);
        return Err(LlmError::ApiError(error_msg));
    }

    let Some(candidate) = response.candidates.first() else {
        let error_msg = "No candidates returned from Gemini API. This might be due to safety filters, recitation blocks, or an issue with the prompt.".to_string();
        warn!("{}", error_msg);
        return Err(LlmError::ApiError(error_msg));
    };

    let text: String = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(LlmError::ApiError(format!(
            "Gemini returned an empty candidate (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    let usage = response.usage_metadata.as_ref().map(|usage| TokenUsage {
        input_tokens: usage.prompt_token_count.unwrap_or(0) as usize,
        output_tokens: usage.candidates_token_count.unwrap_or(0) as usize,
    });

    Ok(LlmResponse {
        text,
        usage,
        stop_reason: candidate.finish_reason.clone(),
    })
}

#[async_trait]
impl Generator for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.send_prompt(prompt).await?;
        if let Some(usage) = &response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = response.stop_reason.as_deref().unwrap_or("unknown"),
                "Gemini token usage"
            );
        }
        Ok(response.text)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model_name
    }
}
