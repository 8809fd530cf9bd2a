//! Client for the hosted generative-AI endpoint (Google Gemini `generateContent`).

use crate::ai::error::{AiError, Result};
use crate::config::AiConfig;
use log::debug;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub text: String,
}

/// A request to the model: an optional system instruction plus conversation turns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prompt {
    pub system: Option<String>,
    pub messages: Vec<PromptMessage>,
}

impl Prompt {
    /// Single-turn prompt
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            system: None,
            messages: vec![PromptMessage {
                role: PromptRole::User,
                text: text.into(),
            }],
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn push(&mut self, role: PromptRole, text: impl Into<String>) {
        self.messages.push(PromptMessage {
            role,
            text: text.into(),
        });
    }

    /// Text of the last user turn
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == PromptRole::User)
            .map(|m| m.text.as_str())
    }
}

/// Anything that can turn a prompt into model text
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Name of the model, for logging
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
    max_output_tokens: u32,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: &AiConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn build_request<'a>(&self, prompt: &'a Prompt) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            system_instruction: prompt.system.as_deref().map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            contents: prompt
                .messages
                .iter()
                .map(|message| Content {
                    role: Some(match message.role {
                        PromptRole::User => "user",
                        PromptRole::Model => "model",
                    }),
                    parts: vec![Part {
                        text: &message.text,
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let api_key = self.api_key.as_ref().ok_or(AiError::NotConfigured)?;
        debug!("Calling {} with {} message(s)", self.model, prompt.messages.len());

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        extract_text(body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn extract_text(body: GenerateContentResponse) -> Result<String> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(&AiConfig::default(), Some("key".to_string())).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let mut prompt = Prompt::user("What is ATP?").with_system("Be brief");
        prompt.push(PromptRole::Model, "Energy currency.");
        prompt.push(PromptRole::User, "Where is it made?");

        let body = serde_json::to_value(client().build_request(&prompt)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "Where is it made?");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(prompt.last_user_text(), Some("Where is it made?"));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}], "role": "model"}}]
        }))
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "Hello world");
    }

    #[test]
    fn test_blocked_response_is_empty() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(matches!(extract_text(body), Err(AiError::EmptyResponse)));

        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(extract_text(body), Err(AiError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = GeminiClient::new(&AiConfig::default(), None).unwrap();
        assert!(!client.is_configured());
        let err = client.generate(&Prompt::user("hi")).await.unwrap_err();
        assert!(matches!(err, AiError::NotConfigured));
    }
}
