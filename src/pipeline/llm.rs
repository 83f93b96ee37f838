//! VLM interaction: build the chat-completions request and call the endpoint.
//!
//! [`ReportAnalyzer`] is the seam between orchestration and the network.
//! [`VisionClient`] is the HTTP implementation; tests and callers with their
//! own transport can plug in anything else that turns an image into text.
//!
//! One call to [`ReportAnalyzer::analyze`] sends at most one request and
//! never retries. Callers that need resilience wrap it themselves.

use crate::config::AnalyzerConfig;
use crate::error::MedScanError;
use crate::pipeline::encode::{encode_image, EncodedImage};
use crate::pipeline::input::ReportImage;
use crate::prompts::{SYSTEM_PROMPT, USER_INSTRUCTION};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Turns one report image into the model's free-text analysis.
pub trait ReportAnalyzer: Send + Sync {
    /// Analyse `image`, returning the raw response text.
    fn analyze<'a>(&'a self, image: &'a ReportImage) -> BoxFuture<'a, Result<String, MedScanError>>;
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    config: AnalyzerConfig,
}

impl VisionClient {
    /// Create a client. The config should come from
    /// [`crate::config::AnalyzerConfigBuilder::build`]; an empty API key is
    /// rejected here as well.
    pub fn new(config: AnalyzerConfig) -> Result<Self, MedScanError> {
        if config.api_key.trim().is_empty() {
            return Err(MedScanError::InvalidConfig("API key is not set".into()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| MedScanError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    async fn analyze_image(&self, image: &ReportImage) -> Result<String, MedScanError> {
        let encoded = encode_image(
            image,
            self.config.max_image_bytes,
            self.config.max_encoded_bytes,
        )?;
        let body = build_request(&self.config, &encoded);

        info!(
            "Sending {} to {} ({})",
            image.file_name, self.config.endpoint, self.config.model
        );
        let start = Instant::now();

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MedScanError::Unknown(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(
                "{}: API rejected request with {}: {}",
                image.file_name,
                status,
                truncate(&error_text, 300)
            );
            return Err(MedScanError::remote_rejected(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MedScanError::Unknown(e.to_string()))?;
        let text = extract_content(&bytes)?;

        debug!(
            "{}: {} chars in {:?}",
            image.file_name,
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }
}

impl ReportAnalyzer for VisionClient {
    fn analyze<'a>(&'a self, image: &'a ReportImage) -> BoxFuture<'a, Result<String, MedScanError>> {
        Box::pin(self.analyze_image(image))
    }
}

// ── Request body ─────────────────────────────────────────────────────────

/// JSON body of a chat-completions request.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: Vec<ChatMessage<'a>>,
    pub model: &'a str,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: usize,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart<'a> {
    ImageUrl { image_url: ImageUrl },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Build the request: system prompt, then one user turn carrying the image
/// and the instruction text.
pub fn build_request<'a>(config: &'a AnalyzerConfig, image: &EncodedImage) -> ChatRequest<'a> {
    let system_prompt = config.system_prompt.as_deref().unwrap_or(SYSTEM_PROMPT);
    let instruction = config
        .user_instruction
        .as_deref()
        .unwrap_or(USER_INSTRUCTION);

    ChatRequest {
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(system_prompt),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    },
                    ContentPart::Text { text: instruction },
                ]),
            },
        ],
        model: &config.model,
        stream: false,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

// ── Response body ────────────────────────────────────────────────────────

/// Pull `choices[0].message.content` out of a success body.
pub fn extract_content(body: &[u8]) -> Result<String, MedScanError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| MedScanError::MalformedResponse {
            detail: format!("body is not JSON: {e}"),
        })?;

    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| MedScanError::MalformedResponse {
            detail: "missing choices[0].message.content".to_string(),
        })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}\u{2026}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn encoded() -> EncodedImage {
        EncodedImage {
            media_type: "image/jpeg".into(),
            base64: "QUJD".into(),
        }
    }

    #[test]
    fn request_body_shape() {
        let config = AnalyzerConfig::default();
        let body = serde_json::to_value(build_request(&config, &encoded())).unwrap();

        assert_eq!(body["model"], "grok-vision-beta");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 2500);
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);

        let parts = &body["messages"][1]["content"];
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(parts[0]["type"], "image_url");
        assert_eq!(parts[0]["image_url"]["url"], "data:image/jpeg;base64,QUJD");
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(parts[1]["text"], USER_INSTRUCTION);
    }

    #[test]
    fn prompt_overrides_are_used() {
        let mut config = AnalyzerConfig::default();
        config.system_prompt = Some("sys".into());
        config.user_instruction = Some("look".into());
        let body = serde_json::to_value(build_request(&config, &encoded())).unwrap();
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["content"][1]["text"], "look");
    }

    #[test]
    fn extract_content_success() {
        let body = br###"{"choices":[{"message":{"role":"assistant","content":"## Key Findings"}}]}"###;
        assert_eq!(extract_content(body).unwrap(), "## Key Findings");
    }

    #[test]
    fn extract_content_missing_choices() {
        let err = extract_content(br#"{"error":"nope"}"#).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::MalformedResponse);
        assert_eq!(err.to_string(), "Invalid response format from API");
    }

    #[test]
    fn extract_content_empty_choices_and_bad_json() {
        assert!(extract_content(br#"{"choices":[]}"#).is_err());
        assert!(extract_content(br#"{"choices":[{"message":{}}]}"#).is_err());
        assert!(extract_content(b"<html>").is_err());
    }

    #[test]
    fn client_requires_key() {
        let err = VisionClient::new(AnalyzerConfig::default()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("héllo", 2), "hé\u{2026}");
        assert_eq!(truncate("ok", 5), "ok");
    }
}
