//! Configuration for the analysis client and batch runner.
//!
//! All analysis behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. The endpoint and credential are always
//! supplied from outside (builder call, environment, CLI flag); nothing is
//! compiled in except the public default endpoint URL.

use crate::error::MedScanError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default OpenAI-compatible chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.x.ai/v1/chat/completions";

/// Default vision model identifier.
pub const DEFAULT_MODEL: &str = "grok-vision-beta";

/// Largest raw image accepted by the client (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Largest base64 payload accepted by the client (20 MiB).
pub const DEFAULT_MAX_ENCODED_BYTES: usize = 20 * 1024 * 1024;

/// Environment variable holding the bearer credential.
pub const ENV_API_KEY: &str = "MEDSCAN_API_KEY";
/// Environment variable overriding [`DEFAULT_ENDPOINT`].
pub const ENV_API_URL: &str = "MEDSCAN_API_URL";
/// Environment variable overriding [`DEFAULT_MODEL`].
pub const ENV_MODEL: &str = "MEDSCAN_MODEL";

/// Configuration for analysing report images.
///
/// # Example
/// ```rust
/// use medscan_report::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .api_key("xai-test")
///     .model("grok-vision-beta")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 2500);
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Chat-completions endpoint URL.
    pub endpoint: String,

    /// Bearer credential. Never printed by `Debug`.
    pub api_key: String,

    /// Model identifier sent with every request. Default: `grok-vision-beta`.
    pub model: String,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Report reading should be faithful to what is on the page; a low
    /// temperature keeps the model from embellishing values.
    pub temperature: f32,

    /// Maximum tokens the model may generate per image. Default: 2500.
    pub max_tokens: usize,

    /// Raw image size limit in bytes. Default: 10 MiB.
    pub max_image_bytes: usize,

    /// Base64 payload size limit in bytes. Default: 20 MiB.
    pub max_encoded_bytes: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Custom user instruction. If None, uses [`crate::prompts::USER_INSTRUCTION`].
    pub user_instruction: Option<String>,

    /// Per-request timeout in seconds. Default: None (transport default).
    pub request_timeout_secs: Option<u64>,

    /// Receives per-image events from [`crate::batch::analyze_batch`].
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 2500,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_encoded_bytes: DEFAULT_MAX_ENCODED_BYTES,
            system_prompt: None,
            user_instruction: None,
            request_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("AnalyzerConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &key)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("max_encoded_bytes", &self.max_encoded_bytes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    /// Start a builder seeded from `MEDSCAN_API_KEY`, `MEDSCAN_API_URL` and
    /// `MEDSCAN_MODEL`. Unset or empty variables keep their defaults.
    pub fn from_env() -> Self {
        let mut builder = AnalyzerConfig::builder();
        if let Some(key) = non_empty_env(ENV_API_KEY) {
            builder = builder.api_key(key);
        }
        if let Some(url) = non_empty_env(ENV_API_URL) {
            builder = builder.endpoint(url);
        }
        if let Some(model) = non_empty_env(ENV_MODEL) {
            builder = builder.model(model);
        }
        builder
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn max_image_bytes(mut self, n: usize) -> Self {
        self.config.max_image_bytes = n;
        self
    }

    pub fn max_encoded_bytes(mut self, n: usize) -> Self {
        self.config.max_encoded_bytes = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn user_instruction(mut self, text: impl Into<String>) -> Self {
        self.config.user_instruction = Some(text.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, MedScanError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(MedScanError::InvalidConfig(format!(
                "API key is not set. Provide it with --api-key or {ENV_API_KEY}."
            )));
        }
        if !c.endpoint.starts_with("http://") && !c.endpoint.starts_with("https://") {
            return Err(MedScanError::InvalidConfig(format!(
                "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.model.trim().is_empty() {
            return Err(MedScanError::InvalidConfig("Model must not be empty".into()));
        }
        if c.max_image_bytes == 0 || c.max_encoded_bytes == 0 {
            return Err(MedScanError::InvalidConfig(
                "Size limits must be greater than zero".into(),
            ));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(MedScanError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
