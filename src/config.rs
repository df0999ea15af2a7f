//! Configuration types for the service.
//!
//! Two structs, one per layer:
//!
//! * [`ParserConfig`]: every knob of the vision parser (model, sampling,
//!   token budget, image transfer, extraction detail). These used to be
//!   call-site constants; keeping them in one struct with documented defaults
//!   means a deployment can change models without touching code.
//! * [`ServerConfig`]: bind address, delivery mode and filesystem locations.
//!
//! Both are built via a builder, like the rest of the crate.

use crate::error::ParseError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the vision parser.
///
/// # Example
/// ```rust
/// use pdf2md_api::ParserConfig;
///
/// let config = ParserConfig::builder()
///     .model("gemini-1.5-pro")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ParserConfig {
    /// LLM provider name passed to `ProviderFactory` (e.g. "gemini", "openai").
    /// Default: "gemini".
    ///
    /// The provider reads its own credential (`GEMINI_API_KEY`,
    /// `OPENAI_API_KEY`, …) from the environment each time a document is
    /// parsed.
    pub provider_name: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Model identifier. Default: "gemini-1.5-flash".
    pub model: String,

    /// Sampling temperature. Range 0–2. Default: 0.9.
    pub temperature: f32,

    /// Nucleus-sampling threshold. Range 0–1. Default: 0.4.
    ///
    /// Paired with the high default temperature: the model may vary its
    /// phrasing of figure descriptions but only draws from the top 40 % of
    /// the probability mass, which keeps transcribed text literal.
    pub top_p: f32,

    /// Maximum tokens the model may generate per page. Default: 8192.
    pub max_output_tokens: usize,

    /// How the rendered page image travels in the request. Default: [`ImageMode::Url`].
    pub image_mode: ImageMode,

    /// Ask the model for tables, formulas and figure descriptions in addition
    /// to plain text. Default: true.
    pub detailed_extraction: bool,

    /// Longest edge of a rendered page in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Pages sent to the model at once. Output order is unaffected. Default: 4.
    pub concurrency: usize,

    /// Custom system prompt. If None, the built-in prompt for the selected
    /// extraction level is used.
    pub system_prompt: Option<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            provider_name: "gemini".to_string(),
            provider: None,
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.9,
            top_p: 0.4,
            max_output_tokens: 8192,
            image_mode: ImageMode::default(),
            detailed_extraction: true,
            max_rendered_pixels: 2000,
            concurrency: 4,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("image_mode", &self.image_mode)
            .field("detailed_extraction", &self.detailed_extraction)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl ParserConfig {
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ParserConfig`].
#[derive(Debug)]
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

impl ParserConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p;
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn image_mode(mut self, mode: ImageMode) -> Self {
        self.config.image_mode = mode;
        self
    }

    pub fn detailed_extraction(mut self, v: bool) -> Self {
        self.config.detailed_extraction = v;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating ranges.
    pub fn build(self) -> Result<ParserConfig, ParseError> {
        let c = &self.config;
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(ParseError::InvalidConfig(format!(
                "temperature must be 0–2, got {}",
                c.temperature
            )));
        }
        if !(0.0..=1.0).contains(&c.top_p) {
            return Err(ParseError::InvalidConfig(format!(
                "top_p must be 0–1, got {}",
                c.top_p
            )));
        }
        if c.max_output_tokens == 0 {
            return Err(ParseError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(ParseError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.model.trim().is_empty() {
            return Err(ParseError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// Configuration for the HTTP layer.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address. Default: `0.0.0.0:8000`.
    pub bind_addr: SocketAddr,

    /// How a successful conversion is returned. Default: [`OutputMode::Download`].
    pub output_mode: OutputMode,

    /// Directory for persisted markdown in [`OutputMode::Summary`]. Default: `output`.
    pub output_dir: PathBuf,

    /// Where request-scoped temporary files are created. Default: the OS temp dir.
    pub temp_dir: PathBuf,

    /// Maximum accepted request body in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            output_mode: OutputMode::default(),
            output_dir: PathBuf::from("output"),
            temp_dir: std::env::temp_dir(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.config.output_mode = mode;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n.max(1024);
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the rendered page image is attached to the VLM request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// As a `data:image/png;base64,…` URL. (default)
    #[default]
    Url,
    /// As raw base64 with a separate MIME type.
    Base64,
}

/// How `/parse` returns a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Stream the markdown back as a `text/markdown` attachment. (default)
    #[default]
    Download,
    /// Persist under the output directory and answer with a JSON summary.
    Summary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_defaults() {
        let c = ParserConfig::default();
        assert_eq!(c.provider_name, "gemini");
        assert_eq!(c.model, "gemini-1.5-flash");
        assert_eq!(c.temperature, 0.9);
        assert_eq!(c.top_p, 0.4);
        assert_eq!(c.max_output_tokens, 8192);
        assert_eq!(c.image_mode, ImageMode::Url);
        assert!(c.detailed_extraction);
    }

    #[test]
    fn builder_rejects_out_of_range_top_p() {
        let err = ParserConfig::builder().top_p(1.5).build().unwrap_err();
        assert!(err.to_string().contains("top_p"), "got: {err}");
    }

    #[test]
    fn builder_rejects_zero_tokens() {
        assert!(ParserConfig::builder().max_output_tokens(0).build().is_err());
    }

    #[test]
    fn builder_rejects_zero_concurrency() {
        assert!(ParserConfig::builder().concurrency(0).build().is_err());
    }

    #[test]
    fn builder_overrides() {
        let c = ParserConfig::builder()
            .provider_name("openai")
            .model("gpt-4.1-nano")
            .image_mode(ImageMode::Base64)
            .detailed_extraction(false)
            .build()
            .unwrap();
        assert_eq!(c.provider_name, "openai");
        assert_eq!(c.model, "gpt-4.1-nano");
        assert_eq!(c.image_mode, ImageMode::Base64);
        assert!(!c.detailed_extraction);
    }

    #[test]
    fn debug_shows_custom_prompt() {
        let c = ParserConfig::builder()
            .system_prompt("Transcribe tables only.")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("system_prompt"), "{dbg}");
        assert!(dbg.contains("Transcribe tables only."), "{dbg}");
    }

    #[test]
    fn server_defaults() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr.port(), 8000);
        assert_eq!(c.output_mode, OutputMode::Download);
        assert_eq!(c.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn modes_deserialize_lowercase() {
        let m: OutputMode = serde_json::from_str("\"summary\"").unwrap();
        assert_eq!(m, OutputMode::Summary);
        let i: ImageMode = serde_json::from_str("\"base64\"").unwrap();
        assert_eq!(i, ImageMode::Base64);
    }
}
