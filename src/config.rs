//! Configuration types for PDF-to-bilingual-document conversion.
//!
//! Two layers of configuration exist because they come from two places:
//!
//! * [`AppConfig`] is loaded once at process start from a JSON file. It holds
//!   everything an operator sets up once per machine: the translation endpoint
//!   and credential, rasterisation DPI, OCR language, and where the rasteriser
//!   backend lives. A missing or malformed file is fatal.
//!
//! * [`RunOptions`] holds the per-run choices the presentation layer collects
//!   (target language, image width class, enhancement flags). It is built via
//!   [`RunOptionsBuilder`] so callers set only what they care about.
//!
//! # Example file
//!
//! ```json
//! {
//!   "api_config": { "endpoint": "https://api.example.com/v1/chat/completions", "key": "sk-..." },
//!   "ocr_settings": { "dpi": 200 },
//!   "poppler_config": { "path": "/opt/pdfium/lib" }
//! }
//! ```

use crate::error::Pdf2DocxError;
use crate::pipeline::enhance::DEFAULT_ENHANCE_FACTOR;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// ── File configuration ───────────────────────────────────────────────────

/// Process-wide configuration, loaded from `config.json`.
#[derive(Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Translation service settings.
    pub api_config: ApiConfig,

    /// Rasterisation and OCR settings.
    pub ocr_settings: OcrSettings,

    /// Rasteriser backend location.
    #[serde(alias = "rasterizer")]
    pub poppler_config: RasterizerConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("endpoint", &self.api_config.endpoint)
            .field("key", &"<redacted>")
            .field("model", &self.api_config.model)
            .field("ocr_settings", &self.ocr_settings)
            .field("poppler_config", &self.poppler_config)
            .finish()
    }
}

/// Translation endpoint, credential and request tuning.
#[derive(Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Chat-completions URL receiving the streaming POST.
    pub endpoint: String,

    /// Bearer credential.
    pub key: String,

    /// Model identifier sent in every request body.
    #[serde(default = "default_model")]
    pub model: String,

    /// Idle timeout in seconds: the longest wait for the response head or for
    /// the next piece of the streamed body. Default: 60.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per chunk when requests time out. Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Self-imposed request budget. Default: 30 (one call every 2 s).
    #[serde(default = "default_calls_per_minute")]
    pub calls_per_minute: u32,

    /// Cool-down before each chunk request, in milliseconds. Default: 500.
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Maximum characters of source text per translation chunk. Default: 1000.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f32,
}

impl ApiConfig {
    /// Build an `ApiConfig` with every tuning knob at its default.
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            calls_per_minute: default_calls_per_minute(),
            chunk_delay_ms: default_chunk_delay_ms(),
            max_chunk_chars: default_max_chunk_chars(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            frequency_penalty: default_frequency_penalty(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

fn default_model() -> String {
    "deepseek-ai/DeepSeek-V3".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}
fn default_calls_per_minute() -> u32 {
    30
}
fn default_chunk_delay_ms() -> u64 {
    500
}
fn default_max_chunk_chars() -> usize {
    1000
}
fn default_max_tokens() -> u32 {
    512
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.7
}
fn default_top_k() -> u32 {
    50
}
fn default_frequency_penalty() -> f32 {
    0.5
}

/// Rasterisation resolution and OCR engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OcrSettings {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600.
    pub dpi: u32,

    /// Tesseract language code. Default: `eng`.
    #[serde(default = "default_ocr_language")]
    pub language: String,

    /// Explicit path to the `tesseract` executable. Default: looked up on `PATH`.
    #[serde(default)]
    pub engine_path: Option<PathBuf>,
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

/// Where the rasteriser backend lives.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RasterizerConfig {
    /// Directory containing the pdfium shared library. `None` binds the
    /// system library.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Load and validate the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Pdf2DocxError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Pdf2DocxError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig =
            serde_json::from_str(&raw).map_err(|e| Pdf2DocxError::ConfigParse {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), Pdf2DocxError> {
        let api = &self.api_config;
        if api.endpoint.trim().is_empty() {
            return Err(Pdf2DocxError::InvalidConfig(
                "api_config.endpoint must not be empty".into(),
            ));
        }
        if api.key.trim().is_empty() {
            return Err(Pdf2DocxError::InvalidConfig(
                "api_config.key must not be empty".into(),
            ));
        }
        if api.max_attempts == 0 {
            return Err(Pdf2DocxError::InvalidConfig(
                "api_config.max_attempts must be ≥ 1".into(),
            ));
        }
        if api.max_chunk_chars == 0 {
            return Err(Pdf2DocxError::InvalidConfig(
                "api_config.max_chunk_chars must be ≥ 1".into(),
            ));
        }
        let dpi = self.ocr_settings.dpi;
        if !(72..=600).contains(&dpi) {
            return Err(Pdf2DocxError::InvalidConfig(format!(
                "ocr_settings.dpi must be 72–600, got {dpi}"
            )));
        }
        Ok(())
    }
}

// ── Per-run options ──────────────────────────────────────────────────────

/// Options the operator picks for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Language the recognised text is translated into. Default: Chinese.
    pub target_language: TargetLanguage,

    /// Width class of page images in the output document. Default: medium.
    pub image_size: ImageSize,

    /// Sharpen every page before OCR. Default: false.
    pub enhance: bool,

    /// Keep the scratch directory (and unenhanced originals) after the run.
    /// Default: false.
    pub keep_intermediates: bool,

    /// Sharpness factor; 1.0 leaves the image unchanged. Default: 1.5.
    pub enhance_factor: f32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            target_language: TargetLanguage::default(),
            image_size: ImageSize::default(),
            enhance: false,
            keep_intermediates: false,
            enhance_factor: DEFAULT_ENHANCE_FACTOR,
        }
    }
}

impl RunOptions {
    /// Create a new builder for `RunOptions`.
    pub fn builder() -> RunOptionsBuilder {
        RunOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`RunOptions`].
#[derive(Debug)]
pub struct RunOptionsBuilder {
    options: RunOptions,
}

impl RunOptionsBuilder {
    pub fn target_language(mut self, lang: TargetLanguage) -> Self {
        self.options.target_language = lang;
        self
    }

    pub fn image_size(mut self, size: ImageSize) -> Self {
        self.options.image_size = size;
        self
    }

    pub fn enhance(mut self, v: bool) -> Self {
        self.options.enhance = v;
        self
    }

    pub fn keep_intermediates(mut self, v: bool) -> Self {
        self.options.keep_intermediates = v;
        self
    }

    pub fn enhance_factor(mut self, factor: f32) -> Self {
        self.options.enhance_factor = factor;
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<RunOptions, Pdf2DocxError> {
        let f = self.options.enhance_factor;
        if !f.is_finite() || f <= 0.0 {
            return Err(Pdf2DocxError::InvalidConfig(format!(
                "Enhancement factor must be a positive number, got {f}"
            )));
        }
        Ok(self.options)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Translation target offered to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetLanguage {
    /// English (`en`).
    English,
    /// Chinese (`ch`). (default)
    #[default]
    Chinese,
    /// Spanish (`es`).
    Spanish,
    /// French (`fr`).
    French,
}

impl TargetLanguage {
    /// Short code used on the command line.
    pub fn code(self) -> &'static str {
        match self {
            TargetLanguage::English => "en",
            TargetLanguage::Chinese => "ch",
            TargetLanguage::Spanish => "es",
            TargetLanguage::French => "fr",
        }
    }

    /// Language name embedded in the translation instruction.
    pub fn prompt_name(self) -> &'static str {
        match self {
            TargetLanguage::English => "英文",
            TargetLanguage::Chinese => "中文",
            TargetLanguage::Spanish => "西班牙文",
            TargetLanguage::French => "法文",
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TargetLanguage {
    type Err = Pdf2DocxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(TargetLanguage::English),
            "ch" | "zh" => Ok(TargetLanguage::Chinese),
            "es" => Ok(TargetLanguage::Spanish),
            "fr" => Ok(TargetLanguage::French),
            other => Err(Pdf2DocxError::InvalidConfig(format!(
                "Unsupported target language '{other}' (expected en, ch, es or fr)"
            ))),
        }
    }
}

/// Width preset for page images in the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    /// 4 inches wide.
    Small,
    /// 6 inches wide. (default)
    #[default]
    Medium,
    /// 8 inches wide.
    Large,
}

impl ImageSize {
    pub fn width_inches(self) -> f32 {
        match self {
            ImageSize::Small => 4.0,
            ImageSize::Medium => 6.0,
            ImageSize::Large => 8.0,
        }
    }
}

impl FromStr for ImageSize {
    type Err = Pdf2DocxError;

    /// Accepts the preset name or its radio-button number (`1`, `2`, `3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "small" => Ok(ImageSize::Small),
            "2" | "medium" => Ok(ImageSize::Medium),
            "3" | "large" => Ok(ImageSize::Large),
            other => Err(Pdf2DocxError::InvalidConfig(format!(
                "Unknown image size '{other}' (expected small, medium or large)"
            ))),
        }
    }
}
