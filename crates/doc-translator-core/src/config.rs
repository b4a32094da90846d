use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::chunking::ChunkSizePolicy;
use crate::pipeline::Backoff;

/// Language codes following ISO 639-1 with regional variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// English name of the language for prompts.
    ///
    /// Unknown codes are passed through verbatim; the model understands most
    /// ISO codes and free-form names alike.
    pub fn display_name(&self) -> &str {
        language_name(self.as_str()).unwrap_or(self.as_str())
    }
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Translator backend configuration for the Gemini generative language API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Whole-request timeout; documents can take minutes to stream back
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl TranslatorConfig {
    /// Create a new translator config
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

const fn default_timeout_secs() -> u64 {
    300
}

const fn default_temperature() -> f32 {
    0.2
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, None, DEFAULT_MODEL)
    }
}

/// Chunked pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Total attempts per chunk (not additional retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before re-attempting a failed chunk
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Retry delay progression
    #[serde(default)]
    pub backoff: BackoffKind,

    /// Pacing delay between consecutive chunks
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Force a chunk size in pages instead of the size/page-count tiers
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Upload size ceiling in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

/// Retry delay progression as written in config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    5000
}

const fn default_chunk_delay_ms() -> u64 {
    2000
}

const fn default_max_file_size() -> u64 {
    200 * 1024 * 1024
}

impl PipelineConfig {
    pub fn backoff(&self) -> Backoff {
        let delay = Duration::from_millis(self.retry_delay_ms);
        match self.backoff {
            BackoffKind::Fixed => Backoff::fixed(delay),
            BackoffKind::Exponential => Backoff::exponential(delay),
        }
    }

    pub fn chunk_policy(&self) -> ChunkSizePolicy {
        self.chunk_size
            .map_or_else(ChunkSizePolicy::default, ChunkSizePolicy::fixed)
    }

    pub const fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    /// Configuration with every delay set to zero, for tests and local backends.
    pub fn without_delays() -> Self {
        Self {
            retry_delay_ms: 0,
            chunk_delay_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            backoff: BackoffKind::default(),
            chunk_delay_ms: default_chunk_delay_ms(),
            chunk_size: None,
            max_file_size: default_max_file_size(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable memory cache
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Maximum memory cache size in megabytes
    #[serde(default = "default_memory_max_mb")]
    pub memory_max_mb: u64,

    /// Memory cache TTL in seconds (0 = no expiry)
    #[serde(default)]
    pub memory_ttl_seconds: u64,

    /// Enable disk cache
    #[serde(default = "default_true")]
    pub disk_enabled: bool,

    /// Disk cache directory (defaults to $XDG_CACHE_HOME/doc-translator)
    pub disk_path: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

const fn default_memory_max_mb() -> u64 {
    64
}

impl CacheConfig {
    pub const fn disabled() -> Self {
        Self {
            memory_enabled: false,
            memory_max_mb: 0,
            memory_ttl_seconds: 0,
            disk_enabled: false,
            disk_path: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            memory_max_mb: default_memory_max_mb(),
            memory_ttl_seconds: 0,
            disk_enabled: true,
            disk_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Ask for structure-preserving markdown instead of plain prose
    #[serde(default)]
    pub high_fidelity: bool,

    /// Translator backend configuration
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Chunking, retry and pacing configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_lang: default_target_lang(),
            high_fidelity: false,
            translator: TranslatorConfig::default(),
            pipeline: PipelineConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/doc-translator/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("doc-translator").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.pipeline.max_retries == 0 {
            return Err(crate::error::Error::ConfigInvalid {
                field: "pipeline.max_retries".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        if self.pipeline.chunk_size == Some(0) {
            return Err(crate::error::Error::ConfigInvalid {
                field: "pipeline.chunk_size".to_string(),
                reason: "chunks must span at least one page".to_string(),
            });
        }
        if self.target_lang.as_str().trim().is_empty() {
            return Err(crate::error::Error::ConfigInvalid {
                field: "target_lang".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// A language option for UI dropdowns
#[derive(Debug, Clone, Serialize)]
pub struct LanguageOption {
    /// ISO language code (e.g., "en", "fr", "ml")
    pub code: &'static str,
    /// English display name
    pub name: &'static str,
}

const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("pt", "Portuguese"),
    ("it", "Italian"),
    ("nl", "Dutch"),
    ("sv", "Swedish"),
    ("da", "Danish"),
    ("no", "Norwegian"),
    ("fi", "Finnish"),
    ("pl", "Polish"),
    ("cs", "Czech"),
    ("tr", "Turkish"),
    ("el", "Greek"),
    ("ru", "Russian"),
    ("ar", "Arabic"),
    ("fa", "Persian"),
    ("ur", "Urdu"),
    ("hi", "Hindi"),
    ("mr", "Marathi"),
    ("bn", "Bengali"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("kn", "Kannada"),
    ("ml", "Malayalam"),
    ("gu", "Gujarati"),
    ("pa", "Punjabi"),
    ("or", "Odia"),
    ("si", "Sinhala"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("th", "Thai"),
    ("vi", "Vietnamese"),
];

/// Languages available as translation target.
pub fn target_languages() -> Vec<LanguageOption> {
    LANGUAGES
        .iter()
        .map(|&(code, name)| LanguageOption { code, name })
        .collect()
}

fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|&(_, name)| name)
}

/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "en";
/// Default Gemini REST endpoint
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
