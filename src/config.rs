use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{MirrorError, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_CONFIG_PATH: &str = "personality_mirror.toml";
pub const DEFAULT_SECRETS_PATH: &str = "secrets.toml";

const API_KEY_VAR: &str = "GEMINI_API_KEY";
const MODEL_VAR: &str = "GEMINI_MODEL";

/// Main configuration structure loaded from personality_mirror.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub stages: StagesConfig,
    pub pipeline: PipelineConfig,
    pub log_level: String,
    /// File the values were read from; `None` when defaults were used.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Which transport answers `generate` calls. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Direct REST call to the generateContent endpoint
    Http,
    /// Local `gemini` command-line tool
    Cli,
}

impl FromStr for TransportKind {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "rest" => Ok(TransportKind::Http),
            "cli" => Ok(TransportKind::Cli),
            other => Err(MirrorError::Config {
                message: format!("unknown transport '{other}' (expected 'http' or 'cli')"),
            }),
        }
    }
}

/// Remote model settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub transport: TransportKind,
    pub base_url: String,
    /// Fallback model when neither the secrets file nor GEMINI_MODEL names one
    pub model: String,
    pub timeout_secs: u64,
    pub top_p: f32,
    pub cli_path: String,
    pub secrets_file: PathBuf,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            top_p: 0.95,
            cli_path: "gemini".to_string(),
            secrets_file: PathBuf::from(DEFAULT_SECRETS_PATH),
        }
    }
}

/// Generation parameters and retry policy for one stage
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StagePolicy {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Re-ask once with a "JSON only" instruction when the structured parse fails
    pub retry: bool,
}

impl StagePolicy {
    pub const fn new(retry: bool) -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.7,
            retry,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StagesConfig {
    pub traits: StagePolicy,
    pub summary: StagePolicy,
    pub validator: StagePolicy,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            traits: StagePolicy::new(true),
            summary: StagePolicy::new(false),
            validator: StagePolicy::new(true),
        }
    }
}

/// One `[stages.*]` table as written; unset keys fall back to that stage's default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StageOverrides {
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    retry: Option<bool>,
}

impl StageOverrides {
    fn over(self, base: StagePolicy) -> StagePolicy {
        StagePolicy {
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            temperature: self.temperature.unwrap_or(base.temperature),
            retry: self.retry.unwrap_or(base.retry),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StagesOverrides {
    traits: StageOverrides,
    summary: StageOverrides,
    validator: StageOverrides,
}

impl<'de> Deserialize<'de> for StagesConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = StagesOverrides::deserialize(deserializer)?;
        let base = Self::default();
        Ok(Self {
            traits: raw.traits.over(base.traits),
            summary: raw.summary.over(base.summary),
            validator: raw.validator.over(base.validator),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Re-call each stage once after the run to keep its raw text for debugging
    pub capture_raw: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { capture_raw: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            stages: StagesConfig::default(),
            pipeline: PipelineConfig::default(),
            log_level: "personality_mirror=info".to_string(),
            source: None,
        }
    }
}

fn env_flag(value: &str) -> Option<bool> {
    if value == "1" || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses PERSONALITY_MIRROR_CONFIG or defaults to "personality_mirror.toml".
    pub fn load() -> Result<Self> {
        crate::load_env();

        let config_path = std::env::var("PERSONALITY_MIRROR_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load from an explicit path, then apply process environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the TOML file, falling back to defaults when it does not exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let mut config: Self = toml::from_str(&content)?;
                config.source = Some(path.to_path_buf());
                Ok(config)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(MirrorError::Config {
                message: format!("cannot read {}: {}", path.display(), err),
            }),
        }
    }

    /// Apply env overrides (env-first). `lookup` stands in for `std::env::var`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(transport) = lookup("MIRROR_TRANSPORT") {
            self.gemini.transport = transport.parse()?;
            tracing::debug!("MIRROR_TRANSPORT env override applied");
        }
        if let Some(base) = lookup("MIRROR_GEMINI_BASE_URL") {
            self.gemini.base_url = base;
        }
        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.trim().is_empty()) {
            self.gemini.model = model;
        }
        if let Some(secs) = lookup("MIRROR_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            self.gemini.timeout_secs = secs;
        }
        if let Some(cli) = lookup("MIRROR_GEMINI_CLI") {
            self.gemini.cli_path = cli;
        }
        if let Some(path) = lookup("MIRROR_SECRETS_FILE") {
            self.gemini.secrets_file = PathBuf::from(path);
        }
        if let Some(capture) = lookup("MIRROR_CAPTURE_RAW").as_deref().and_then(env_flag) {
            self.pipeline.capture_raw = capture;
        }
        if let Some(level) = lookup("MIRROR_LOG") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Validate the configuration, clamping what can be clamped
    pub fn validate(&mut self) -> Result<()> {
        if self.gemini.timeout_secs == 0 {
            self.gemini.timeout_secs = 1;
        } else if self.gemini.timeout_secs > 300 {
            tracing::warn!(
                "timeout_secs {} exceeds max 300, clamping to 300",
                self.gemini.timeout_secs
            );
            self.gemini.timeout_secs = 300;
        }
        if !(0.0..=1.0).contains(&self.gemini.top_p) {
            return Err(MirrorError::Config {
                message: "gemini.top_p must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.gemini.base_url.trim().is_empty() {
            return Err(MirrorError::Config {
                message: "gemini.base_url must not be empty".to_string(),
            });
        }
        for (name, stage) in [
            ("traits", &self.stages.traits),
            ("summary", &self.stages.summary),
            ("validator", &self.stages.validator),
        ] {
            if stage.max_tokens == 0 {
                return Err(MirrorError::Config {
                    message: format!("stages.{name}.max_tokens must be > 0"),
                });
            }
            if !(0.0..=2.0).contains(&stage.temperature) {
                return Err(MirrorError::Config {
                    message: format!("stages.{name}.temperature must be between 0.0 and 2.0"),
                });
            }
        }
        Ok(())
    }

    /// Credentials provider layered the way this config describes.
    pub fn credentials(&self) -> LayeredCredentials {
        LayeredCredentials::new(self.gemini.secrets_file.clone(), self.gemini.model.clone())
    }
}

/// API key and model resolved for a single call
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub model: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

/// Consulted once per remote call
pub trait CredentialsProvider: Send + Sync {
    fn resolve(&self) -> Credentials;
}

/// Fixed credentials, mostly for tests and embedding callers
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl StaticCredentials {
    pub fn new(api_key: Option<&str>, model: &str) -> Self {
        Self(Credentials {
            api_key: api_key.map(str::to_string),
            model: model.to_string(),
        })
    }
}

impl CredentialsProvider for StaticCredentials {
    fn resolve(&self) -> Credentials {
        self.0.clone()
    }
}

/// Flat TOML secrets file (`GEMINI_API_KEY = "..."`)
#[derive(Debug, Clone, Default)]
pub struct SecretsStore {
    values: HashMap<String, toml::Value>,
}

impl SecretsStore {
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(MirrorError::Config {
                    message: format!("cannot read secrets file {}: {}", path.display(), err),
                });
            }
        };
        let values: HashMap<String, toml::Value> = toml::from_str(&content)?;
        Ok(Some(Self { values }))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }
}

/// Secrets file first, environment second, configured model last.
#[derive(Debug, Clone)]
pub struct LayeredCredentials {
    secrets_path: PathBuf,
    default_model: String,
}

impl LayeredCredentials {
    pub fn new(secrets_path: PathBuf, default_model: String) -> Self {
        Self {
            secrets_path,
            default_model,
        }
    }

    pub fn resolve_with<F>(&self, lookup: F) -> Credentials
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = match SecretsStore::load(&self.secrets_path) {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!("Ignoring unreadable secrets file: {}", err);
                None
            }
        };
        let from_secrets = |key: &str| {
            secrets
                .as_ref()
                .and_then(|s| s.get(key))
                .map(str::to_string)
        };
        let from_env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = from_secrets(API_KEY_VAR).or_else(|| from_env(API_KEY_VAR));
        let model = from_secrets(MODEL_VAR)
            .or_else(|| from_env(MODEL_VAR))
            .unwrap_or_else(|| self.default_model.clone());

        Credentials { api_key, model }
    }
}

impl CredentialsProvider for LayeredCredentials {
    fn resolve(&self) -> Credentials {
        self.resolve_with(|key| std::env::var(key).ok())
    }
}
