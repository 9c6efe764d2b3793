//! Configuration for the Twitter credentials and bot behaviour
//!
//! Credentials come from the environment (optionally seeded from `.env`).
//! Bot settings come from an optional `config.yml`; env vars always win.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::dispatch::EventErrorPolicy;
use crate::error::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_TRACK: &str = "@caze_bot";
pub const DEFAULT_ASSET_PATH: &str = "meteuessa.jpg";
pub const DEFAULT_MEDIA_CATEGORY: &str = "tweet_image";
pub const CONFIG_FILE: &str = "config.yml";

pub const API_BASE: &str = "https://api.twitter.com/1.1";
pub const UPLOAD_BASE: &str = "https://upload.twitter.com/1.1";
pub const STREAM_BASE: &str = "https://stream.twitter.com/1.1";

pub const ENV_CONSUMER_KEY: &str = "CONSUMER_KEY";
pub const ENV_CONSUMER_SECRET: &str = "CONSUMER_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const ENV_ACCESS_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";

/// OAuth 1.0a user credentials.
///
/// Values are not validated here; an empty or wrong value surfaces as an
/// authentication error from the verify call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Credentials {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }

    /// Read the four credential variables. Unset variables become empty strings.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).unwrap_or_default();
        Self {
            consumer_key: var(ENV_CONSUMER_KEY),
            consumer_secret: var(ENV_CONSUMER_SECRET),
            access_token: var(ENV_ACCESS_TOKEN),
            access_token_secret: var(ENV_ACCESS_TOKEN_SECRET),
        }
    }

    /// True when any of the four values is empty.
    pub fn has_missing(&self) -> bool {
        self.consumer_key.is_empty()
            || self.consumer_secret.is_empty()
            || self.access_token.is_empty()
            || self.access_token_secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("Credentials")
            .field("consumer_key", &redact(&self.consumer_key))
            .field("consumer_secret", &redact(&self.consumer_secret))
            .field("access_token", &redact(&self.access_token))
            .field("access_token_secret", &redact(&self.access_token_secret))
            .finish()
    }
}

/// Base URLs of the three Twitter hosts the bot talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: String,
    pub upload_base: String,
    pub stream_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            upload_base: UPLOAD_BASE.to_string(),
            stream_base: STREAM_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every host at the same base URL (used with mock servers).
    pub fn single(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            api_base: base.clone(),
            upload_base: base.clone(),
            stream_base: base,
        }
    }
}

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    twitter: Option<TwitterYaml>,
    bot: Option<BotYaml>,
}

#[derive(Debug, Default, Deserialize)]
struct TwitterYaml {
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    access_token: Option<String>,
    access_token_secret: Option<String>,
    api_base: Option<String>,
    upload_base: Option<String>,
    stream_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BotYaml {
    track: Option<Vec<String>>,
    stall_warnings: Option<bool>,
    asset_path: Option<PathBuf>,
    media_category: Option<String>,
    cache_media: Option<bool>,
    on_event_error: Option<EventErrorPolicy>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub track: Vec<String>,
    pub stall_warnings: bool,
    pub asset_path: PathBuf,
    pub media_category: String,
    pub cache_media: bool,
    pub on_event_error: EventErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_first(&[PathBuf::from(CONFIG_FILE), Path::new("..").join(CONFIG_FILE)])
    }

    /// First candidate file that loads, or defaults. A file that exists but
    /// fails to load is reported and skipped.
    pub fn load_first(candidates: &[PathBuf]) -> Self {
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(err) => warn!(path = %path.display(), "Ignoring config file: {}", err),
            }
        }
        Self::defaults()
    }

    /// Built-in settings with credentials taken from the environment.
    pub fn defaults() -> Self {
        Self::load_dotenv();
        Self::from_yaml(YamlConfig::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text, resolving env overrides.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping
        if content.trim().is_empty() {
            return Ok(Self::from_yaml(YamlConfig::default()));
        }
        let yaml: YamlConfig = serde_yaml::from_str(content)?;
        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let bot = yaml.bot.unwrap_or_default();

        // Without a twitter section the credentials come straight from the environment
        let (credentials, twitter) = match yaml.twitter {
            None => (Credentials::from_env(), TwitterYaml::default()),
            Some(mut twitter) => {
                let credentials = Credentials {
                    consumer_key: Self::resolve_env_string(
                        twitter.consumer_key.take(),
                        ENV_CONSUMER_KEY,
                    ),
                    consumer_secret: Self::resolve_env_string(
                        twitter.consumer_secret.take(),
                        ENV_CONSUMER_SECRET,
                    ),
                    access_token: Self::resolve_env_string(
                        twitter.access_token.take(),
                        ENV_ACCESS_TOKEN,
                    ),
                    access_token_secret: Self::resolve_env_string(
                        twitter.access_token_secret.take(),
                        ENV_ACCESS_TOKEN_SECRET,
                    ),
                };
                (credentials, twitter)
            }
        };

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            api_base: twitter.api_base.unwrap_or(defaults.api_base),
            upload_base: twitter.upload_base.unwrap_or(defaults.upload_base),
            stream_base: twitter.stream_base.unwrap_or(defaults.stream_base),
        };

        let track = bot
            .track
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_TRACK.to_string()]);

        Self {
            credentials,
            endpoints,
            track,
            stall_warnings: bot.stall_warnings.unwrap_or(true),
            asset_path: bot
                .asset_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_PATH)),
            media_category: bot
                .media_category
                .unwrap_or_else(|| DEFAULT_MEDIA_CATEGORY.to_string()),
            cache_media: bot.cache_media.unwrap_or(false),
            on_event_error: bot.on_event_error.unwrap_or_default(),
        }
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            }
        }
        // Explicit env var always wins over a literal YAML value
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        match value {
            Some(v) if v.starts_with("${") => String::new(),
            other => other.unwrap_or_default(),
        }
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }
}
