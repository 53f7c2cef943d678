//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variables that override credentials from the config file.
pub const ENV_ACCESS_TOKEN: &str = "PATRONAGE_ACCESS_TOKEN";
pub const ENV_CAMPAIGN_ID: &str = "PATRONAGE_CAMPAIGN_ID";
pub const ENV_WEBHOOK_SECRET: &str = "PATRONAGE_WEBHOOK_SECRET";
pub const ENV_CLIENT_ID: &str = "PATRONAGE_CLIENT_ID";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Remote platform and credentials
    #[serde(default)]
    pub source: SourceConfig,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Overlay credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay credentials from an arbitrary lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let source = &mut self.source;
        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            source.access_token = token;
        }
        if let Some(id) = lookup(ENV_CAMPAIGN_ID) {
            source.campaign_id = id;
        }
        if let Some(secret) = lookup(ENV_WEBHOOK_SECRET) {
            source.webhook_secret = secret;
        }
        if let Some(client_id) = lookup(ENV_CLIENT_ID) {
            source.client_id = Some(client_id);
        }
    }

    /// Validate configuration values and required credentials.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_pages == 0 {
            return Err(AppError::validation("http.max_pages must be > 0"));
        }
        if self.source.page_size == 0 {
            return Err(AppError::validation("source.page_size must be > 0"));
        }

        let source = &self.source;
        if source.access_token.trim().is_empty() {
            return Err(AppError::config(format!(
                "source.access_token is required (or set {ENV_ACCESS_TOKEN})"
            )));
        }
        if source.campaign_id.trim().is_empty() {
            return Err(AppError::config(format!(
                "source.campaign_id is required (or set {ENV_CAMPAIGN_ID})"
            )));
        }
        match source.platform {
            Platform::Patreon => {
                if source.webhook_secret.is_empty() {
                    return Err(AppError::config(format!(
                        "source.webhook_secret is required (or set {ENV_WEBHOOK_SECRET})"
                    )));
                }
            }
            Platform::Twitch => {
                if source.client_id.as_deref().is_none_or(|id| id.trim().is_empty()) {
                    return Err(AppError::config(format!(
                        "source.client_id is required for twitch (or set {ENV_CLIENT_ID})"
                    )));
                }
                if source.tiers.is_empty() {
                    return Err(AppError::validation("source.tiers is empty"));
                }
            }
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Upper bound on pages fetched by one bulk load
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_pages: defaults::max_pages(),
        }
    }
}

/// Supported remote platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// JSON:API pledge listing with cursor next-links and signed webhooks
    #[default]
    Patreon,
    /// Offset-paginated channel subscriptions
    Twitch,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Patreon => write!(f, "patreon"),
            Platform::Twitch => write!(f, "twitch"),
        }
    }
}

/// Keyed digest used for webhook signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha256,
}

/// Remote platform, credentials and reward scoping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub platform: Platform,

    /// API root; defaults depend on the platform
    #[serde(default)]
    pub api_base: Option<String>,

    /// Bearer/OAuth access credential
    #[serde(default)]
    pub access_token: String,

    /// Campaign (pledge platform) or channel (subscription platform) id
    #[serde(default)]
    pub campaign_id: String,

    /// Shared secret for webhook signatures
    #[serde(default)]
    pub webhook_secret: String,

    /// Client identifier header value
    #[serde(default)]
    pub client_id: Option<String>,

    /// Rows requested per page where the platform takes a limit
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub digest: DigestAlgorithm,

    /// Subscription plan table (plan id, price, title)
    #[serde(default = "defaults::tiers")]
    pub tiers: Vec<TierConfig>,
}

impl SourceConfig {
    /// API root for the configured platform.
    pub fn api_base(&self) -> &str {
        match (&self.api_base, self.platform) {
            (Some(base), _) => base.as_str(),
            (None, Platform::Patreon) => defaults::PATREON_API_BASE,
            (None, Platform::Twitch) => defaults::TWITCH_API_BASE,
        }
    }

    /// Look up a subscription tier by plan id.
    pub fn tier(&self, plan: &str) -> Option<&TierConfig> {
        self.tiers.iter().find(|t| t.plan == plan)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            api_base: None,
            access_token: String::new(),
            campaign_id: String::new(),
            webhook_secret: String::new(),
            client_id: None,
            page_size: defaults::page_size(),
            digest: DigestAlgorithm::default(),
            tiers: defaults::tiers(),
        }
    }
}

/// A subscription plan and the price it stands for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierConfig {
    /// Plan id as reported by the platform (e.g. "1000")
    pub plan: String,

    /// Price in cents
    pub amount_cents: u64,

    /// Display title
    pub title: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use super::TierConfig;

    pub const PATREON_API_BASE: &str = "https://www.patreon.com/api/oauth2/api";
    pub const TWITCH_API_BASE: &str = "https://api.twitch.tv/kraken";

    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; patronage/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_pages() -> usize {
        500
    }
    pub fn page_size() -> usize {
        100
    }
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn tiers() -> Vec<TierConfig> {
        vec![
            TierConfig {
                plan: "1000".to_string(),
                amount_cents: 499,
                title: "Tier 1".to_string(),
            },
            TierConfig {
                plan: "2000".to_string(),
                amount_cents: 999,
                title: "Tier 2".to_string(),
            },
            TierConfig {
                plan: "3000".to_string(),
                amount_cents: 2499,
                title: "Tier 3".to_string(),
            },
            TierConfig {
                plan: "Prime".to_string(),
                amount_cents: 499,
                title: "Prime".to_string(),
            },
        ]
    }
}
