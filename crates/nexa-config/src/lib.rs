//! Configuration for the NEXA MQTT bridge.
//!
//! Layered loading (defaults, TOML file, `NEXA_*` environment), validation,
//! credential resolution, and translation to `nexa_core::SyncConfig`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use nexa_core::config::{DEFAULT_APP_URL, DEFAULT_TOKEN_URL, DEFAULT_WEB_URL};
use nexa_core::{ApiMode, GrowattCredentials, PollIntervals, SyncConfig};

/// Environment variable prefix. Sections nest with `__`, e.g.
/// `NEXA_MQTT__HOST`.
pub const ENV_PREFIX: &str = "NEXA_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Default log filter when neither `RUST_LOG` nor `-v` is given.
    pub log_level: String,
    pub polling: PollingConfig,
    pub growatt: GrowattConfig,
    pub mqtt: MqttConfig,
    pub homeassistant: HomeAssistantConfig,
    pub coalescer: CoalescerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            polling: PollingConfig::default(),
            growatt: GrowattConfig::default(),
            mqtt: MqttConfig::default(),
            homeassistant: HomeAssistantConfig::default(),
            coalescer: CoalescerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    pub status_interval_secs: u64,
    pub battery_interval_secs: u64,
    pub parameter_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval_secs: 30,
            battery_interval_secs: 180,
            parameter_interval_secs: 180,
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GrowattConfig {
    /// `app`, `web`, or `web+app`.
    pub api_mode: String,
    pub server_url_web: String,
    pub server_url_app: String,
    pub token_url: String,
    pub username: Option<String>,
    /// Plaintext password. Prefer `password_env`.
    pub password: Option<String>,
    /// Name of an environment variable holding the password.
    pub password_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GrowattConfig {
    fn default() -> Self {
        Self {
            api_mode: ApiMode::default().as_str().into(),
            server_url_web: DEFAULT_WEB_URL.into(),
            server_url_app: DEFAULT_APP_URL.into(),
            token_url: DEFAULT_TOKEN_URL.into(),
            username: None,
            password: None,
            password_env: None,
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for GrowattConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowattConfig")
            .field("api_mode", &self.api_mode)
            .field("server_url_web", &self.server_url_web)
            .field("server_url_app", &self.server_url_app)
            .field("token_url", &self.token_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("password_env", &self.password_env)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host. Required.
    pub host: Option<String>,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 1883,
            client_id: "nexa-mqtt".into(),
            username: None,
            password: None,
            topic_prefix: "noah2mqtt".into(),
        }
    }
}

impl fmt::Debug for MqttConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("topic_prefix", &self.topic_prefix)
            .finish()
    }
}

/// Home Assistant MQTT discovery.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HomeAssistantConfig {
    pub enabled: bool,
    /// Discovery prefix configured in Home Assistant.
    pub topic_prefix: String,
    /// Expose ON/OFF parameters as selects instead of switches.
    pub switch_as_select: bool,
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            topic_prefix: "homeassistant".into(),
            switch_as_select: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CoalescerConfig {
    pub debounce_ms: u64,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

// ── Resolved MQTT settings ──────────────────────────────────────────

/// Validated broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub credentials: Option<(String, SecretString)>,
    pub topic_prefix: String,
    /// `None` when Home Assistant discovery is disabled.
    pub discovery: Option<DiscoverySettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub topic_prefix: String,
    pub switch_as_select: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Platform config file location (`~/.config/nexa-mqtt/config.toml` on Linux).
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "nexa-bridge", "nexa-mqtt").map_or_else(
        || PathBuf::from("nexa-mqtt.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load `defaults → TOML → NEXA_* env`.
///
/// An explicit `path` must exist; the platform default path is optional.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    Ok(config)
}

impl Config {
    /// Check everything that can be checked without the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::invalid(
                "log_level",
                format!("expected one of {}, got '{}'", LOG_LEVELS.join(", "), self.log_level),
            ));
        }

        for (field, secs) in [
            ("polling.status_interval_secs", self.polling.status_interval_secs),
            ("polling.battery_interval_secs", self.polling.battery_interval_secs),
            ("polling.parameter_interval_secs", self.polling.parameter_interval_secs),
            ("growatt.timeout_secs", self.growatt.timeout_secs),
            ("coalescer.debounce_ms", self.coalescer.debounce_ms),
        ] {
            if secs == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }

        self.api_mode()?;
        parse_url("growatt.server_url_web", &self.growatt.server_url_web)?;
        parse_url("growatt.server_url_app", &self.growatt.server_url_app)?;
        parse_url("growatt.token_url", &self.growatt.token_url)?;
        self.credentials()?;
        self.mqtt_settings()?;
        Ok(())
    }

    pub fn api_mode(&self) -> Result<ApiMode, ConfigError> {
        self.growatt
            .api_mode
            .parse()
            .map_err(|_| {
                ConfigError::invalid(
                    "growatt.api_mode",
                    format!("expected 'app', 'web', or 'web+app', got '{}'", self.growatt.api_mode),
                )
            })
    }

    /// Growatt credentials: username, then password from `password_env`,
    /// falling back to the plaintext `password`.
    pub fn credentials(&self) -> Result<GrowattCredentials, ConfigError> {
        let username = self
            .growatt
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigError::invalid("growatt.username", "required"))?;

        let from_env = self
            .growatt
            .password_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());
        let password = from_env
            .or_else(|| self.growatt.password.clone())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ConfigError::invalid("growatt.password", "required (or set growatt.password_env)"))?;

        Ok(GrowattCredentials {
            username,
            password: SecretString::from(password),
        })
    }

    pub fn mqtt_settings(&self) -> Result<MqttSettings, ConfigError> {
        let host = self
            .mqtt
            .host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ConfigError::invalid("mqtt.host", "required"))?;

        if self.mqtt.client_id.is_empty() || self.mqtt.client_id.starts_with(' ') {
            return Err(ConfigError::invalid("mqtt.client_id", "must be non-empty"));
        }

        let prefix = topic_prefix("mqtt.topic_prefix", &self.mqtt.topic_prefix)?;
        let discovery = if self.homeassistant.enabled {
            Some(DiscoverySettings {
                topic_prefix: topic_prefix("homeassistant.topic_prefix", &self.homeassistant.topic_prefix)?
                    .to_owned(),
                switch_as_select: self.homeassistant.switch_as_select,
            })
        } else {
            None
        };

        let credentials = match (&self.mqtt.username, &self.mqtt.password) {
            (Some(user), Some(pw)) => Some((user.clone(), SecretString::from(pw.clone()))),
            (Some(user), None) => Some((user.clone(), SecretString::from(String::new()))),
            (None, Some(_)) => {
                return Err(ConfigError::invalid("mqtt.username", "required when mqtt.password is set"));
            }
            (None, None) => None,
        };

        Ok(MqttSettings {
            host,
            port: self.mqtt.port,
            client_id: self.mqtt.client_id.clone(),
            credentials,
            topic_prefix: prefix.to_owned(),
            discovery,
        })
    }

    /// Validate and build the runtime configuration for the sync engine.
    pub fn to_sync_config(&self) -> Result<SyncConfig, ConfigError> {
        self.validate()?;
        Ok(SyncConfig {
            api_mode: self.api_mode()?,
            app_url: parse_url("growatt.server_url_app", &self.growatt.server_url_app)?,
            web_url: parse_url("growatt.server_url_web", &self.growatt.server_url_web)?,
            token_url: parse_url("growatt.token_url", &self.growatt.token_url)?,
            credentials: self.credentials()?,
            request_timeout: Duration::from_secs(self.growatt.timeout_secs),
            intervals: PollIntervals {
                status: Duration::from_secs(self.polling.status_interval_secs),
                battery: Duration::from_secs(self.polling.battery_interval_secs),
                parameter: Duration::from_secs(self.polling.parameter_interval_secs),
            },
            debounce: Duration::from_millis(self.coalescer.debounce_ms),
        })
    }

    /// The effective configuration as TOML, with passwords masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        mask(&mut shown.growatt.password);
        mask(&mut shown.mqtt.password);
        Ok(toml::to_string_pretty(&shown)?)
    }
}

fn mask(secret: &mut Option<String>) {
    if secret.is_some() {
        *secret = Some("********".into());
    }
}

/// Strip surrounding slashes; reject empty prefixes and wildcards.
fn topic_prefix<'a>(field: &str, raw: &'a str) -> Result<&'a str, ConfigError> {
    let prefix = raw.trim_matches('/');
    if prefix.is_empty() || prefix.contains(['+', '#']) {
        return Err(ConfigError::invalid(field, "must be non-empty and contain no wildcards"));
    }
    Ok(prefix)
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid(field, format!("invalid URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(field, format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url)
}
