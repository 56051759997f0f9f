// ── Runtime sync configuration ──
//
// These types describe *what* to poll and *how often*. They carry
// credentials and cadences but never touch disk; the binary builds a
// `SyncConfig` from its config layer and hands it in.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Which Growatt API serves reads and which serves writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiMode {
    /// Poll and apply through the app API.
    App,
    /// Poll through the web portal; parameter writes are rejected.
    Web,
    /// Poll through the web portal, apply through the app API.
    #[default]
    WebApp,
}

impl ApiMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Web => "web",
            Self::WebApp => "web+app",
        }
    }

    /// Whether parameter writes are possible in this mode.
    pub fn can_apply(self) -> bool {
        !matches!(self, Self::Web)
    }
}

impl fmt::Display for ApiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "app" => Ok(Self::App),
            "web" => Ok(Self::Web),
            "web+app" | "web_app" | "webapp" => Ok(Self::WebApp),
            other => Err(CoreError::Config {
                message: format!("unknown api mode '{other}' (expected app, web, or web+app)"),
            }),
        }
    }
}

/// Independent cadences of the three poll loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub status: Duration,
    pub battery: Duration,
    pub parameter: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            status: Duration::from_secs(30),
            battery: Duration::from_secs(180),
            parameter: Duration::from_secs(180),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrowattCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Complete runtime configuration for an [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_mode: ApiMode,
    pub app_url: Url,
    pub web_url: Url,
    /// evcharge OCPP endpoint used for the app API's token round trip.
    pub token_url: Url,
    pub credentials: GrowattCredentials,
    pub request_timeout: Duration,
    pub intervals: PollIntervals,
    pub debounce: Duration,
}

pub const DEFAULT_APP_URL: &str = "https://server-api.growatt.com";
pub const DEFAULT_WEB_URL: &str = "https://openapi.growatt.com";
pub const DEFAULT_TOKEN_URL: &str = "https://evcharge.growatt.com/ocpp/user";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_mode_round_trips_through_str() {
        for mode in [ApiMode::App, ApiMode::Web, ApiMode::WebApp] {
            assert_eq!(mode.as_str().parse::<ApiMode>().ok(), Some(mode));
        }
    }

    #[test]
    fn api_mode_rejects_unknown() {
        assert!("cloud".parse::<ApiMode>().is_err());
    }

    #[test]
    fn only_web_mode_is_read_only() {
        assert!(ApiMode::App.can_apply());
        assert!(ApiMode::WebApp.can_apply());
        assert!(!ApiMode::Web.can_apply());
    }
}
