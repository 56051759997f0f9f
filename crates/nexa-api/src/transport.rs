// Shared transport for both Growatt API surfaces.
//
// Builds the `reqwest::Client` (timeout, cookie jar, user agent) and performs
// the single request shape both APIs use: a form-encoded POST answered with
// JSON. Session-expiry detection happens here, because the signature lives
// in the raw body before any JSON decoding.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;

const USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 \
    (KHTML, like Gecko) SamsungBrowser/27.0 Chrome/125.0.0.0 Mobile Safari/537.36";

/// Body fragment the app API returns when the bearer token is stale.
const NOT_LOGGED_IN: &str = "you have not login to the system";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Create a config with a fresh cookie jar (for session auth).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Raw form-POST client. Knows nothing about login; callers that need
/// transparent re-authentication go through [`crate::SessionClient`].
#[derive(Debug, Clone)]
pub struct FormTransport {
    http: reqwest::Client,
}

impl FormTransport {
    /// Build a transport from config. A cookie jar is always attached,
    /// since the web API keeps its session in cookies.
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        let config = if config.cookie_jar.is_some() {
            config.clone()
        } else {
            config.clone().with_cookie_jar()
        };
        Ok(Self {
            http: config.build_client()?,
        })
    }

    /// POST `form` to `url`, attaching `Authorization: Bearer <token>` when a
    /// token is given, and decode the JSON response.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&SecretString>,
        form: &[(&'static str, String)],
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let mut req = self.http.post(url.clone()).form(form);
        if let Some(token) = token {
            req = req.bearer_auth(token.expose_secret());
        }

        let resp = req.send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if status != reqwest::StatusCode::OK {
            warn!(url = %url, status = status.as_u16(), "request failed");
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        if is_login_signature(&body) {
            return Err(Error::SessionExpired);
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(url = %url, error = %e, "could not decode response body");
            Error::Deserialization {
                message: e.to_string(),
                body,
            }
        })
    }
}

/// An HTML page where JSON was expected, or the explicit notice, means the
/// server bounced us to its login page.
pub(crate) fn is_login_signature(body: &str) -> bool {
    body.trim_start().starts_with('<') || body.contains(NOT_LOGGED_IN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_login_page_is_expiry() {
        assert!(is_login_signature("\n  <!DOCTYPE html><html>login</html>"));
    }

    #[test]
    fn notice_text_is_expiry() {
        assert!(is_login_signature(
            r#"{"msg":"Dear user, you have not login to the system"}"#
        ));
    }

    #[test]
    fn plain_json_is_not_expiry() {
        assert!(!is_login_signature(r#"{"result":1,"msg":"ok"}"#));
        assert!(!is_login_signature("[]"));
    }
}
