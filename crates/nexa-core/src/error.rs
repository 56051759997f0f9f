// ── Core error types ──
//
// Domain errors for the sync engine. Consumers never match on HTTP status
// codes or raw JSON failures; `From<nexa_api::Error>` folds transport-layer
// errors into the categories the engine reacts to.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote API ───────────────────────────────────────────────────
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("API error: {message}")]
    Api { message: String },

    #[error("Could not decode response: {message}")]
    Decode { message: String },

    // ── Startup ──────────────────────────────────────────────────────
    /// Plant list unavailable or no devices found. Fatal at startup.
    #[error("Device enumeration failed: {message}")]
    Enumeration { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    #[error("Unknown device: {serial}")]
    UnknownDevice { serial: String },

    #[error("Not attached to a device sink")]
    Detached,

    // ── Sink ─────────────────────────────────────────────────────────
    #[error("Publish failed: {message}")]
    Sink { message: String },
}

impl CoreError {
    pub(crate) fn enumeration(err: impl std::fmt::Display) -> Self {
        Self::Enumeration {
            message: err.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nexa_api::Error> for CoreError {
    fn from(err: nexa_api::Error) -> Self {
        match err {
            nexa_api::Error::Authentication { message } => CoreError::Authentication { message },
            nexa_api::Error::SessionExpired => CoreError::Authentication {
                message: "session expired after re-login".into(),
            },
            e @ (nexa_api::Error::Transport(_) | nexa_api::Error::Tls(_)) => CoreError::Transport {
                message: e.to_string(),
            },
            nexa_api::Error::Http { status, body } => CoreError::Transport {
                message: format!("HTTP {status}: {}", truncate(&body, 200)),
            },
            nexa_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            nexa_api::Error::Api { message } => CoreError::Api { message },
            nexa_api::Error::Deserialization { message, body: _ } => CoreError::Decode { message },
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_session_maps_to_authentication() {
        let err = CoreError::from(nexa_api::Error::SessionExpired);
        assert!(matches!(err, CoreError::Authentication { .. }));
    }

    #[test]
    fn http_body_is_truncated() {
        let err = CoreError::from(nexa_api::Error::Http {
            status: 500,
            body: "x".repeat(1000),
        });
        let CoreError::Transport { message } = err else {
            panic!("expected Transport");
        };
        assert!(message.len() < 300);
        assert!(message.starts_with("HTTP 500"));
    }

    #[test]
    fn deserialization_maps_to_decode() {
        let err = CoreError::from(nexa_api::Error::Deserialization {
            message: "expected value".into(),
            body: "oops".into(),
        });
        assert!(matches!(err, CoreError::Decode { ref message } if message == "expected value"));
    }
}
