use thiserror::Error;

/// Top-level error type for the `nexa-api` crate.
///
/// Covers every failure mode of both Growatt API surfaces: transport,
/// session, and payload decoding. `nexa-core` maps these into its own
/// error domain.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, rejected token round trip, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The server answered with its "not logged in" signature
    /// (an HTML login page or the "you have not login" notice).
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-200 response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// The API accepted the request but reported a failure in its
    /// `result` / `msg` envelope.
    #[error("Growatt API error: {message}")]
    Api { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the session has expired and a fresh login
    /// might resolve it.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error the next poll may not hit.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
