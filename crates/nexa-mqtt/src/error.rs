//! Startup error types with miette diagnostics.
//!
//! Only startup failures reach here; steady-state errors are logged by the
//! engine and never end the process.

use miette::Diagnostic;
use thiserror::Error;

use nexa_config::ConfigError;
use nexa_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(nexa::config),
        help(
            "Check the config file (--config) and NEXA_* environment variables.\n\
             Run with --print-config to see the effective configuration."
        )
    )]
    Config(#[from] ConfigError),

    // ── Growatt ──────────────────────────────────────────────────────
    #[error("Growatt login failed: {message}")]
    #[diagnostic(
        code(nexa::auth_failed),
        help("Verify growatt.username and growatt.password (or growatt.password_env).")
    )]
    AuthFailed { message: String },

    #[error("No devices available: {message}")]
    #[diagnostic(
        code(nexa::no_devices),
        help("The account must own at least one plant with a NOAH/NEXA device.")
    )]
    NoDevices { message: String },

    #[error("Could not reach Growatt: {message}")]
    #[diagnostic(
        code(nexa::connection_failed),
        help("Check network access and growatt.server_url_* in the config.")
    )]
    ConnectionFailed { message: String },

    #[error(transparent)]
    #[diagnostic(code(nexa::core))]
    Core(CoreError),
}

impl BridgeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_code::USAGE,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NoDevices { .. } => exit_code::NOT_FOUND,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Core(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → BridgeError mapping ──────────────────────────────────

impl From<CoreError> for BridgeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Authentication { message } => Self::AuthFailed { message },
            CoreError::Enumeration { message } => Self::NoDevices { message },
            CoreError::Transport { message } => Self::ConnectionFailed { message },
            CoreError::Config { message } => Self::Config(ConfigError::Validation {
                field: "growatt".into(),
                reason: message,
            }),
            other => Self::Core(other),
        }
    }
}
