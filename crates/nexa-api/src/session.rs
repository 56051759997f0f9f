// Session-resilient request wrapper.
//
// Every data call goes through `SessionClient::request`. When the server
// answers with its login signature the client runs the provider's login
// sequence once and retries the original request exactly once. Re-login is
// serialized behind an async gate and a session epoch, so concurrent callers
// that all saw the same expired session trigger a single login.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::transport::{FormTransport, TransportConfig};

/// Authentication state of a [`SessionClient`].
///
/// Cookie-only sessions (web API) are `Authenticated` with no bearer token.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated { token: Option<SecretString> },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    fn token(&self) -> Option<SecretString> {
        match self {
            Self::Authenticated { token } => token.clone(),
            _ => None,
        }
    }
}

/// A provider's login sequence.
///
/// Implementations talk to the raw transport directly, never through the
/// session wrapper, so a login can never recurse into another login.
/// Returns the bearer token to attach to subsequent requests, if any.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, transport: &FormTransport) -> Result<Option<SecretString>, Error>;
}

#[derive(Debug, Default)]
struct Session {
    state: SessionState,
    /// Bumped on every successful login.
    epoch: u64,
}

/// Form-POST client with transparent one-shot re-authentication.
pub struct SessionClient {
    transport: FormTransport,
    auth: Box<dyn Authenticator>,
    session: Mutex<Session>,
    login_gate: Mutex<()>,
}

impl SessionClient {
    pub fn new(transport: &TransportConfig, auth: Box<dyn Authenticator>) -> Result<Self, Error> {
        Ok(Self {
            transport: FormTransport::new(transport)?,
            auth,
            session: Mutex::new(Session::default()),
            login_gate: Mutex::new(()),
        })
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state.clone()
    }

    /// Log in unconditionally, replacing any current session.
    pub async fn login(&self) -> Result<(), Error> {
        let _gate = self.login_gate.lock().await;
        self.run_login().await
    }

    /// POST `form` to `url` and decode the JSON response.
    ///
    /// A client that holds no session logs in before the first attempt.
    /// On a session-expired response: re-authenticate, then retry exactly
    /// once. The retry's outcome is returned as-is. Any other error is
    /// returned immediately without a login attempt.
    pub async fn request<T: DeserializeOwned>(
        &self,
        url: Url,
        form: &[(&'static str, String)],
    ) -> Result<T, Error> {
        let (mut token, mut epoch, authenticated) = self.snapshot().await;
        if !authenticated {
            debug!(url = %url, "no session yet, logging in first");
            self.reauthenticate(epoch).await?;
            (token, epoch, _) = self.snapshot().await;
        }

        match self.transport.post_form(url.clone(), token.as_ref(), form).await {
            Err(e) if e.is_session_expired() => {
                warn!(url = %url, "session expired, re-authenticating");
                self.reauthenticate(epoch).await?;
                let (token, _, _) = self.snapshot().await;
                self.transport.post_form(url, token.as_ref(), form).await
            }
            other => other,
        }
    }

    /// Current token, epoch and whether a login has succeeded.
    async fn snapshot(&self) -> (Option<SecretString>, u64, bool) {
        let session = self.session.lock().await;
        (
            session.state.token(),
            session.epoch,
            session.state.is_authenticated(),
        )
    }

    /// Log in unless somebody else already did since `seen_epoch`.
    async fn reauthenticate(&self, seen_epoch: u64) -> Result<(), Error> {
        let _gate = self.login_gate.lock().await;
        if self.session.lock().await.epoch != seen_epoch {
            debug!("session refreshed by a concurrent caller");
            return Ok(());
        }
        self.run_login().await
    }

    /// Caller must hold `login_gate`.
    async fn run_login(&self) -> Result<(), Error> {
        self.session.lock().await.state = SessionState::Authenticating;

        let outcome = self.auth.login(&self.transport).await;

        let mut session = self.session.lock().await;
        match outcome {
            Ok(token) => {
                session.state = SessionState::Authenticated { token };
                session.epoch += 1;
                info!(epoch = session.epoch, "logged in");
                Ok(())
            }
            Err(e) => {
                session.state = SessionState::Anonymous;
                warn!(error = %e, "login failed");
                Err(match e {
                    Error::Authentication { .. } => e,
                    other => Error::Authentication {
                        message: other.to_string(),
                    },
                })
            }
        }
    }
}
