// nexa-api: Async clients for the Growatt cloud APIs (ShinePhone app + web portal)
//
// Both APIs speak form-encoded POSTs and answer with JSON. Session handling
// (login, expiry detection, one-shot re-login) lives in `session`; the two
// endpoint surfaces live in `app` and `web`.

pub mod app;
mod de;
pub mod error;
pub mod session;
pub mod transport;
pub mod web;

pub use app::AppClient;
pub use error::Error;
pub use session::{Authenticator, SessionClient, SessionState};
pub use transport::{FormTransport, TransportConfig};
pub use web::WebClient;
