// ShinePhone app API (server-api.growatt.com)
//
// Bearer-token session, full read access, and the `nexa/set` parameter calls.

mod auth;
pub mod client;
pub mod models;

pub use auth::AppAuthenticator;
pub use client::AppClient;
