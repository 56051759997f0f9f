// Growatt web portal API (openapi.growatt.com)

pub mod client;
pub mod models;

pub use client::{WebAuthenticator, WebClient};
