//! A pre-configured HTTP client bound to a single backend origin, which ends
//! the local session whenever the backend rejects it.

pub mod api;
pub mod config;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use config::ClientConfig;
