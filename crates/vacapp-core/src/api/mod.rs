//! REST API access for the herd service.
//!
//! `Gateway` sends every request, owns the bearer token and renews it
//! through an injected `TokenRefresher` when the server rejects it.
//! `ApiClient` exposes the typed endpoints on top of it.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::ApiClient;
pub use error::ApiError;
pub use gateway::{ApiRequest, Gateway, TokenRefresher};
