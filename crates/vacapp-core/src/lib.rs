//! Core library for VacApp.
//!
//! This crate holds everything a VacApp front end needs to talk to the herd
//! management service and to keep a local copy of what it has already seen:
//!
//! - `store`: the persisted JSON document behind every local cache
//! - `cache`: per-session cache of cow records and brands
//! - `owners`: brand owner resolution on top of the cache
//! - `api`: HTTP gateway, re-authentication stage and typed REST client
//! - `auth`: login, session user and permissions
//! - `herd`: the read-through flows front ends call

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod herd;
pub mod models;
pub mod owners;
pub mod store;
pub mod utils;

pub use api::{ApiClient, ApiError, Gateway};
pub use auth::{AuthService, SessionUser};
pub use cache::{CowCache, CowRecord};
pub use config::Config;
pub use herd::Herd;
pub use owners::{OwnerLabel, OwnerResolver};
pub use store::LocalStore;
