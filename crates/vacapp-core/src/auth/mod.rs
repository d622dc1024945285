//! Authentication: login, the session user and what that user may do.
//!
//! This module provides:
//! - `AuthService`: login/logout against the herd service, session state
//!   kept in the local store
//! - `StoredCredentialsRefresher`: the gateway's token renewal stage
//! - `SessionUser`, `TokenClaims`: the normalized user and the raw claims
//! - `Role`, `Permission`: the role-based permission table

pub mod permissions;
pub mod service;
pub mod session;

pub use permissions::{Permission, Role};
pub use service::{AuthService, StoredCredentialsRefresher, USER_KEY};
pub use session::{SessionUser, TokenClaims};
