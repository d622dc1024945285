use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::permissions::Permission;
use super::session::{SessionUser, TokenClaims};
use crate::api::client::{request_token, BRANDS_ENDPOINT};
use crate::api::gateway::{ApiRequest, AUTH_TOKEN_KEY};
use crate::api::{Gateway, TokenRefresher};
use crate::models::Brand;
use crate::store::LocalStore;

/// Store path of the logged-in user.
pub const USER_KEY: &str = "user";

const USERNAME_KEY: &str = "user.username";
const PASSWORD_KEY: &str = "user.password";

/// Ranch name recorded for users that own a brand.
const OWNER_RANCH_NAME: &str = "Rancho Principal";

/// Log in through `gateway` and record the session in its store.
///
/// Both calls go out once; a rejected login never triggers a renewal.
async fn login_with(gateway: &Gateway, username: &str, password: &str) -> Result<SessionUser> {
    let token = request_token(gateway, username, password).await?;
    let claims = TokenClaims::decode(&token)?;
    let user_id = claims.user_id();

    let store = gateway.store();
    gateway.set_token(token);
    store.set(USER_KEY, Value::Object(claims.into_user()));
    store.set(USERNAME_KEY, json!(username));
    store.set(PASSWORD_KEY, json!(password));

    match gateway
        .send_once::<Vec<Brand>>(&ApiRequest::get(BRANDS_ENDPOINT))
        .await
    {
        Ok(brands) if !brands.is_empty() => {
            let owned = brands
                .iter()
                .find(|b| b.user_id.is_some() && b.user_id == user_id);
            if let Some(brand) = owned {
                store.set("user.propietario", json!(brand.owner));
            }
            store.set("user.rancho_nombre", json!(OWNER_RANCH_NAME));
        }
        Ok(_) => debug!("No brands found for the new session"),
        Err(e) => warn!(error = %e, "Failed to fetch brands after login"),
    }

    info!(username, "Logged in");
    session_user(store).ok_or_else(|| anyhow::anyhow!("Session user missing after login"))
}

fn session_user(store: &LocalStore) -> Option<SessionUser> {
    store
        .get(USER_KEY)
        .and_then(|value| SessionUser::from_stored(&value))
}

fn stored_credentials(store: &LocalStore) -> Option<(String, String)> {
    let username = store.get_as::<String>(USERNAME_KEY).filter(|u| !u.is_empty())?;
    let password = store.get_as::<String>(PASSWORD_KEY).filter(|p| !p.is_empty())?;
    Some((username, password))
}

/// Login, logout and the current session user.
#[derive(Clone)]
pub struct AuthService {
    gateway: Arc<Gateway>,
}

impl AuthService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser> {
        login_with(&self.gateway, username, password).await
    }

    pub fn logout(&self) {
        self.gateway.clear_token();
        self.gateway.store().remove(USER_KEY);
        info!("Logged out");
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        session_user(self.gateway.store())
    }

    pub fn is_authenticated(&self) -> bool {
        let store = self.gateway.store();
        let present = |key: &str| store.get(key).is_some_and(|v| !v.is_null());
        present(AUTH_TOKEN_KEY) && present(USER_KEY)
    }

    /// Claims of the current bearer token, `None` when logged out or when
    /// the token cannot be decoded.
    pub fn token_claims(&self) -> Option<TokenClaims> {
        let token = self.gateway.token()?;
        match TokenClaims::decode(&token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!(error = %e, "Stored token is not readable");
                None
            }
        }
    }

    /// No user means no permissions at all.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.current_user()
            .map(|u| u.has_permission(permission))
            .unwrap_or(false)
    }
}

/// Renews the token by logging in again with the credentials saved at login.
pub struct StoredCredentialsRefresher;

#[async_trait]
impl TokenRefresher for StoredCredentialsRefresher {
    async fn refresh(&self, gateway: &Gateway) -> Result<bool> {
        let Some((username, password)) = stored_credentials(gateway.store()) else {
            return Ok(false);
        };

        info!(username = %username, "Renewing token with stored credentials");
        login_with(gateway, &username, &password).await?;
        Ok(true)
    }
}
