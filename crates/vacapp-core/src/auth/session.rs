use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::permissions::{Permission, Role};

/// Username shown when the stored user has none.
const DEFAULT_USERNAME: &str = "Usuario";

/// Ranch name shown when the stored user has none.
const DEFAULT_RANCH: &str = "Rancho";

/// The claim set of a bearer token, read without verifying the signature.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    claims: Map<String, Value>,
}

impl TokenClaims {
    /// Decode the payload segment of a JWT.
    pub fn decode(token: &str) -> Result<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Token is not a JWT"))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .context("Token payload is not valid base64")?;

        let claims: Map<String, Value> =
            serde_json::from_slice(&bytes).context("Token payload is not a JSON object")?;

        Ok(Self { claims })
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.claims
            .get(key)
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("exp")
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("iat")
    }

    /// Tokens without an `exp` claim never expire client-side.
    pub fn is_expired(&self) -> bool {
        self.expires_at().map(|exp| Utc::now() >= exp).unwrap_or(false)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.claims.get("id").and_then(Value::as_i64)
    }

    /// The user data carried by the token, without `exp` and `iat`.
    pub fn into_user(mut self) -> Map<String, Value> {
        self.claims.remove("exp");
        self.claims.remove("iat");
        self.claims
    }
}

/// The logged-in user as front ends see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Option<i64>,
    pub username: String,
    #[serde(rename = "rol")]
    pub role: Option<String>,
    #[serde(rename = "rancho_nombre")]
    pub ranch_name: String,
    #[serde(rename = "propietario", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl SessionUser {
    /// Normalize the stored `user` object. Anything but an object is no user.
    pub fn from_stored(value: &Value) -> Option<Self> {
        let user = value.as_object()?;
        let text = |key: &str| {
            user.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            id: user.get("id").and_then(Value::as_i64),
            username: text("username")
                .or_else(|| text("nombre_usuario"))
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            role: text("rol"),
            ranch_name: text("rancho_nombre").unwrap_or_else(|| DEFAULT_RANCH.to_string()),
            owner: text("propietario"),
        })
    }

    pub fn role(&self) -> Role {
        Role::from_wire(self.role.as_deref())
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Administrator
    }

    pub fn is_rancher(&self) -> bool {
        self.role() == Role::Rancher
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role().allows(permission)
    }
}
