//! The single choke point for HTTP traffic to the herd service.
//!
//! `Gateway` owns the base URL and the bearer token, shapes every request
//! the same way and turns failed responses into `ApiError`s. Re-login on a
//! stale token is a separate stage: a `TokenRefresher` injected at
//! construction, tried at most once per request.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::ApiError;
use crate::store::LocalStore;

/// Store path the bearer token is mirrored to.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Obtains a fresh token after the server rejected the current one.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Returns `Ok(true)` when a new token was installed on `gateway`,
    /// `Ok(false)` when there is nothing to refresh with.
    async fn refresh(&self, gateway: &Gateway) -> anyhow::Result<bool>;
}

/// One request, ready to be sent (and replayed) as many times as needed.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    endpoint: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    pub fn post<B: Serialize + ?Sized>(endpoint: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        Self::new(Method::POST, endpoint).with_body(body)
    }

    pub fn put<B: Serialize + ?Sized>(endpoint: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        Self::new(Method::PUT, endpoint).with_body(body)
    }

    fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body).map_err(ApiError::Encode)?);
        Ok(self)
    }

    /// Add a query parameter. Only GET requests send them.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub struct Gateway {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
    store: Arc<LocalStore>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl Gateway {
    /// Create a gateway for `base_url`, picking up any token left in the store.
    pub fn new(base_url: impl Into<String>, store: Arc<LocalStore>) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        let token = store.get_as::<String>(AUTH_TOKEN_KEY);
        let base_url = base_url.into().trim_end_matches('/').to_string();

        debug!(base_url = %base_url, has_token = token.is_some(), "Gateway created");

        Ok(Self {
            client,
            base_url,
            token: RwLock::new(token),
            store,
            refresher: None,
        })
    }

    /// Install the stage that renews the token when the server rejects it.
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.store.set(AUTH_TOKEN_KEY, Value::String(token.clone()));
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear_token(&self) {
        self.store.remove(AUTH_TOKEN_KEY);
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.execute(&ApiRequest::get(endpoint)).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(&ApiRequest::post(endpoint, body)?).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(&ApiRequest::put(endpoint, body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.execute(&ApiRequest::delete(endpoint)).await
    }

    /// Send `request`; if the server says the token is no longer valid,
    /// renew it once through the refresher and replay the request once.
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        match self.send_once(request).await {
            Err(err) if err.is_token_invalid() => self.renew_and_replay(request, err).await,
            other => other,
        }
    }

    async fn renew_and_replay<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        original: ApiError,
    ) -> Result<T, ApiError> {
        let Some(refresher) = self.refresher.clone() else {
            return Err(original);
        };

        match refresher.refresh(self).await {
            Ok(true) => {
                info!(endpoint = %request.endpoint, "Token renewed, replaying request");
                self.send_once(request).await
            }
            Ok(false) => {
                warn!(endpoint = %request.endpoint, "Token rejected and no stored credentials to renew it");
                Err(original)
            }
            Err(e) => {
                warn!(endpoint = %request.endpoint, error = %e, "Token renewal failed");
                Err(original)
            }
        }
    }

    /// Send `request` exactly once, without the renewal stage.
    pub async fn send_once<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, request.endpoint);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = self.token() {
            builder = builder.bearer_auth(token);
        }

        if request.method == Method::GET {
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
        } else if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(method = %request.method, url = %url, status = %status, "Response received");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_token();
        }

        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "{} {}: {} (body: {})",
                request.method,
                request.endpoint,
                e,
                ApiError::truncate_body(text)
            ))
        })
    }
}
