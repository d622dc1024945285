//! Typed endpoints of the herd service, on top of the `Gateway`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::gateway::{ApiRequest, Gateway};
use super::ApiError;
use crate::models::{
    Brand, CatalogEntry, Cow, CowDisease, CowDraft, CowPatch, CowVaccination, NewCowDisease,
    NewCowVaccination,
};
use crate::owners::BrandSource;

pub const LOGIN_ENDPOINT: &str = "/usuarios/login";
pub const BRANDS_ENDPOINT: &str = "/marca";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewCatalogEntry<'a> {
    nombre: &'a str,
}

/// Exchange credentials for a bearer token.
///
/// Always sent once: a failed login must not trigger another login.
pub async fn request_token(gateway: &Gateway, username: &str, password: &str) -> Result<String> {
    let request = ApiRequest::post(LOGIN_ENDPOINT, &LoginRequest { username, password })?;
    let response: LoginResponse = gateway.send_once(&request).await?;
    response
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Login response did not include a token"))
}

/// Client for the herd service REST API.
/// Clone is cheap; every clone shares one gateway and its token.
#[derive(Clone)]
pub struct ApiClient {
    gateway: Arc<Gateway>,
}

impl ApiClient {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        request_token(&self.gateway, username, password).await
    }

    // ------------------------------------------------------------------
    // Cows
    // ------------------------------------------------------------------

    pub async fn fetch_cows(&self) -> Result<Vec<Cow>> {
        let cows: Vec<Cow> = self
            .gateway
            .get("/vacas/")
            .await
            .context("Failed to fetch cows")?;
        debug!(count = cows.len(), "Cows fetched");
        Ok(cows)
    }

    pub async fn fetch_cow(&self, id: i64) -> Result<Cow> {
        self.gateway
            .get(&format!("/vacas/{}", id))
            .await
            .with_context(|| format!("Failed to fetch cow {}", id))
    }

    pub async fn create_cow(&self, draft: &CowDraft) -> Result<Cow> {
        self.gateway
            .post("/vacas", draft)
            .await
            .context("Failed to register cow")
    }

    pub async fn update_cow(&self, id: i64, patch: &CowPatch) -> Result<Cow> {
        self.gateway
            .put(&format!("/vacas/{}", id), patch)
            .await
            .with_context(|| format!("Failed to update cow {}", id))
    }

    // ------------------------------------------------------------------
    // Brands
    // ------------------------------------------------------------------

    pub async fn fetch_brands(&self) -> Result<Vec<Brand>> {
        self.gateway
            .get(BRANDS_ENDPOINT)
            .await
            .context("Failed to fetch brands")
    }

    pub async fn fetch_brand(&self, id: i64) -> Result<Brand> {
        self.gateway
            .get(&format!("{}/{}", BRANDS_ENDPOINT, id))
            .await
            .with_context(|| format!("Failed to fetch brand {}", id))
    }

    // ------------------------------------------------------------------
    // Diseases
    // ------------------------------------------------------------------

    pub async fn fetch_cow_diseases(&self, cow_id: i64) -> Result<Vec<CowDisease>> {
        self.gateway
            .get(&format!("/vacasEnfermedades/{}", cow_id))
            .await
            .with_context(|| format!("Failed to fetch diseases of cow {}", cow_id))
    }

    pub async fn add_cow_disease(&self, cow_id: i64, disease: &NewCowDisease) -> Result<()> {
        let _: Value = self
            .gateway
            .post(&format!("/vacasEnfermedades/{}", cow_id), disease)
            .await
            .with_context(|| format!("Failed to add disease to cow {}", cow_id))?;
        Ok(())
    }

    pub async fn update_cow_disease(&self, id: i64, disease: &CowDisease) -> Result<()> {
        let _: Value = self
            .gateway
            .put(&format!("/vacasEnfermedades/{}", id), disease)
            .await
            .with_context(|| format!("Failed to update disease record {}", id))?;
        Ok(())
    }

    /// Delete disease records concurrently; an empty list sends nothing.
    pub async fn delete_cow_diseases(&self, ids: &[i64]) -> Result<()> {
        self.delete_all("/vacasEnfermedades", ids)
            .await
            .context("Failed to delete diseases")
    }

    pub async fn fetch_disease_catalog(&self) -> Result<Vec<CatalogEntry>> {
        self.gateway
            .get("/enfermedades")
            .await
            .context("Failed to fetch disease catalog")
    }

    pub async fn create_catalog_disease(&self, name: &str) -> Result<CatalogEntry> {
        self.gateway
            .post("/enfermedades", &NewCatalogEntry { nombre: name })
            .await
            .context("Failed to create disease")
    }

    // ------------------------------------------------------------------
    // Vaccinations
    // ------------------------------------------------------------------

    pub async fn fetch_cow_vaccinations(&self, cow_id: i64) -> Result<Vec<CowVaccination>> {
        self.gateway
            .get(&format!("/vacasVacunas/{}", cow_id))
            .await
            .with_context(|| format!("Failed to fetch vaccinations of cow {}", cow_id))
    }

    pub async fn add_cow_vaccination(&self, cow_id: i64, vaccination: &NewCowVaccination) -> Result<()> {
        let _: Value = self
            .gateway
            .post(&format!("/vacasVacunas/{}", cow_id), vaccination)
            .await
            .with_context(|| format!("Failed to add vaccination to cow {}", cow_id))?;
        Ok(())
    }

    pub async fn update_cow_vaccination(&self, id: i64, vaccination: &CowVaccination) -> Result<()> {
        let _: Value = self
            .gateway
            .put(&format!("/vacasVacunas/{}", id), vaccination)
            .await
            .with_context(|| format!("Failed to update vaccination record {}", id))?;
        Ok(())
    }

    /// Delete vaccination records concurrently; an empty list sends nothing.
    pub async fn delete_cow_vaccinations(&self, ids: &[i64]) -> Result<()> {
        self.delete_all("/vacasVacunas", ids)
            .await
            .context("Failed to delete vaccinations")
    }

    pub async fn fetch_vaccine_catalog(&self) -> Result<Vec<CatalogEntry>> {
        self.gateway
            .get("/vacunas")
            .await
            .context("Failed to fetch vaccine catalog")
    }

    pub async fn create_catalog_vaccine(&self, name: &str) -> Result<CatalogEntry> {
        self.gateway
            .post("/vacunas", &NewCatalogEntry { nombre: name })
            .await
            .context("Failed to create vaccine")
    }

    /// Issue every DELETE at once and wait for all of them; the first
    /// failure (in ID order) is returned.
    async fn delete_all(&self, prefix: &str, ids: &[i64]) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }

        let deletes = ids.iter().map(|id| {
            let endpoint = format!("{}/{}", prefix, id);
            async move { self.gateway.delete::<Value>(&endpoint).await }
        });

        let results = join_all(deletes).await;
        debug!(prefix, count = ids.len(), "Bulk delete finished");
        results.into_iter().try_for_each(|r| r.map(|_| ()))
    }
}

#[async_trait]
impl BrandSource for ApiClient {
    async fn fetch_brand(&self, id: i64) -> Result<Brand> {
        ApiClient::fetch_brand(self, id).await
    }

    async fn fetch_all_brands(&self) -> Result<Vec<Brand>> {
        self.fetch_brands().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ApiClient {
        let gateway = Gateway::new(server.base_url(), Arc::new(LocalStore::in_memory())).unwrap();
        ApiClient::new(Arc::new(gateway))
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/usuarios/login")
                    .json_body(json!({"username": "ana", "password": "secreta"}));
                then.status(200).json_body(json!({"token": "t0k3n"}));
            })
            .await;

        let token = client(&server).login("ana", "secreta").await.unwrap();
        mock.assert_async().await;
        assert_eq!(token, "t0k3n");
    }

    #[tokio::test]
    async fn test_login_without_token_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/usuarios/login");
                then.status(200).json_body(json!({}));
            })
            .await;

        assert!(client(&server).login("ana", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_cows() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/vacas/");
                then.status(200).json_body(json!([
                    {"id": 1, "marca_herrar_id": 3, "rancho_id": 1, "no_arete": 100, "nombre": "Lola"},
                    {"id": 2, "marca_herrar_id": 4, "rancho_id": 1, "no_arete": 101}
                ]));
            })
            .await;

        let cows = client(&server).fetch_cows().await.unwrap();
        assert_eq!(cows.len(), 2);
        assert_eq!(cows[0].name.as_deref(), Some("Lola"));
        assert_eq!(cows[1].brand_id, 4);
    }

    #[tokio::test]
    async fn test_http_error_keeps_api_error_in_chain() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/vacas/8");
                then.status(404).json_body(json!({"message": "Vaca no encontrada"}));
            })
            .await;

        let err = client(&server).fetch_cow(8).await.unwrap_err();
        let api_err = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_err.status(), Some(404));
        assert_eq!(api_err.to_string(), "Vaca no encontrada");
    }

    #[tokio::test]
    async fn test_add_vaccination_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/vacasVacunas/7").json_body(json!({
                    "vacuna_id": 2,
                    "fecha_aplicacion": "2024-03-01",
                    "fecha_vencimiento": "2025-03-01"
                }));
                then.status(201);
            })
            .await;

        let vaccination = NewCowVaccination {
            vaccine_id: 2,
            applied_on: "2024-03-01".to_string(),
            expires_on: Some("2025-03-01".to_string()),
            notes: None,
        };
        client(&server).add_cow_vaccination(7, &vaccination).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bulk_delete_hits_every_id() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/vacasEnfermedades/1");
                then.status(200).json_body(json!({"ok": true}));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/vacasEnfermedades/2");
                then.status(200).json_body(json!({"ok": true}));
            })
            .await;

        client(&server).delete_cow_diseases(&[1, 2]).await.unwrap();
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_bulk_delete_reports_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/vacasVacunas/1");
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/vacasVacunas/2");
                then.status(500).json_body(json!({"message": "Fallo"}));
            })
            .await;

        let err = client(&server).delete_cow_vaccinations(&[1, 2]).await.unwrap_err();
        assert_eq!(err.root_cause().to_string(), "Fallo");
    }

    #[tokio::test]
    async fn test_bulk_delete_empty_list_sends_nothing() {
        // No server at all: any request would fail.
        let gateway = Gateway::new("http://127.0.0.1:9", Arc::new(LocalStore::in_memory())).unwrap();
        let client = ApiClient::new(Arc::new(gateway));
        client.delete_cow_diseases(&[]).await.unwrap();
        client.delete_cow_vaccinations(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_catalog_create() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/vacunas").json_body(json!({"nombre": "Rabia"}));
                then.status(201).json_body(json!({"id": 9, "nombre": "Rabia"}));
            })
            .await;

        let entry = client(&server).create_catalog_vaccine("Rabia").await.unwrap();
        assert_eq!(entry, CatalogEntry { id: 9, name: "Rabia".to_string() });
    }

    #[tokio::test]
    async fn test_fetch_catalogs() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/enfermedades");
                then.status(200).json_body(json!([
                    {"id": 1, "nombre": "Mastitis"},
                    {"id": 2, "nombre": "Brucelosis"}
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/vacunas");
                then.status(200).json_body(json!([{"id": 9, "nombre": "Rabia"}]));
            })
            .await;

        let client = client(&server);
        let diseases = client.fetch_disease_catalog().await.unwrap();
        let vaccines = client.fetch_vaccine_catalog().await.unwrap();

        assert_eq!(diseases.len(), 2);
        assert_eq!(diseases[1].name, "Brucelosis");
        assert_eq!(vaccines, vec![CatalogEntry { id: 9, name: "Rabia".to_string() }]);
    }

    #[tokio::test]
    async fn test_catalog_create_disease_error_has_context() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/enfermedades").json_body(json!({"nombre": "Mastitis"}));
                then.status(409).json_body(json!({"message": "La enfermedad ya existe"}));
            })
            .await;

        let err = client(&server)
            .create_catalog_disease("Mastitis")
            .await
            .unwrap_err();
        create.assert_calls_async(1).await;
        assert_eq!(
            format!("{:#}", err),
            "Failed to create disease: La enfermedad ya existe"
        );
    }
}
