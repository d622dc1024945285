//! Read-through herd flows used by front ends.
//!
//! Every flow checks the `CowCache` first and only goes to the network on a
//! miss (or when asked to refresh). Related fetches for one cow are issued
//! together and awaited jointly.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::cache::{CowCache, CowRecord};
use crate::models::{
    Cow, CowDisease, CowDraft, CowPatch, CowVaccination, NewCowDisease, NewCowVaccination,
};
use crate::owners::{OwnerLabel, OwnerResolver};

/// The cow list shown on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub cows: Vec<Cow>,
    /// When the list came from the API, milliseconds since the epoch.
    pub fetched_at: Option<i64>,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct Herd {
    api: ApiClient,
    cache: Arc<CowCache>,
    owners: OwnerResolver,
}

impl Herd {
    pub fn new(api: ApiClient, cache: Arc<CowCache>) -> Self {
        let owners = OwnerResolver::new(cache.clone(), Arc::new(api.clone()));
        Self { api, cache, owners }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &Arc<CowCache> {
        &self.cache
    }

    pub fn owners(&self) -> &OwnerResolver {
        &self.owners
    }

    // ===== Dashboard =====

    /// Fetch every cow and every brand, caching the brands.
    pub async fn load_dashboard(&self) -> Result<Dashboard> {
        let (cows, brands) = tokio::try_join!(self.api.fetch_cows(), self.owners.preload_all())?;
        info!(cows = cows.len(), brands, "Dashboard loaded");

        Ok(Dashboard {
            cows,
            fetched_at: Some(now_millis()),
        })
    }

    /// The dashboard as cached, with the newest API timestamp among the
    /// cached records. `None` when no cow is cached.
    pub fn cached_dashboard(&self) -> Option<Dashboard> {
        let records = self.cache.cached_cows();
        if records.is_empty() {
            return None;
        }

        Some(Dashboard {
            fetched_at: self.cache.latest_api_timestamp(),
            cows: records.into_iter().map(|r| r.cow).collect(),
        })
    }

    /// Cached dashboard if there is one; otherwise fetch. When brands are
    /// already cached only the cows are fetched.
    pub async fn dashboard(&self) -> Result<Dashboard> {
        if let Some(dashboard) = self.cached_dashboard() {
            debug!(cows = dashboard.cows.len(), "Dashboard served from cache");
            return Ok(dashboard);
        }

        if self.owners.all_owners().is_empty() {
            return self.load_dashboard().await;
        }

        let cows = self.api.fetch_cows().await?;
        Ok(Dashboard {
            cows,
            fetched_at: Some(now_millis()),
        })
    }

    /// Drop the given cows and every brand from the cache, then reload.
    pub async fn refresh(&self, cow_ids: &[i64]) -> Result<Dashboard> {
        for id in cow_ids {
            self.cache.clear_cow(*id);
        }
        self.cache.clear_all_brands();
        debug!(cleared = cow_ids.len(), "Cache cleared for refresh");

        self.load_dashboard().await
    }

    // ===== Single cow =====

    /// Everything a cow card shows, from the cache or fetched and cached.
    pub async fn cow_card(&self, cow: &Cow) -> Result<CowRecord> {
        if let Some(record) = self.cache.get_cow(cow.id) {
            return Ok(record);
        }

        let (diseases, vaccinations, owner) = tokio::join!(
            self.api.fetch_cow_diseases(cow.id),
            self.api.fetch_cow_vaccinations(cow.id),
            self.owners.resolve_owner_label(cow.brand_id),
        );

        Ok(self.cache.set_cow(
            cow.clone(),
            diseases?,
            owner,
            vaccinations?,
            Some(now_millis()),
        ))
    }

    /// Full details of one cow. `force_refresh` skips the cache.
    pub async fn cow_details(&self, id: i64, force_refresh: bool) -> Result<CowRecord> {
        if !force_refresh {
            if let Some(record) = self.cache.get_cow(id) {
                return Ok(record);
            }
        }

        let (cow, diseases, vaccinations) = tokio::try_join!(
            self.api.fetch_cow(id),
            self.api.fetch_cow_diseases(id),
            self.api.fetch_cow_vaccinations(id),
        )?;
        let owner = self.owners.resolve_owner_label(cow.brand_id).await;

        Ok(self
            .cache
            .set_cow(cow, diseases, owner, vaccinations, Some(now_millis())))
    }

    // ===== Mutations =====

    /// Register a cow. It is cached right away with empty history and the
    /// placeholder owner until the next full load.
    pub async fn register_cow(&self, draft: &CowDraft) -> Result<CowRecord> {
        let cow = self.api.create_cow(draft).await?;
        info!(cow_id = cow.id, "Cow registered");

        Ok(self.cache.set_cow(
            cow,
            Vec::new(),
            OwnerLabel::Fallback,
            Vec::new(),
            Some(now_millis()),
        ))
    }

    /// Update a cow and drop its cached record so the next read refetches.
    pub async fn update_cow(&self, id: i64, patch: &CowPatch) -> Result<Cow> {
        let cow = self.api.update_cow(id, patch).await?;
        self.cache.clear_cow(id);
        Ok(cow)
    }

    pub async fn add_disease(&self, cow_id: i64, disease: &NewCowDisease) -> Result<()> {
        self.api.add_cow_disease(cow_id, disease).await?;
        self.cache.clear_cow(cow_id);
        Ok(())
    }

    pub async fn add_vaccination(&self, cow_id: i64, vaccination: &NewCowVaccination) -> Result<()> {
        self.api.add_cow_vaccination(cow_id, vaccination).await?;
        self.cache.clear_cow(cow_id);
        Ok(())
    }

    /// Update one disease record and patch it into the cached cow.
    ///
    /// Records without an ID are rejected before any request is made.
    pub async fn update_disease(&self, disease: &CowDisease) -> Result<()> {
        let Some(id) = disease.id else {
            bail!("La enfermedad no tiene un ID válido");
        };
        self.api.update_cow_disease(id, disease).await?;

        if let Some(mut record) = self.cache.get_cow(disease.cow_id) {
            for d in record.diseases.iter_mut().filter(|d| d.id == Some(id)) {
                *d = disease.clone();
            }
            record.api_timestamp = Some(now_millis());
            self.cache.put_record(record);
        }
        Ok(())
    }

    /// Update one vaccination record and patch it into the cached cow.
    pub async fn update_vaccination(&self, vaccination: &CowVaccination) -> Result<()> {
        self.api
            .update_cow_vaccination(vaccination.id, vaccination)
            .await?;

        if let Some(mut record) = self.cache.get_cow(vaccination.cow_id) {
            for v in record.vaccinations.iter_mut().filter(|v| v.id == vaccination.id) {
                *v = vaccination.clone();
            }
            record.api_timestamp = Some(now_millis());
            self.cache.put_record(record);
        }
        Ok(())
    }

    /// Delete disease records of a cow, then drop them from its cached record.
    pub async fn delete_diseases(&self, cow_id: i64, ids: &[i64]) -> Result<Option<CowRecord>> {
        self.api.delete_cow_diseases(ids).await?;
        info!(cow_id, count = ids.len(), "Diseases deleted");
        Ok(self.cache.remove_diseases(cow_id, ids))
    }

    /// Delete vaccination records of a cow, then drop them from its cached record.
    pub async fn delete_vaccinations(&self, cow_id: i64, ids: &[i64]) -> Result<Option<CowRecord>> {
        self.api.delete_cow_vaccinations(ids).await?;
        info!(cow_id, count = ids.len(), "Vaccinations deleted");
        Ok(self.cache.remove_vaccinations(cow_id, ids))
    }
}
