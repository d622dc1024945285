use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::record::{CowRecord, SubCollection};
use crate::models::{Brand, Cow, CowDisease, CowVaccination};
use crate::store::{LocalStore, BRANDS_NAMESPACE, COWS_NAMESPACE};

/// Per-session cache of cow records and brands.
///
/// Reads come from memory; every mutation is written through to the
/// `LocalStore` so the next session starts warm. Construct one per session
/// and share it with `Arc`.
pub struct CowCache {
    store: Arc<LocalStore>,
    cows: RwLock<HashMap<i64, CowRecord>>,
    brands: RwLock<HashMap<i64, Brand>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl CowCache {
    /// Create the cache and hydrate it from everything already persisted.
    pub fn new(store: Arc<LocalStore>) -> Self {
        let cows: HashMap<i64, CowRecord> = store.entries(COWS_NAMESPACE).into_iter().collect();
        let brands: HashMap<i64, Brand> = store.entries(BRANDS_NAMESPACE).into_iter().collect();
        debug!(cows = cows.len(), brands = brands.len(), "Hydrated cache from local store");

        Self {
            store,
            cows: RwLock::new(cows),
            brands: RwLock::new(brands),
        }
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    // ===== Cows =====

    /// Insert or replace the record for `cow.id`.
    pub fn set_cow(
        &self,
        cow: Cow,
        diseases: Vec<CowDisease>,
        owner: impl Into<String>,
        vaccinations: Vec<CowVaccination>,
        api_timestamp: Option<i64>,
    ) -> CowRecord {
        let record = CowRecord {
            cow,
            diseases,
            owner: owner.into(),
            vaccinations,
            api_timestamp,
        };
        self.put_record(record.clone());
        record
    }

    pub fn put_record(&self, record: CowRecord) {
        let id = record.id();
        let mut cows = write(&self.cows);
        self.store.save_entry(COWS_NAMESPACE, id, &record);
        cows.insert(id, record);
    }

    /// Memory first, then the persisted copy, which is kept in memory once
    /// found.
    pub fn get_cow(&self, id: i64) -> Option<CowRecord> {
        if let Some(record) = read(&self.cows).get(&id) {
            return Some(record.clone());
        }

        let record: CowRecord = self.store.entry(COWS_NAMESPACE, id)?;
        debug!(cow_id = id, "Hydrated cow record from local store");
        write(&self.cows).insert(id, record.clone());
        Some(record)
    }

    /// In-memory check only; a record that exists only in the store and has
    /// not been read yet is reported as missing.
    pub fn has_cow(&self, id: i64) -> bool {
        read(&self.cows).contains_key(&id)
    }

    pub fn clear_cow(&self, id: i64) {
        let mut cows = write(&self.cows);
        cows.remove(&id);
        self.store.remove_entry(COWS_NAMESPACE, id);
    }

    pub fn clear_all_cows(&self) {
        let mut cows = write(&self.cows);
        cows.clear();
        self.store.clear_namespace(COWS_NAMESPACE);
    }

    /// Filter `ids` out of one collection of a cached record and write the
    /// result back. Unknown cows are left alone.
    pub fn remove_sub_items(
        &self,
        cow_id: i64,
        ids: &[i64],
        collection: SubCollection,
    ) -> Option<CowRecord> {
        let mut cows = write(&self.cows);
        let updated = cows.get(&cow_id)?.without(ids, collection);
        self.store.save_entry(COWS_NAMESPACE, cow_id, &updated);
        cows.insert(cow_id, updated.clone());
        debug!(cow_id, removed = ids.len(), ?collection, "Removed sub-items from cached record");
        Some(updated)
    }

    pub fn remove_diseases(&self, cow_id: i64, disease_ids: &[i64]) -> Option<CowRecord> {
        self.remove_sub_items(cow_id, disease_ids, SubCollection::Diseases)
    }

    pub fn remove_vaccinations(&self, cow_id: i64, vaccination_ids: &[i64]) -> Option<CowRecord> {
        self.remove_sub_items(cow_id, vaccination_ids, SubCollection::Vaccinations)
    }

    pub fn cached_cow_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = read(&self.cows).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Every record in memory, ordered by cow ID.
    pub fn cached_cows(&self) -> Vec<CowRecord> {
        let mut records: Vec<CowRecord> = read(&self.cows).values().cloned().collect();
        records.sort_by_key(CowRecord::id);
        records
    }

    pub fn latest_api_timestamp(&self) -> Option<i64> {
        read(&self.cows).values().filter_map(|r| r.api_timestamp).max()
    }

    // ===== Brands =====

    pub fn set_brand(&self, brand: Brand) {
        let mut brands = write(&self.brands);
        self.store.save_entry(BRANDS_NAMESPACE, brand.id, &brand);
        brands.insert(brand.id, brand);
    }

    pub fn get_brand(&self, id: i64) -> Option<Brand> {
        read(&self.brands).get(&id).cloned()
    }

    pub fn has_brand(&self, id: i64) -> bool {
        read(&self.brands).contains_key(&id)
    }

    pub fn clear_brand(&self, id: i64) {
        let mut brands = write(&self.brands);
        brands.remove(&id);
        self.store.remove_entry(BRANDS_NAMESPACE, id);
    }

    pub fn clear_all_brands(&self) {
        let mut brands = write(&self.brands);
        brands.clear();
        self.store.clear_namespace(BRANDS_NAMESPACE);
    }

    /// Every cached brand, ordered by ID. Brands never resolved or preloaded
    /// in this or an earlier session are not included.
    pub fn all_brands(&self) -> Vec<Brand> {
        let mut brands: Vec<Brand> = read(&self.brands).values().cloned().collect();
        brands.sort_by_key(|b| b.id);
        brands
    }
}

// ============================================================================
// Tests
// ============================================================================
