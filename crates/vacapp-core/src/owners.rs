//! Brand owner lookup on top of the cow cache.
//!
//! Owner labels are decoration: a cow card must render even when its brand
//! cannot be fetched, so `resolve_owner_label` never fails. It returns an
//! `OwnerLabel` instead, and callers that care can tell a real owner from
//! the placeholder.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::CowCache;
use crate::models::Brand;

/// Label shown when a brand's owner is unknown.
pub const FALLBACK_OWNER_LABEL: &str = "Propietario no disponible";

/// Where brands come from on a cache miss.
#[async_trait]
pub trait BrandSource: Send + Sync {
    async fn fetch_brand(&self, id: i64) -> Result<Brand>;
    async fn fetch_all_brands(&self) -> Result<Vec<Brand>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerLabel {
    Resolved(String),
    /// The brand could not be fetched or has no owner.
    Fallback,
}

impl OwnerLabel {
    fn for_brand(brand: Option<&Brand>) -> Self {
        match brand.and_then(Brand::owner_label) {
            Some(owner) => OwnerLabel::Resolved(owner.to_string()),
            None => OwnerLabel::Fallback,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OwnerLabel::Resolved(owner) => owner,
            OwnerLabel::Fallback => FALLBACK_OWNER_LABEL,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, OwnerLabel::Resolved(_))
    }
}

impl fmt::Display for OwnerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OwnerLabel> for String {
    fn from(label: OwnerLabel) -> Self {
        label.as_str().to_string()
    }
}

/// Read-through brand lookup: the cache first, then the `BrandSource`.
#[derive(Clone)]
pub struct OwnerResolver {
    cache: Arc<CowCache>,
    source: Arc<dyn BrandSource>,
}

impl OwnerResolver {
    pub fn new(cache: Arc<CowCache>, source: Arc<dyn BrandSource>) -> Self {
        Self { cache, source }
    }

    /// The brand for `id`, fetched and cached on a miss. `None` if the
    /// fetch fails.
    pub async fn resolve_brand(&self, id: i64) -> Option<Brand> {
        if let Some(brand) = self.cache.get_brand(id) {
            return Some(brand);
        }

        match self.source.fetch_brand(id).await {
            Ok(brand) => {
                debug!(brand_id = id, "Brand fetched");
                self.cache.set_brand(brand.clone());
                Some(brand)
            }
            Err(e) => {
                warn!(brand_id = id, error = %e, "Failed to fetch brand");
                None
            }
        }
    }

    pub async fn resolve_owner_label(&self, brand_id: i64) -> OwnerLabel {
        OwnerLabel::for_brand(self.resolve_brand(brand_id).await.as_ref())
    }

    /// Every brand cached so far. No network.
    pub fn all_owners(&self) -> Vec<Brand> {
        self.cache.all_brands()
    }

    /// Fetch every brand and cache it.
    pub async fn preload_all(&self) -> Result<usize> {
        let brands = self.source.fetch_all_brands().await?;
        let count = brands.len();
        for brand in brands {
            self.cache.set_brand(brand);
        }
        debug!(count, "Brands preloaded");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSource {
        brands: HashMap<i64, Brand>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn with(brands: &[Brand]) -> Arc<Self> {
            Arc::new(Self {
                brands: brands.iter().map(|b| (b.id, b.clone())).collect(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BrandSource for FakeSource {
        async fn fetch_brand(&self, id: i64) -> Result<Brand> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.brands
                .get(&id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Error 404"))
        }

        async fn fetch_all_brands(&self) -> Result<Vec<Brand>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.brands.is_empty() {
                anyhow::bail!("Error 500");
            }
            let mut all: Vec<Brand> = self.brands.values().cloned().collect();
            all.sort_by_key(|b| b.id);
            Ok(all)
        }
    }

    fn brand(id: i64, owner: &str) -> Brand {
        Brand {
            id,
            owner: owner.to_string(),
            user_id: None,
            ranch_id: None,
        }
    }

    fn resolver(source: Arc<FakeSource>) -> (OwnerResolver, Arc<CowCache>) {
        let cache = Arc::new(CowCache::new(Arc::new(LocalStore::in_memory())));
        (OwnerResolver::new(cache.clone(), source), cache)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let source = FakeSource::with(&[brand(3, "Luis")]);
        let (resolver, cache) = resolver(source.clone());

        let label = resolver.resolve_owner_label(3).await;
        assert_eq!(label, OwnerLabel::Resolved("Luis".to_string()));
        assert!(cache.has_brand(3));

        // Second lookup is served from the cache.
        assert_eq!(resolver.resolve_owner_label(3).await.as_str(), "Luis");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_yields_fallback() {
        let source = FakeSource::with(&[]);
        let (resolver, cache) = resolver(source);

        let label = resolver.resolve_owner_label(3).await;
        assert_eq!(label, OwnerLabel::Fallback);
        assert_eq!(label.as_str(), "Propietario no disponible");
        assert!(!label.is_resolved());
        assert!(!cache.has_brand(3));
        assert_eq!(resolver.resolve_brand(3).await, None);
    }

    #[tokio::test]
    async fn test_empty_owner_yields_fallback() {
        let (resolver, _) = resolver(FakeSource::with(&[brand(4, "")]));
        assert_eq!(resolver.resolve_owner_label(4).await, OwnerLabel::Fallback);
    }

    #[tokio::test]
    async fn test_cached_brand_skips_source() {
        let source = FakeSource::with(&[]);
        let (resolver, cache) = resolver(source.clone());
        cache.set_brand(brand(8, "María"));

        assert_eq!(resolver.resolve_owner_label(8).await.to_string(), "María");
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_preload_and_all_owners() {
        let source = FakeSource::with(&[brand(2, "B"), brand(1, "A")]);
        let (resolver, _) = resolver(source);
        assert!(resolver.all_owners().is_empty());

        assert_eq!(resolver.preload_all().await.unwrap(), 2);
        let ids: Vec<i64> = resolver.all_owners().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_preload_propagates_errors() {
        let (resolver, _) = resolver(FakeSource::with(&[]));
        assert!(resolver.preload_all().await.is_err());
    }
}
