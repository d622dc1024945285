use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Cow, CowDisease, CowVaccination, HealthStatus};
use crate::utils::format_age_minutes;

/// Everything the front end shows for one cow, as cached locally.
///
/// Serialized with the same keys the records have always been persisted
/// with, so existing store documents keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CowRecord {
    #[serde(rename = "vaca")]
    pub cow: Cow,
    #[serde(rename = "enfermedades", default)]
    pub diseases: Vec<CowDisease>,
    #[serde(rename = "propietario", default)]
    pub owner: String,
    #[serde(rename = "vacunas", default)]
    pub vaccinations: Vec<CowVaccination>,
    /// When the data was fetched from the API, milliseconds since the epoch.
    #[serde(rename = "apiTimestamp", default, skip_serializing_if = "Option::is_none")]
    pub api_timestamp: Option<i64>,
}

/// Which collection of a record `remove_sub_items` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCollection {
    Diseases,
    Vaccinations,
}

impl CowRecord {
    pub fn id(&self) -> i64 {
        self.cow.id
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::from_diseases(&self.diseases)
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.api_timestamp.and_then(DateTime::from_timestamp_millis)
    }

    pub fn age_minutes(&self) -> Option<i64> {
        self.fetched_at().map(|at| (Utc::now() - at).num_minutes())
    }

    pub fn age_display(&self) -> String {
        match self.age_minutes() {
            Some(minutes) => format_age_minutes(minutes),
            None => "never".to_string(),
        }
    }

    /// Drop the items of `collection` whose IDs are in `ids`.
    pub(crate) fn without(&self, ids: &[i64], collection: SubCollection) -> Self {
        let mut next = self.clone();
        match collection {
            SubCollection::Diseases => next.diseases.retain(|d| !ids.contains(&d.record_id())),
            SubCollection::Vaccinations => next.vaccinations.retain(|v| !ids.contains(&v.id)),
        }
        next
    }
}
