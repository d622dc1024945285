//! Data models for the herd service.
//!
//! Field names on the wire are the API's Spanish names; the Rust side uses
//! English names and maps them with serde renames.
//!
//! - `Cow`, `CowDraft`, `CowPatch`: cattle records
//! - `CowDisease`, `DiseaseState`, `HealthStatus`: disease history
//! - `CowVaccination`: applied vaccines
//! - `Brand`: branding mark with its owner label
//! - `CatalogEntry`: disease and vaccine catalog items

pub mod brand;
pub mod cow;
pub mod disease;
pub mod vaccination;

use serde::{Deserialize, Serialize};

pub use brand::Brand;
pub use cow::{Cow, CowDraft, CowPatch};
pub use disease::{CowDisease, DiseaseState, HealthStatus, NewCowDisease};
pub use vaccination::{CowVaccination, NewCowVaccination};

/// A field the API sends either as a single value or as a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// The value when exactly one was sent as a scalar.
    pub fn single(&self) -> Option<&T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(_) => None,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

/// An item of the disease or vaccine catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
}
