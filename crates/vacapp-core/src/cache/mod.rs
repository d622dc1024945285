//! Local caching of herd data.
//!
//! This module provides the `CowCache`, the per-session cache of cow
//! records and brands. Records stay valid until they are explicitly
//! cleared; there is no time-based expiry.
//!
//! Cached data types include:
//! - Cow records: the cow plus its diseases, vaccinations and owner label
//! - Brands: owner marks, keyed by ID

pub mod manager;
pub mod record;

pub use manager::CowCache;
pub use record::{CowRecord, SubCollection};
