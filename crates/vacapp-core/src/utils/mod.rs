//! Utility functions for date parsing and display formatting.

pub mod format;

pub use format::{format_age_minutes, format_date, parse_date, truncate_string};
