use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::parse_date;

const MS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;
const DAYS_PER_YEAR: f64 = 365.25;
const DAYS_PER_MONTH: f64 = 30.44;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cow {
    pub id: i64,
    #[serde(rename = "marca_herrar_id")]
    pub brand_id: i64,
    #[serde(rename = "rancho_id")]
    pub ranch_id: i64,
    #[serde(rename = "no_arete")]
    pub ear_tag: i64,
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "fecha_nacimiento", default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "pariciones", default, skip_serializing_if = "Option::is_none")]
    pub calvings: Option<i32>,
    #[serde(rename = "ultima_paricion", default, skip_serializing_if = "Option::is_none")]
    pub last_calving: Option<String>,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Cow {
    /// Name if set, otherwise the ear tag.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => name.to_string(),
            None => format!("#{}", self.ear_tag),
        }
    }

    pub fn age_display(&self) -> Option<String> {
        self.birth_date
            .as_deref()
            .map(|date| age_between(date, Utc::now()))
    }
}

/// Years and months from `birth_date` to `now`, e.g. "2 years and 3 months".
pub fn age_between(birth_date: &str, now: DateTime<Utc>) -> String {
    let Some(born) = parse_date(birth_date) else {
        return "invalid date".to_string();
    };
    if born > now {
        return "future date".to_string();
    }

    let elapsed_ms = (now - born).num_milliseconds() as f64;
    let year_ms = DAYS_PER_YEAR * MS_PER_DAY;
    let years = (elapsed_ms / year_ms).floor() as i64;
    let months = ((elapsed_ms % year_ms) / (DAYS_PER_MONTH * MS_PER_DAY)).floor() as i64;

    let plural = |n: i64, one: &str, many: &str| {
        if n == 1 {
            format!("{} {}", n, one)
        } else {
            format!("{} {}", n, many)
        }
    };

    if years == 0 {
        plural(months, "month", "months")
    } else if months == 0 {
        plural(years, "year", "years")
    } else {
        format!("{} and {}", plural(years, "year", "years"), plural(months, "month", "months"))
    }
}

/// Body for registering a new cow; the server assigns the ID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CowDraft {
    #[serde(rename = "marca_herrar_id")]
    pub brand_id: i64,
    #[serde(rename = "rancho_id")]
    pub ranch_id: i64,
    #[serde(rename = "no_arete")]
    pub ear_tag: i64,
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "fecha_nacimiento", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CowPatch {
    #[serde(rename = "marca_herrar_id", skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<i64>,
    #[serde(rename = "no_arete", skip_serializing_if = "Option::is_none")]
    pub ear_tag: Option<i64>,
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "fecha_nacimiento", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "pariciones", skip_serializing_if = "Option::is_none")]
    pub calvings: Option<i32>,
    #[serde(rename = "ultima_paricion", skip_serializing_if = "Option::is_none")]
    pub last_calving: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
