use std::fmt;

use serde::{Deserialize, Serialize};

use super::OneOrMany;
use crate::utils::parse_date;

/// A disease recorded against a cow.
///
/// Bulk registrations come back with list-valued `enfermedad_id`,
/// `nombre_enfermedad` and `estado`, hence `OneOrMany`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CowDisease {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "vaca_id")]
    pub cow_id: i64,
    #[serde(rename = "enfermedad_id")]
    pub disease_id: OneOrMany<i64>,
    #[serde(rename = "nombre_enfermedad")]
    pub disease_name: OneOrMany<String>,
    #[serde(rename = "estado")]
    pub state: OneOrMany<String>,
    #[serde(rename = "fecha_diagnostico", default, skip_serializing_if = "Option::is_none")]
    pub diagnosed_on: Option<String>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CowDisease {
    /// ID used when filtering; records without one count as 0.
    pub fn record_id(&self) -> i64 {
        self.id.unwrap_or(0)
    }

    pub fn disease_state(&self) -> DiseaseState {
        match self.state.single() {
            Some(state) => DiseaseState::from_wire(state),
            None => DiseaseState::Other(String::new()),
        }
    }

    /// Diagnosis time in milliseconds, 0 when missing or unparseable.
    pub fn diagnosed_millis(&self) -> i64 {
        self.diagnosed_on
            .as_deref()
            .and_then(parse_date)
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0)
    }

    pub fn names(&self) -> String {
        self.disease_name
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Body for attaching a catalog disease to a cow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCowDisease {
    #[serde(rename = "enfermedad_id")]
    pub disease_id: i64,
    #[serde(rename = "estado", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "observaciones", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiseaseState {
    Active,
    Cured,
    Chronic,
    InTreatment,
    Other(String),
}

impl DiseaseState {
    pub fn from_wire(state: &str) -> Self {
        match state {
            "activa" => DiseaseState::Active,
            "curada" => DiseaseState::Cured,
            "cronica" => DiseaseState::Chronic,
            "en_tratamiento" => DiseaseState::InTreatment,
            other => DiseaseState::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DiseaseState::Active => "Active",
            DiseaseState::Cured => "Cured",
            DiseaseState::Chronic => "Chronic",
            DiseaseState::InTreatment => "In treatment",
            DiseaseState::Other(raw) if raw.is_empty() => "Unknown",
            DiseaseState::Other(raw) => raw,
        }
    }
}

/// Health indicator derived from a cow's disease history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Sick,
    UnderObservation,
    Unknown,
}

impl HealthStatus {
    /// The most recently diagnosed disease decides. Chronic conditions are
    /// stable and count as healthy.
    pub fn from_diseases(diseases: &[CowDisease]) -> Self {
        // min_by_key keeps the first of equal keys, matching list order on ties
        let newest = diseases
            .iter()
            .min_by_key(|d| std::cmp::Reverse(d.diagnosed_millis()));

        match newest.map(CowDisease::disease_state) {
            None => HealthStatus::Healthy,
            Some(DiseaseState::Active) => HealthStatus::Sick,
            Some(DiseaseState::Cured) | Some(DiseaseState::Chronic) => HealthStatus::Healthy,
            Some(DiseaseState::InTreatment) => HealthStatus::UnderObservation,
            Some(DiseaseState::Other(_)) => HealthStatus::Unknown,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Sick => write!(f, "Sick"),
            HealthStatus::UnderObservation => write!(f, "Under observation"),
            HealthStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disease(id: i64, state: &str, diagnosed_on: Option<&str>) -> CowDisease {
        CowDisease {
            id: Some(id),
            cow_id: 7,
            disease_id: OneOrMany::One(1),
            disease_name: OneOrMany::One("Mastitis".into()),
            state: OneOrMany::One(state.into()),
            diagnosed_on: diagnosed_on.map(String::from),
            notes: None,
        }
    }

    #[test]
    fn test_parse_bulk_disease() {
        let json = r#"{"id": 4, "vaca_id": 7, "enfermedad_id": [1, 2],
            "nombre_enfermedad": ["Mastitis", "Fiebre"], "estado": ["activa", "activa"]}"#;
        let d: CowDisease = serde_json::from_str(json).unwrap();

        assert_eq!(d.names(), "Mastitis, Fiebre");
        // A list of states does not resolve to a single state
        assert_eq!(d.disease_state(), DiseaseState::Other(String::new()));
    }

    #[test]
    fn test_record_id_defaults_to_zero() {
        let mut d = disease(1, "activa", None);
        d.id = None;
        assert_eq!(d.record_id(), 0);
    }

    #[test]
    fn test_health_no_diseases_is_healthy() {
        assert_eq!(HealthStatus::from_diseases(&[]), HealthStatus::Healthy);
    }

    #[test]
    fn test_health_newest_diagnosis_decides() {
        let diseases = vec![
            disease(1, "activa", Some("2024-01-10")),
            disease(2, "curada", Some("2024-05-01")),
        ];
        assert_eq!(HealthStatus::from_diseases(&diseases), HealthStatus::Healthy);

        let diseases = vec![
            disease(1, "curada", Some("2024-01-10")),
            disease(2, "en_tratamiento", Some("2024-05-01T08:00:00.000Z")),
        ];
        assert_eq!(
            HealthStatus::from_diseases(&diseases),
            HealthStatus::UnderObservation
        );
    }

    #[test]
    fn test_health_chronic_counts_as_healthy() {
        let diseases = vec![disease(1, "cronica", Some("2024-01-10"))];
        assert_eq!(HealthStatus::from_diseases(&diseases), HealthStatus::Healthy);
    }

    #[test]
    fn test_health_undated_disease_is_oldest() {
        let diseases = vec![
            disease(1, "activa", None),
            disease(2, "curada", Some("2020-01-01")),
        ];
        assert_eq!(HealthStatus::from_diseases(&diseases), HealthStatus::Healthy);
    }

    #[test]
    fn test_health_unknown_state() {
        let diseases = vec![disease(1, "sospechosa", Some("2024-01-10"))];
        assert_eq!(HealthStatus::from_diseases(&diseases), HealthStatus::Unknown);
        assert_eq!(diseases[0].disease_state().label(), "sospechosa");
    }

    #[test]
    fn test_health_sick() {
        let diseases = vec![disease(1, "activa", Some("2024-01-10"))];
        assert_eq!(HealthStatus::from_diseases(&diseases), HealthStatus::Sick);
        assert_eq!(HealthStatus::Sick.to_string(), "Sick");
    }
}
