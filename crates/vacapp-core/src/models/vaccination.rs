use serde::{Deserialize, Serialize};

/// A vaccine applied to a cow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CowVaccination {
    pub id: i64,
    #[serde(rename = "vaca_id")]
    pub cow_id: i64,
    #[serde(rename = "vacuna_id")]
    pub vaccine_id: i64,
    #[serde(rename = "fecha_aplicacion")]
    pub applied_on: String,
    #[serde(rename = "fecha_vencimiento", default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<String>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "nombre_vacuna", default)]
    pub vaccine_name: String,
}

/// Body for recording a catalog vaccine on a cow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCowVaccination {
    #[serde(rename = "vacuna_id")]
    pub vaccine_id: i64,
    #[serde(rename = "fecha_aplicacion")]
    pub applied_on: String,
    #[serde(rename = "fecha_vencimiento", skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<String>,
    #[serde(rename = "observaciones", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vaccination() {
        let json = r#"{"id": 11, "vaca_id": 7, "vacuna_id": 2,
            "fecha_aplicacion": "2024-02-01", "fecha_vencimiento": null,
            "nombre_vacuna": "Clostridial"}"#;
        let v: CowVaccination = serde_json::from_str(json).unwrap();

        assert_eq!(v.id, 11);
        assert_eq!(v.vaccine_name, "Clostridial");
        assert!(v.expires_on.is_none());
    }

    #[test]
    fn test_new_vaccination_wire_names() {
        let body = NewCowVaccination {
            vaccine_id: 2,
            applied_on: "2024-02-01".into(),
            expires_on: Some("2025-02-01".into()),
            notes: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "vacuna_id": 2,
                "fecha_aplicacion": "2024-02-01",
                "fecha_vencimiento": "2025-02-01"
            })
        );

        let without_expiry = NewCowVaccination {
            expires_on: None,
            notes: Some("refuerzo".into()),
            ..body
        };
        assert_eq!(
            serde_json::to_value(&without_expiry).unwrap(),
            serde_json::json!({
                "vacuna_id": 2,
                "fecha_aplicacion": "2024-02-01",
                "observaciones": "refuerzo"
            })
        );
    }
}
