use serde::{Deserialize, Serialize};

/// A branding mark ("marca de herrar") and the owner it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    #[serde(rename = "propietario", default)]
    pub owner: String,
    #[serde(rename = "usuario_id", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(rename = "rancho_id", default, skip_serializing_if = "Option::is_none")]
    pub ranch_id: Option<i64>,
}

impl Brand {
    /// The owner label, `None` when the server sent an empty one.
    pub fn owner_label(&self) -> Option<&str> {
        Some(self.owner.as_str()).filter(|o| !o.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_brand() {
        let brand: Brand =
            serde_json::from_str(r#"{"id": 3, "propietario": "Luis Pérez", "usuario_id": 9}"#)
                .unwrap();
        assert_eq!(brand.owner_label(), Some("Luis Pérez"));
        assert_eq!(brand.user_id, Some(9));
        assert_eq!(brand.ranch_id, None);
    }

    #[test]
    fn test_blank_owner_has_no_label() {
        let brand: Brand = serde_json::from_str(r#"{"id": 3, "propietario": " "}"#).unwrap();
        assert_eq!(brand.owner_label(), None);
    }
}
