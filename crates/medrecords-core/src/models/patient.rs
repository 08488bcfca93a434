//! Patient profile models.

use serde::{Deserialize, Serialize};

use super::PatientId;

/// Name shown when the backend has none.
pub const UNKNOWN_PATIENT_NAME: &str = "غير معروف";

/// Patient profile shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInfo {
    /// Patient code from the route
    pub id: PatientId,
    /// Display name
    pub name: String,
    /// Age in years (0 when unknown)
    pub age: u32,
    /// Phone number
    pub phone: Option<String>,
    /// Address
    pub address: String,
    /// Blood type, when recorded
    pub blood_type: Option<String>,
}

/// Patient profile as the API sends it (`GET /api/patient/info/{id}`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfoWire {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub blood_type: Option<String>,
}

impl PatientInfo {
    /// Build the profile for `id` from the wire payload, applying display fallbacks.
    pub fn from_wire(id: PatientId, wire: PatientInfoWire) -> Self {
        Self {
            id,
            name: wire
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_PATIENT_NAME.to_string()),
            age: wire.age.unwrap_or(0),
            phone: wire.phone_number,
            address: wire.address.unwrap_or_default(),
            blood_type: wire.blood_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire() {
        let wire: PatientInfoWire = serde_json::from_str(
            r#"{"name": "أحمد", "age": 42, "phoneNumber": "0100", "address": "القاهرة"}"#,
        )
        .unwrap();
        let info = PatientInfo::from_wire("PDG6U51W".into(), wire);
        assert_eq!(info.name, "أحمد");
        assert_eq!(info.age, 42);
        assert_eq!(info.phone.as_deref(), Some("0100"));
        assert_eq!(info.id.as_str(), "PDG6U51W");
    }

    #[test]
    fn test_from_wire_fallbacks() {
        let info = PatientInfo::from_wire("P1".into(), PatientInfoWire::default());
        assert_eq!(info.name, UNKNOWN_PATIENT_NAME);
        assert_eq!(info.age, 0);
        assert_eq!(info.address, "");
        assert!(info.phone.is_none());
    }
}
