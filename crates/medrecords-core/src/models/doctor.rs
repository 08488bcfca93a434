//! Doctor models returned by the patient's doctor autocomplete.

use serde::{Deserialize, Serialize};

use super::ServerId;

/// A doctor known to the backend for a given patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DoctorWire")]
pub struct Doctor {
    pub id: ServerId,
    pub name: String,
    /// Free text from the backend; may differ orthographically from the catalog
    pub specialty_name: String,
}

impl Doctor {
    pub fn new(id: impl Into<ServerId>, name: impl Into<String>, specialty_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            specialty_name: specialty_name.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DoctorWire {
    id: ServerId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    specialty_name: Option<String>,
}

impl From<DoctorWire> for Doctor {
    fn from(wire: DoctorWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name.unwrap_or_default(),
            specialty_name: wire.specialty_name.unwrap_or_default(),
        }
    }
}
