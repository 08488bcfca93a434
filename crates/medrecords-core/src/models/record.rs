//! Medical record models shared by analyses, scans and prescriptions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ServerId;

/// The three parallel record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Lab analyses (التحاليل)
    Analysis,
    /// Imaging scans (الأشعة)
    Scan,
    /// Prescriptions (الروشتات)
    Prescription,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Analysis,
        RecordKind::Scan,
        RecordKind::Prescription,
    ];

    /// Path segment used by the REST API (`/api/{segment}/...`).
    pub fn api_segment(&self) -> &'static str {
        match self {
            RecordKind::Analysis => "analysis",
            RecordKind::Scan => "scan",
            RecordKind::Prescription => "prescription",
        }
    }

    /// Path segment used by the client routes (`/{patientId}/{segment}`).
    pub fn route_segment(&self) -> &'static str {
        match self {
            RecordKind::Analysis => "analysis",
            RecordKind::Scan => "scans",
            RecordKind::Prescription => "prescriptions",
        }
    }

    pub fn from_route_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.route_segment() == segment)
    }

    /// Singular Arabic label, used when naming downloaded files.
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Analysis => "تحليل",
            RecordKind::Scan => "أشعة",
            RecordKind::Prescription => "روشتة",
        }
    }

    /// Definite singular, as in "فشل في تحميل بيانات التحليل".
    pub fn definite_label(&self) -> &'static str {
        match self {
            RecordKind::Analysis => "التحليل",
            RecordKind::Scan => "الأشعة",
            RecordKind::Prescription => "الروشتة",
        }
    }

    /// Definite plural, as in "فشل في تحميل قائمة التحاليل".
    pub fn collection_label(&self) -> &'static str {
        match self {
            RecordKind::Analysis => "التحاليل",
            RecordKind::Scan => "الأشعة",
            RecordKind::Prescription => "الروشتات",
        }
    }
}

/// A single analysis, scan or prescription belonging to a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecordWire")]
pub struct Record {
    /// Server id - absent until the first successful create
    pub id: Option<ServerId>,
    /// Record title (`name` on the wire)
    pub title: String,
    /// Free-text doctor name
    pub doctor_name: String,
    /// Specialty as sent by the server (may differ from the catalog spelling)
    pub specialty: String,
    /// Optional notes (`note` on the wire)
    pub notes: String,
    /// Creation timestamp, server-assigned
    pub created_at: Option<String>,
    /// Last update timestamp, absent until the first edit
    pub updated_at: Option<String>,
    /// Attachment references in display order (`fileUrls` on the wire)
    pub attachments: Vec<String>,
}

impl Record {
    /// Check if the server has assigned an id.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Check if the record has been edited since creation.
    pub fn is_edited(&self) -> bool {
        self.updated_at.is_some()
    }

    /// Creation time, if present and parseable.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Calendar day of creation.
    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_at_utc().map(|dt| dt.date_naive())
    }
}

/// Parse a server timestamp.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC) or a
/// bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Record as the API sends it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordWire {
    #[serde(default)]
    id: Option<ServerId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    doctor_name: Option<String>,
    #[serde(default)]
    doctor_specialty: Option<String>,
    #[serde(default)]
    specialty_name: Option<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    file_urls: Option<serde_json::Value>,
}

impl From<RecordWire> for Record {
    fn from(wire: RecordWire) -> Self {
        let attachments = match wire.file_urls {
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        let specialty = wire
            .doctor_specialty
            .filter(|s| !s.is_empty())
            .or(wire.specialty_name)
            .unwrap_or_default();

        Record {
            id: wire.id,
            title: wire.name.unwrap_or_default(),
            doctor_name: wire.doctor_name.unwrap_or_default(),
            specialty,
            notes: wire.note.unwrap_or_default(),
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            attachments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wire_record() {
        let json = r#"{
            "id": 12,
            "name": "CBC",
            "doctorName": "Dr A",
            "doctorSpecialty": "باطنه",
            "note": "fasting",
            "createdAt": "2024-03-01T09:30:00",
            "fileUrls": ["a.jpg", "https://cdn.example.com/b.jpg"]
        }"#;

        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, Some(ServerId::from("12")));
        assert_eq!(record.title, "CBC");
        assert_eq!(record.specialty, "باطنه");
        assert_eq!(record.notes, "fasting");
        assert_eq!(record.attachments.len(), 2);
        assert!(!record.is_edited());
    }

    #[test]
    fn test_specialty_name_fallback() {
        let json = r#"{"id": 1, "specialtyName": "قلب"}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.specialty, "قلب");
        assert_eq!(record.title, "");
    }

    #[test]
    fn test_non_array_file_urls_decode_empty() {
        let json = r#"{"id": 1, "fileUrls": null}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert!(record.attachments.is_empty());

        let json = r#"{"id": 1, "fileUrls": "a.jpg"}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert!(record.attachments.is_empty());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01T09:30:00Z").is_some());
        assert!(parse_timestamp("2024-03-01T09:30:00.123").is_some());
        assert!(parse_timestamp("2024-03-01T09:30:00").is_some());
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());

        let a = parse_timestamp("2024-03-01T09:30:00").unwrap();
        let b = parse_timestamp("2024-03-01T09:30:00Z").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_route_segments_round_trip() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_route_segment(kind.route_segment()), Some(kind));
        }
        assert_eq!(RecordKind::from_route_segment("scan"), None);
    }
}
