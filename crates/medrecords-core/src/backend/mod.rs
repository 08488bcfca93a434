//! Backend collaborator contract.
//!
//! One trait covers the patient profile, the doctor autocomplete and the three
//! record kinds; the kind is a parameter because the endpoints are identical
//! in shape. `medrecords-http` implements it over the REST API and
//! [`MemoryBackend`] implements it in memory for tests and demos.

mod memory;

pub use memory::*;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::attachments::LocalFile;
use crate::models::{Doctor, PatientId, PatientInfo, Record, RecordKind, ServerId};

/// Backend errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Server returned {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    #[error("Not found: {}", message.as_deref().unwrap_or(target.as_str()))]
    NotFound { target: String, message: Option<String> },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl BackendError {
    /// `NotFound` without a server message.
    pub fn not_found(target: impl Into<String>) -> Self {
        BackendError::NotFound {
            target: target.into(),
            message: None,
        }
    }

    /// Message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Status { message, .. } | BackendError::NotFound { message, .. } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Keyword/date filter for record searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub keyword: Option<String>,
    pub date: Option<NaiveDate>,
}

impl SearchFilter {
    /// Build a filter; blank keywords count as absent.
    pub fn new(keyword: Option<&str>, date: Option<NaiveDate>) -> Self {
        let keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        Self { keyword, date }
    }

    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && self.date.is_none()
    }

    /// The `date` query parameter (`yyyy-MM-dd`).
    pub fn date_param(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// Multipart change-set for create/update.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPayload {
    /// `name`
    pub name: String,
    /// `doctorName`
    pub doctor_name: String,
    /// `note`
    pub note: String,
    /// `specialtyId`
    pub specialty_id: u32,
    /// Repeated `files`
    pub files: Vec<LocalFile>,
    /// Repeated `imagesToDelete` (update only)
    pub images_to_delete: Vec<String>,
}

impl RecordPayload {
    /// Text parts in wire order, repeated fields expanded.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("doctorName", self.doctor_name.clone()),
            ("note", self.note.clone()),
            ("specialtyId", self.specialty_id.to_string()),
        ];
        fields.extend(
            self.images_to_delete
                .iter()
                .map(|reference| ("imagesToDelete", reference.clone())),
        );
        fields
    }
}

/// The REST backend, seen from the client.
#[async_trait]
pub trait RecordsBackend: Send + Sync {
    /// `getPatientInfo`
    async fn patient_info(&self, patient_id: &PatientId) -> BackendResult<PatientInfo>;

    /// `getAll<Kind>`
    async fn list_records(&self, kind: RecordKind, patient_id: &PatientId) -> BackendResult<Vec<Record>>;

    /// `search<Kind>`
    async fn search_records(
        &self,
        kind: RecordKind,
        patient_id: &PatientId,
        filter: &SearchFilter,
    ) -> BackendResult<Vec<Record>>;

    /// `get<Kind>ById`, full detail including attachment references
    async fn get_record(&self, kind: RecordKind, id: &ServerId) -> BackendResult<Record>;

    /// `create<Kind>`
    async fn create_record(
        &self,
        kind: RecordKind,
        patient_id: &PatientId,
        payload: RecordPayload,
    ) -> BackendResult<Record>;

    /// `update<Kind>`
    async fn update_record(
        &self,
        kind: RecordKind,
        id: &ServerId,
        payload: RecordPayload,
    ) -> BackendResult<Record>;

    /// `delete<Kind>`
    async fn delete_record(&self, kind: RecordKind, id: &ServerId) -> BackendResult<()>;

    /// `getDoctorsForPatient`
    async fn doctors_for_patient(
        &self,
        patient_id: &PatientId,
        query: Option<&str>,
    ) -> BackendResult<Vec<Doctor>>;

    /// Raw bytes of a resolved attachment URL.
    async fn fetch_attachment(&self, url: &str) -> BackendResult<Vec<u8>>;
}
