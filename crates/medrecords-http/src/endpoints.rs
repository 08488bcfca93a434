//! REST endpoint paths.

use medrecords_core::backend::SearchFilter;
use medrecords_core::models::{PatientId, RecordKind, ServerId};

/// URL builder rooted at the API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// `GET /api/patient/info/{patientId}`
    pub fn patient_info(&self, patient_id: &PatientId) -> String {
        self.api(&format!("patient/info/{patient_id}"))
    }

    /// `GET /api/doctors/patients/{patientId}/all`
    pub fn doctors(&self, patient_id: &PatientId) -> String {
        self.api(&format!("doctors/patients/{patient_id}/all"))
    }

    /// `GET /api/{kind}/patient/{patientId}`, also `POST` for create
    pub fn patient_records(&self, kind: RecordKind, patient_id: &PatientId) -> String {
        self.api(&format!("{}/patient/{patient_id}", kind.api_segment()))
    }

    /// `GET /api/{kind}/patient/{patientId}/search`
    pub fn search(&self, kind: RecordKind, patient_id: &PatientId) -> String {
        self.api(&format!("{}/patient/{patient_id}/search", kind.api_segment()))
    }

    /// `GET /api/{kind}/{id}`, also `PUT` for update
    pub fn record(&self, kind: RecordKind, id: &ServerId) -> String {
        self.api(&format!("{}/{id}", kind.api_segment()))
    }

    /// `DELETE /api/{kind}/delete/{id}`
    pub fn delete(&self, kind: RecordKind, id: &ServerId) -> String {
        self.api(&format!("{}/delete/{id}", kind.api_segment()))
    }
}

/// Query parameters for a search; absent filters are omitted.
pub fn search_query(filter: &SearchFilter) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(keyword) = &filter.keyword {
        query.push(("keyword", keyword.clone()));
    }
    if let Some(date) = filter.date_param() {
        query.push(("date", date));
    }
    query
}

/// Query parameters for the doctor autocomplete; sent only for a non-empty query.
pub fn doctors_query(query: Option<&str>) -> Vec<(&'static str, String)> {
    match query.filter(|q| !q.is_empty()) {
        Some(q) => vec![("query", q.to_string())],
        None => Vec::new(),
    }
}
