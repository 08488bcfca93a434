//! `RecordsBackend` over the REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};

use medrecords_core::backend::{BackendError, BackendResult, RecordPayload, RecordsBackend, SearchFilter};
use medrecords_core::config::{ClientConfig, APP_NAME, APP_VERSION};
use medrecords_core::models::{Doctor, PatientId, PatientInfo, Record, RecordKind, ServerId, SpecialtyCatalog};

use crate::decode::{self, DecodeError};
use crate::endpoints::{doctors_query, search_query, Endpoints};

/// REST client for the records API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    endpoints: Endpoints,
    catalog: SpecialtyCatalog,
    timeout_secs: u64,
}

impl HttpBackend {
    /// Build a client for `config.api_base_url`.
    pub fn new(config: &ClientConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(format!("{APP_NAME}/{APP_VERSION}"))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoints: Endpoints::new(&config.api_base_url),
            catalog: SpecialtyCatalog::standard(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::Transport(format!("Cannot connect to {}", self.endpoints.base_url()))
        } else if e.is_timeout() {
            BackendError::Transport(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            BackendError::Transport(e.to_string())
        }
    }

    /// Send and turn non-success statuses into errors.
    async fn checked(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = decode::error_message(&body);
        tracing::debug!(%url, status = status.as_u16(), ?message, "request failed");
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound {
                target: url,
                message,
            });
        }
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn text(&self, request: RequestBuilder) -> BackendResult<String> {
        self.checked(request)
            .await?
            .text()
            .await
            .map_err(|e| self.transport_error(e))
    }

    fn specialty_name(&self, specialty_id: u32) -> String {
        self.catalog
            .entries()
            .iter()
            .find(|e| e.id == specialty_id)
            .map(|e| e.name.clone())
            .unwrap_or_default()
    }

    /// Multipart body: text fields in wire order, then one `files` part per file.
    fn multipart(payload: RecordPayload) -> BackendResult<Form> {
        let mut form = Form::new();
        for (name, value) in payload.text_fields() {
            form = form.text(name, value);
        }
        for file in payload.files {
            let part = Part::bytes(file.bytes().to_vec())
                .file_name(file.file_name().to_string())
                .mime_str(file.content_type())
                .map_err(|e| {
                    BackendError::Transport(format!("Invalid content type for {}: {}", file.file_name(), e))
                })?;
            form = form.part("files", part);
        }
        Ok(form)
    }
}

fn decoded<T>(result: Result<T, DecodeError>) -> BackendResult<T> {
    result.map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl RecordsBackend for HttpBackend {
    async fn patient_info(&self, patient_id: &PatientId) -> BackendResult<PatientInfo> {
        let body = self
            .text(self.client.get(self.endpoints.patient_info(patient_id)))
            .await?;
        decoded(decode::parse_patient_info(patient_id, &body))
    }

    async fn list_records(&self, kind: RecordKind, patient_id: &PatientId) -> BackendResult<Vec<Record>> {
        let body = self
            .text(self.client.get(self.endpoints.patient_records(kind, patient_id)))
            .await?;
        decoded(decode::parse_records(&body))
    }

    async fn search_records(
        &self,
        kind: RecordKind,
        patient_id: &PatientId,
        filter: &SearchFilter,
    ) -> BackendResult<Vec<Record>> {
        let request = self
            .client
            .get(self.endpoints.search(kind, patient_id))
            .query(&search_query(filter));
        let body = self.text(request).await?;
        decoded(decode::parse_records(&body))
    }

    async fn get_record(&self, kind: RecordKind, id: &ServerId) -> BackendResult<Record> {
        let body = self.text(self.client.get(self.endpoints.record(kind, id))).await?;
        decoded(decode::parse_record(&body))
    }

    async fn create_record(
        &self,
        kind: RecordKind,
        patient_id: &PatientId,
        payload: RecordPayload,
    ) -> BackendResult<Record> {
        let sent = decode::record_from_payload(&payload, None, self.specialty_name(payload.specialty_id));
        let form = Self::multipart(payload)?;
        let request = self
            .client
            .post(self.endpoints.patient_records(kind, patient_id))
            .multipart(form);
        let body = self.text(request).await?;
        tracing::info!(kind = kind.api_segment(), patient = %patient_id, "record created");
        Ok(decode::parse_saved_record(&body, sent))
    }

    async fn update_record(
        &self,
        kind: RecordKind,
        id: &ServerId,
        payload: RecordPayload,
    ) -> BackendResult<Record> {
        let sent = decode::record_from_payload(
            &payload,
            Some(id.clone()),
            self.specialty_name(payload.specialty_id),
        );
        let form = Self::multipart(payload)?;
        let request = self.client.put(self.endpoints.record(kind, id)).multipart(form);
        let body = self.text(request).await?;
        tracing::info!(kind = kind.api_segment(), %id, "record updated");
        Ok(decode::parse_saved_record(&body, sent))
    }

    async fn delete_record(&self, kind: RecordKind, id: &ServerId) -> BackendResult<()> {
        self.checked(self.client.delete(self.endpoints.delete(kind, id)))
            .await?;
        tracing::info!(kind = kind.api_segment(), %id, "record deleted");
        Ok(())
    }

    async fn doctors_for_patient(
        &self,
        patient_id: &PatientId,
        query: Option<&str>,
    ) -> BackendResult<Vec<Doctor>> {
        let request = self
            .client
            .get(self.endpoints.doctors(patient_id))
            .query(&doctors_query(query));
        let body = self.text(request).await?;
        decoded(decode::parse_doctors(&body))
    }

    async fn fetch_attachment(&self, url: &str) -> BackendResult<Vec<u8>> {
        let bytes = self
            .checked(self.client.get(url))
            .await?
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrecords_core::attachments::LocalFile;

    #[test]
    fn test_new_uses_config_base() {
        let backend = HttpBackend::new(&ClientConfig::new("https://records.test/")).unwrap();
        assert_eq!(backend.endpoints().base_url(), "https://records.test");
    }

    #[test]
    fn test_multipart_accepts_guessed_types() {
        let payload = RecordPayload {
            name: "CBC".into(),
            doctor_name: "Dr A".into(),
            note: String::new(),
            specialty_id: 1,
            files: vec![
                LocalFile::new("a.jpg", vec![1]),
                LocalFile::new("notes.bin", vec![2]),
            ],
            images_to_delete: vec!["old.jpg".into()],
        };
        assert!(HttpBackend::multipart(payload).is_ok());
    }

    #[test]
    fn test_specialty_name_lookup() {
        let backend = HttpBackend::new(&ClientConfig::default()).unwrap();
        assert_eq!(backend.specialty_name(3), "جراحة");
        assert_eq!(backend.specialty_name(999), "");
    }
}
