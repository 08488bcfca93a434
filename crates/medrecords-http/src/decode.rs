//! Lenient decoding of API response bodies.
//!
//! The backend is not strict about shapes: collections may come back as
//! something other than an array, and create/update may answer with a record,
//! a wrapper, or nothing useful at all.

use serde::Deserialize;
use thiserror::Error;

use medrecords_core::backend::RecordPayload;
use medrecords_core::models::{Doctor, PatientId, PatientInfo, PatientInfoWire, Record, ServerId};

/// Decode errors.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// The `message` of an error body, if the body has one.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

/// Decode a JSON array of `T`, skipping elements that do not decode.
///
/// A body that is not an array yields an empty list.
fn parse_list<T>(body: &str, what: &str) -> DecodeResult<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let value: serde_json::Value = serde_json::from_str(body)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            tracing::debug!(what, kind = json_kind(&other), "expected an array, using empty list");
            return Ok(Vec::new());
        }
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if parsed.len() < total {
        tracing::warn!(what, skipped = total - parsed.len(), "skipped undecodable items");
    }
    Ok(parsed)
}

pub fn parse_records(body: &str) -> DecodeResult<Vec<Record>> {
    parse_list(body, "records")
}

pub fn parse_doctors(body: &str) -> DecodeResult<Vec<Doctor>> {
    parse_list(body, "doctors")
}

/// Decode a single record; must be a JSON object.
pub fn parse_record(body: &str) -> DecodeResult<Record> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(DecodeError::InvalidFormat(format!(
            "expected a record object, got {}",
            json_kind(&value)
        )));
    }
    Ok(serde_json::from_value(value)?)
}

pub fn parse_patient_info(id: &PatientId, body: &str) -> DecodeResult<PatientInfo> {
    let wire: PatientInfoWire = serde_json::from_str(body)?;
    Ok(PatientInfo::from_wire(id.clone(), wire))
}

/// Record echoed by a create/update, or one rebuilt from what was sent.
pub fn parse_saved_record(body: &str, sent: Record) -> Record {
    match parse_record(body) {
        Ok(record) if record.id.is_some() => record,
        Ok(_) | Err(_) => {
            tracing::debug!("save response carried no record, using submitted fields");
            sent
        }
    }
}

/// The record a create/update is expected to produce.
pub fn record_from_payload(payload: &RecordPayload, id: Option<ServerId>, specialty: String) -> Record {
    Record {
        id,
        title: payload.name.clone(),
        doctor_name: payload.doctor_name.clone(),
        specialty,
        notes: payload.note.clone(),
        created_at: None,
        updated_at: None,
        attachments: payload
            .files
            .iter()
            .map(|f| f.file_name().to_string())
            .collect(),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
