//! In-memory backend with scripted failures and held calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{BackendError, BackendResult, RecordPayload, RecordsBackend, SearchFilter};
use crate::models::{Doctor, PatientId, PatientInfo, Record, RecordKind, ServerId, SpecialtyCatalog};

/// A backend call, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    PatientInfo,
    List(RecordKind),
    Search(RecordKind),
    Get(RecordKind),
    Create(RecordKind),
    Update(RecordKind),
    Delete(RecordKind),
    Doctors,
    FetchAttachment,
}

#[derive(Debug)]
struct StoredRecord {
    kind: RecordKind,
    patient_id: PatientId,
    record: Record,
}

#[derive(Debug, Default)]
struct MemoryState {
    patients: HashMap<PatientId, PatientInfo>,
    records: Vec<StoredRecord>,
    doctors: HashMap<PatientId, Vec<Doctor>>,
    blobs: HashMap<String, Vec<u8>>,
    failures: HashMap<Operation, BackendError>,
    calls: HashMap<Operation, usize>,
    gates: HashMap<Operation, VecDeque<oneshot::Receiver<()>>>,
    payloads: Vec<RecordPayload>,
    doctor_queries: Vec<Option<String>>,
    next_id: u64,
}

/// Backend that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    catalog: SpecialtyCatalog,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking test thread must not wedge the other tests sharing the backend.
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    pub fn insert_patient(&self, info: PatientInfo) {
        self.lock().patients.insert(info.id.clone(), info);
    }

    /// Store a record, assigning an id when it has none.
    pub fn insert_record(&self, kind: RecordKind, patient_id: &PatientId, mut record: Record) -> ServerId {
        let mut state = self.lock();
        let id = match record.id.clone() {
            Some(id) => id,
            None => {
                state.next_id += 1;
                ServerId::from(state.next_id)
            }
        };
        record.id = Some(id.clone());
        state.records.push(StoredRecord {
            kind,
            patient_id: patient_id.clone(),
            record,
        });
        id
    }

    pub fn insert_doctor(&self, patient_id: &PatientId, doctor: Doctor) {
        self.lock()
            .doctors
            .entry(patient_id.clone())
            .or_default()
            .push(doctor);
    }

    pub fn insert_attachment(&self, url: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.lock().blobs.insert(url.into(), data.into());
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Make every subsequent `op` call fail with `error`.
    pub fn fail(&self, op: Operation, error: BackendError) {
        self.lock().failures.insert(op, error);
    }

    pub fn recover(&self, op: Operation) {
        self.lock().failures.remove(&op);
    }

    /// Hold the next `op` call open until the returned sender fires (or drops).
    pub fn hold_next(&self, op: Operation) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().gates.entry(op).or_default().push_back(rx);
        tx
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn payloads(&self) -> Vec<RecordPayload> {
        self.lock().payloads.clone()
    }

    pub fn doctor_queries(&self) -> Vec<Option<String>> {
        self.lock().doctor_queries.clone()
    }

    pub fn records(&self, kind: RecordKind, patient_id: &PatientId) -> Vec<Record> {
        self.lock()
            .records
            .iter()
            .filter(|s| s.kind == kind && &s.patient_id == patient_id)
            .map(|s| s.record.clone())
            .collect()
    }

    /// Count the call, wait on a held gate, then apply any scripted failure.
    async fn enter(&self, op: Operation) -> BackendResult<()> {
        let gate = {
            let mut state = self.lock();
            *state.calls.entry(op).or_default() += 1;
            state.gates.get_mut(&op).and_then(VecDeque::pop_front)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let failure = self.lock().failures.get(&op).cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn specialty_name(&self, specialty_id: u32) -> String {
        self.catalog
            .entries()
            .iter()
            .find(|e| e.id == specialty_id)
            .map(|e| e.name.clone())
            .unwrap_or_default()
    }
}

fn matches_filter(record: &Record, filter: &SearchFilter) -> bool {
    let keyword_ok = filter.keyword.as_deref().map_or(true, |keyword| {
        let keyword = keyword.to_lowercase();
        [&record.title, &record.doctor_name, &record.notes]
            .iter()
            .any(|field| field.to_lowercase().contains(&keyword))
    });
    let date_ok = filter
        .date
        .map_or(true, |date| record.created_on() == Some(date));
    keyword_ok && date_ok
}

#[async_trait]
impl RecordsBackend for MemoryBackend {
    async fn patient_info(&self, patient_id: &PatientId) -> BackendResult<PatientInfo> {
        self.enter(Operation::PatientInfo).await?;
        self.lock()
            .patients
            .get(patient_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("patient {patient_id}")))
    }

    async fn list_records(&self, kind: RecordKind, patient_id: &PatientId) -> BackendResult<Vec<Record>> {
        self.enter(Operation::List(kind)).await?;
        Ok(self.records(kind, patient_id))
    }

    async fn search_records(
        &self,
        kind: RecordKind,
        patient_id: &PatientId,
        filter: &SearchFilter,
    ) -> BackendResult<Vec<Record>> {
        self.enter(Operation::Search(kind)).await?;
        Ok(self
            .records(kind, patient_id)
            .into_iter()
            .filter(|r| matches_filter(r, filter))
            .collect())
    }

    async fn get_record(&self, kind: RecordKind, id: &ServerId) -> BackendResult<Record> {
        self.enter(Operation::Get(kind)).await?;
        self.lock()
            .records
            .iter()
            .find(|s| s.kind == kind && s.record.id.as_ref() == Some(id))
            .map(|s| s.record.clone())
            .ok_or_else(|| BackendError::not_found(format!("{} {id}", kind.api_segment())))
    }

    async fn create_record(
        &self,
        kind: RecordKind,
        patient_id: &PatientId,
        payload: RecordPayload,
    ) -> BackendResult<Record> {
        self.enter(Operation::Create(kind)).await?;
        let record = Record {
            id: None,
            title: payload.name.clone(),
            doctor_name: payload.doctor_name.clone(),
            specialty: self.specialty_name(payload.specialty_id),
            notes: payload.note.clone(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            updated_at: None,
            attachments: payload
                .files
                .iter()
                .map(|f| f.file_name().to_string())
                .collect(),
        };
        self.lock().payloads.push(payload);
        let id = self.insert_record(kind, patient_id, record.clone());
        Ok(Record {
            id: Some(id),
            ..record
        })
    }

    async fn update_record(
        &self,
        kind: RecordKind,
        id: &ServerId,
        payload: RecordPayload,
    ) -> BackendResult<Record> {
        self.enter(Operation::Update(kind)).await?;
        let specialty = self.specialty_name(payload.specialty_id);
        let mut state = self.lock();
        let stored = state
            .records
            .iter_mut()
            .find(|s| s.kind == kind && s.record.id.as_ref() == Some(id))
            .ok_or_else(|| BackendError::not_found(format!("{} {id}", kind.api_segment())))?;

        let record = &mut stored.record;
        record.title = payload.name.clone();
        record.doctor_name = payload.doctor_name.clone();
        record.specialty = specialty;
        record.notes = payload.note.clone();
        record
            .attachments
            .retain(|a| !payload.images_to_delete.contains(a));
        record
            .attachments
            .extend(payload.files.iter().map(|f| f.file_name().to_string()));
        record.updated_at = Some(chrono::Utc::now().to_rfc3339());

        let updated = record.clone();
        state.payloads.push(payload);
        Ok(updated)
    }

    async fn delete_record(&self, kind: RecordKind, id: &ServerId) -> BackendResult<()> {
        self.enter(Operation::Delete(kind)).await?;
        let mut state = self.lock();
        let before = state.records.len();
        state
            .records
            .retain(|s| !(s.kind == kind && s.record.id.as_ref() == Some(id)));
        if state.records.len() == before {
            return Err(BackendError::not_found(format!("{} {id}", kind.api_segment())));
        }
        Ok(())
    }

    async fn doctors_for_patient(
        &self,
        patient_id: &PatientId,
        query: Option<&str>,
    ) -> BackendResult<Vec<Doctor>> {
        self.lock().doctor_queries.push(query.map(str::to_string));
        self.enter(Operation::Doctors).await?;
        let doctors = self.lock().doctors.get(patient_id).cloned().unwrap_or_default();
        Ok(match query {
            Some(query) => doctors
                .into_iter()
                .filter(|d| d.name.contains(query))
                .collect(),
            None => doctors,
        })
    }

    async fn fetch_attachment(&self, url: &str) -> BackendResult<Vec<u8>> {
        self.enter(Operation::FetchAttachment).await?;
        self.lock()
            .blobs
            .get(url)
            .cloned()
            .ok_or_else(|| BackendError::not_found(url))
    }
}
