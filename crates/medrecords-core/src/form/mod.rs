//! Record form engine.
//!
//! Owns the editable fields of one analysis, scan or prescription, the
//! attachment set and the doctor/specialty lock, and turns them into a single
//! create or update call.
//!
//! ```text
//! create:  Idle ───────────────────────┐
//!                                      ▼
//! edit:    Loading ──▶ Loaded ──▶ Submitting ──▶ Succeeded
//!             │                    ▲      │
//!             ▼                    │      ▼
//!         LoadFailed               └── Failed (editable, retry)
//! ```

mod fields;

pub use fields::*;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::attachments::{AttachmentSet, LocalFile, PreviewRef, PreviewRegistry};
use crate::backend::{RecordPayload, RecordsBackend};
use crate::models::{Doctor, PatientId, Record, RecordKind, ServerId};
use crate::resolver::{DoctorResolver, DoctorSelection, SpecialtyLock, SpecialtyNormalizer};
use crate::routes::Route;

/// Shown when a save fails without a server message.
pub const GENERIC_SUBMIT_MESSAGE: &str = "حدث خطأ في الحفظ";

/// Form errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("Missing required fields: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Validation(Vec<RequiredField>),

    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    #[error("Submit failed: {message}")]
    Submit { message: String },

    #[error("A submission is already in progress")]
    Busy,

    #[error("Form is not interactive")]
    NotInteractive,

    #[error("Specialty is locked to the selected doctor")]
    SpecialtyLocked,

    #[error("Lock error: {0}")]
    Lock(String),
}

impl<T> From<PoisonError<T>> for FormError {
    fn from(e: PoisonError<T>) -> Self {
        FormError::Lock(format!("Lock poisoned: {}", e))
    }
}

pub type FormResult<T> = Result<T, FormError>;

/// Whether the form creates a record or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create {
        patient_id: PatientId,
    },
    Edit {
        patient_id: PatientId,
        record_id: ServerId,
    },
}

impl FormMode {
    pub fn patient_id(&self) -> &PatientId {
        match self {
            FormMode::Create { patient_id } | FormMode::Edit { patient_id, .. } => patient_id,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self, FormMode::Edit { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    /// Create mode, accepting edits
    Idle,
    /// Edit mode, record fetch outstanding
    Loading,
    /// Edit mode, populated from the fetched record
    Loaded,
    /// Edit mode, record fetch failed; non-interactive
    LoadFailed,
    Submitting,
    Succeeded,
    /// Last submit failed; still editable
    Failed,
}

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub record: Record,
    /// Where the caller should navigate next
    pub navigate_to: Route,
}

/// Point-in-time copy of the form for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub phase: FormPhase,
    pub fields: FormFields,
    pub specialty_lock: SpecialtyLock,
    pub candidates: Vec<Doctor>,
    pub last_error: Option<FormError>,
}

#[derive(Debug)]
struct FormState {
    phase: FormPhase,
    fields: FormFields,
    lock: SpecialtyLock,
    attachments: AttachmentSet,
    candidates: Vec<Doctor>,
    last_error: Option<FormError>,
}

fn ensure_editable(phase: FormPhase) -> FormResult<()> {
    match phase {
        FormPhase::Idle | FormPhase::Loaded | FormPhase::Failed => Ok(()),
        FormPhase::Submitting => Err(FormError::Busy),
        FormPhase::Loading | FormPhase::LoadFailed | FormPhase::Succeeded => {
            Err(FormError::NotInteractive)
        }
    }
}

/// Record form for one kind, in create or edit mode.
pub struct RecordForm<B: ?Sized> {
    kind: RecordKind,
    mode: FormMode,
    backend: Arc<B>,
    resolver: DoctorResolver<B>,
    previews: PreviewRegistry,
    state: Mutex<FormState>,
}

impl<B: RecordsBackend + ?Sized> RecordForm<B> {
    /// Create a form. Edit mode starts in [`FormPhase::Loading`] until
    /// [`RecordForm::load`] succeeds.
    pub fn new(
        backend: Arc<B>,
        normalizer: SpecialtyNormalizer,
        previews: PreviewRegistry,
        kind: RecordKind,
        mode: FormMode,
    ) -> Self {
        let phase = if mode.is_edit() {
            FormPhase::Loading
        } else {
            FormPhase::Idle
        };
        Self {
            kind,
            resolver: DoctorResolver::new(Arc::clone(&backend), normalizer),
            backend,
            state: Mutex::new(FormState {
                phase,
                fields: FormFields::default(),
                lock: SpecialtyLock::Unlocked,
                attachments: AttachmentSet::new(previews.clone()),
                candidates: Vec::new(),
                last_error: None,
            }),
            previews,
            mode,
        }
    }

    fn state(&self) -> FormResult<MutexGuard<'_, FormState>> {
        Ok(self.state.lock()?)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn phase(&self) -> FormResult<FormPhase> {
        Ok(self.state()?.phase)
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let state = self.state()?;
        Ok(FormSnapshot {
            phase: state.phase,
            fields: state.fields.clone(),
            specialty_lock: state.lock,
            candidates: state.candidates.clone(),
            last_error: state.last_error.clone(),
        })
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch the record being edited and populate the form. No-op in create mode.
    ///
    /// Only a form that has not loaded yet, or whose load failed, can load;
    /// a loaded form keeps its edits and staged files.
    ///
    /// A record with a doctor name starts with the specialty locked. A blank
    /// stored specialty shows as the fallback catalog entry, which is what a
    /// save would send anyway.
    pub async fn load(&self) -> FormResult<()> {
        let record_id = match &self.mode {
            FormMode::Create { .. } => return Ok(()),
            FormMode::Edit { record_id, .. } => record_id.clone(),
        };
        {
            let mut state = self.state()?;
            match state.phase {
                FormPhase::Loading | FormPhase::LoadFailed => {}
                FormPhase::Submitting => return Err(FormError::Busy),
                _ => return Err(FormError::NotInteractive),
            }
            state.phase = FormPhase::Loading;
        }

        let result = self.backend.get_record(self.kind, &record_id).await;

        let mut state = self.state()?;
        match result {
            Ok(record) => {
                let specialty = if record.specialty.trim().is_empty() {
                    self.resolver
                        .normalizer()
                        .fallback_entry()
                        .map(|entry| entry.name.clone())
                        .unwrap_or_default()
                } else {
                    self.resolver.normalize_specialty(&record.specialty)
                };
                state.fields = FormFields::from_record(&record, specialty);
                state.lock = if record.doctor_name.trim().is_empty() {
                    SpecialtyLock::Unlocked
                } else {
                    SpecialtyLock::Locked
                };
                state.attachments =
                    AttachmentSet::from_remote(self.previews.clone(), record.attachments.clone());
                state.phase = FormPhase::Loaded;
                state.last_error = None;
                tracing::debug!(kind = ?self.kind, id = %record_id, "record loaded for editing");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(kind = ?self.kind, id = %record_id, error = %e, "failed to load record");
                let error = FormError::Fetch {
                    message: format!("فشل في تحميل بيانات {}", self.kind.definite_label()),
                };
                state.phase = FormPhase::LoadFailed;
                state.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    // =========================================================================
    // Fields
    // =========================================================================

    pub fn set_title(&self, title: impl Into<String>) -> FormResult<()> {
        let mut state = self.state()?;
        ensure_editable(state.phase)?;
        state.fields.title = title.into();
        Ok(())
    }

    pub fn set_notes(&self, notes: impl Into<String>) -> FormResult<()> {
        let mut state = self.state()?;
        ensure_editable(state.phase)?;
        state.fields.notes = notes.into();
        Ok(())
    }

    /// Set the specialty directly; rejected while locked to a doctor.
    pub fn set_specialty(&self, specialty: impl Into<String>) -> FormResult<()> {
        let mut state = self.state()?;
        ensure_editable(state.phase)?;
        if state.lock.is_locked() {
            return Err(FormError::SpecialtyLocked);
        }
        state.fields.specialty = specialty.into();
        Ok(())
    }

    // =========================================================================
    // Doctor
    // =========================================================================

    /// Fetch the initial candidate list for the patient.
    pub async fn load_doctors(&self) -> FormResult<Vec<Doctor>> {
        self.refresh_candidates("").await
    }

    /// A manual keystroke in the doctor-name field: unlocks the specialty and
    /// searches again.
    pub async fn edit_doctor_name(&self, name: impl Into<String>) -> FormResult<Vec<Doctor>> {
        let query = {
            let mut state = self.state()?;
            ensure_editable(state.phase)?;
            state.fields.doctor_name = name.into();
            state.lock = state.lock.on_manual_edit();
            state.fields.doctor_name.clone()
        };
        self.refresh_candidates(&query).await
    }

    async fn refresh_candidates(&self, query: &str) -> FormResult<Vec<Doctor>> {
        let result = self.resolver.search(self.mode.patient_id(), query).await;
        let mut state = self.state()?;
        if let Some(doctors) = result {
            state.candidates = doctors;
        }
        Ok(state.candidates.clone())
    }

    /// Apply a chosen candidate and lock the specialty.
    pub fn select_doctor(&self, doctor: &Doctor) -> FormResult<DoctorSelection> {
        let selection = self.resolver.select_doctor(doctor);
        let mut state = self.state()?;
        ensure_editable(state.phase)?;
        state.fields.doctor_name = selection.doctor_name.clone();
        state.fields.specialty = selection.specialty.clone();
        state.lock = state.lock.on_select();
        Ok(selection)
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    pub fn add_local_files<I>(&self, files: I) -> FormResult<Vec<PreviewRef>>
    where
        I: IntoIterator<Item = LocalFile>,
    {
        let mut state = self.state()?;
        ensure_editable(state.phase)?;
        Ok(state.attachments.add_local_files(files))
    }

    pub fn remove_local_file(&self, preview: &PreviewRef) -> FormResult<Option<LocalFile>> {
        let mut state = self.state()?;
        ensure_editable(state.phase)?;
        Ok(state.attachments.remove_local_file(preview))
    }

    pub fn toggle_deletion(&self, remote_ref: &str) -> FormResult<bool> {
        let mut state = self.state()?;
        ensure_editable(state.phase)?;
        Ok(state.attachments.toggle_deletion(remote_ref))
    }

    /// Read the attachment set.
    pub fn attachments<R>(&self, f: impl FnOnce(&AttachmentSet) -> R) -> FormResult<R> {
        Ok(f(&self.state()?.attachments))
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Check required fields. Notes and attachments are always optional.
    pub fn validate(&self) -> FormResult<()> {
        let missing = self.state()?.fields.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormError::Validation(missing))
        }
    }

    /// Validate and send the whole change-set as one create or update.
    ///
    /// Rejected with [`FormError::Busy`] while a previous submit is outstanding.
    pub async fn submit(&self) -> FormResult<SubmitOutcome> {
        let payload = {
            let mut state = self.state()?;
            ensure_editable(state.phase)?;

            let missing = state.fields.missing();
            if !missing.is_empty() {
                let error = FormError::Validation(missing);
                state.last_error = Some(error.clone());
                return Err(error);
            }

            let fields = state.fields.trimmed();
            let submission = state.attachments.build_submission();
            state.phase = FormPhase::Submitting;
            state.last_error = None;

            RecordPayload {
                specialty_id: self.resolver.specialty_id(&fields.specialty),
                name: fields.title,
                doctor_name: fields.doctor_name,
                note: fields.notes,
                files: submission.new_files,
                images_to_delete: if self.mode.is_edit() {
                    submission.deletions
                } else {
                    Vec::new()
                },
            }
        };

        let result = match &self.mode {
            FormMode::Create { patient_id } => {
                self.backend.create_record(self.kind, patient_id, payload).await
            }
            FormMode::Edit { record_id, .. } => {
                self.backend.update_record(self.kind, record_id, payload).await
            }
        };

        let mut state = self.state()?;
        match result {
            Ok(record) => {
                state.phase = FormPhase::Succeeded;
                tracing::info!(kind = ?self.kind, id = ?record.id, "record saved");
                let patient_id = self.mode.patient_id().clone();
                let navigate_to = match self.mode {
                    FormMode::Create { .. } => Route::Dashboard { patient_id },
                    FormMode::Edit { .. } => Route::List {
                        patient_id,
                        kind: self.kind,
                    },
                };
                Ok(SubmitOutcome { record, navigate_to })
            }
            Err(e) => {
                tracing::warn!(kind = ?self.kind, error = %e, "record save failed");
                let message = e
                    .server_message()
                    .unwrap_or(GENERIC_SUBMIT_MESSAGE)
                    .to_string();
                let error = FormError::Submit { message };
                state.phase = FormPhase::Failed;
                state.last_error = Some(error.clone());
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn create_form(backend: &Arc<MemoryBackend>) -> RecordForm<MemoryBackend> {
        RecordForm::new(
            Arc::clone(backend),
            SpecialtyNormalizer::default(),
            PreviewRegistry::new(),
            RecordKind::Analysis,
            FormMode::Create {
                patient_id: PatientId::from("P1"),
            },
        )
    }

    #[test]
    fn test_create_starts_idle_and_edit_starts_loading() {
        let backend = Arc::new(MemoryBackend::new());
        assert_eq!(create_form(&backend).phase().unwrap(), FormPhase::Idle);

        let edit = RecordForm::new(
            Arc::clone(&backend),
            SpecialtyNormalizer::default(),
            PreviewRegistry::new(),
            RecordKind::Scan,
            FormMode::Edit {
                patient_id: PatientId::from("P1"),
                record_id: ServerId::from("1"),
            },
        );
        assert_eq!(edit.phase().unwrap(), FormPhase::Loading);
        assert_eq!(edit.set_title("x"), Err(FormError::NotInteractive));
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let backend = Arc::new(MemoryBackend::new());
        let form = create_form(&backend);
        form.set_title("CBC").unwrap();

        assert_eq!(
            form.validate(),
            Err(FormError::Validation(vec![
                RequiredField::DoctorName,
                RequiredField::Specialty
            ]))
        );
    }

    #[test]
    fn test_specialty_locked_after_selection() {
        let backend = Arc::new(MemoryBackend::new());
        let form = create_form(&backend);

        let selection = form
            .select_doctor(&Doctor::new(1u64, "Dr A", "باطنة"))
            .unwrap();
        assert_eq!(selection.specialty, "باطنه");
        assert_eq!(form.set_specialty("قلب"), Err(FormError::SpecialtyLocked));

        let snapshot = form.snapshot().unwrap();
        assert_eq!(snapshot.fields.doctor_name, "Dr A");
        assert_eq!(snapshot.fields.specialty, "باطنه");
        assert!(snapshot.specialty_lock.is_locked());
    }

    #[tokio::test]
    async fn test_manual_doctor_edit_unlocks() {
        let backend = Arc::new(MemoryBackend::new());
        let form = create_form(&backend);
        form.select_doctor(&Doctor::new(1u64, "Dr A", "قلب")).unwrap();

        form.edit_doctor_name("Dr Ab").await.unwrap();
        assert!(!form.snapshot().unwrap().specialty_lock.is_locked());
        form.set_specialty("عيون").unwrap();
        assert_eq!(backend.doctor_queries(), vec![Some("Dr Ab".to_string())]);
    }

    #[tokio::test]
    async fn test_create_payload_has_no_deletions() {
        let backend = Arc::new(MemoryBackend::new());
        let form = create_form(&backend);
        form.set_title(" CBC ").unwrap();
        form.select_doctor(&Doctor::new(1u64, "Dr A", "قلب")).unwrap();
        form.add_local_files([LocalFile::new("a.jpg", vec![1])]).unwrap();

        let outcome = form.submit().await.unwrap();
        assert_eq!(
            outcome.navigate_to,
            Route::Dashboard {
                patient_id: PatientId::from("P1")
            }
        );

        let payloads = backend.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].name, "CBC");
        assert_eq!(payloads[0].specialty_id, 2);
        assert_eq!(payloads[0].files.len(), 1);
        assert!(payloads[0].images_to_delete.is_empty());
        assert_eq!(form.phase().unwrap(), FormPhase::Succeeded);
    }
}
