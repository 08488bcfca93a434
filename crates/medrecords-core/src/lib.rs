//! Medrecords Core Library
//!
//! Patient medical-records client: analyses, scans and prescriptions, each
//! with the same create/edit/list/search/delete shape.
//!
//! # Architecture
//!
//! ```text
//!                       Route ──▶ page (dashboard / list / form)
//!                                        │
//!              ┌─────────────────────────┼─────────────────────────┐
//!              ▼                         ▼                         ▼
//!        Dashboard loader          RecordList engine         RecordForm engine
//!      (4 concurrent fetches)     (newest load wins)        ┌──────┴──────┐
//!              │                         │                  ▼             ▼
//!              │                         │          DoctorResolver   AttachmentSet
//!              │                         │        (specialty lock)  (remote/pending/
//!              │                         │                │          marked-deleted)
//!              ▼                         ▼                ▼             │
//!        PatientContext  ◀──────  RecordsBackend  ◀───────┴─────────────┘
//!                                (HTTP or in-memory)
//! ```
//!
//! # Modules
//!
//! - [`models`]: Domain types (Record, Doctor, PatientInfo, SpecialtyCatalog)
//! - [`attachments`]: Three-way attachment state, previews, downloads
//! - [`resolver`]: Specialty normalizer and doctor resolver
//! - [`form`]: Record form engine
//! - [`list`]: Record list engine
//! - [`dashboard`]: Concurrent dashboard loader
//! - [`session`]: Patient session context
//! - [`routes`]: Patient-scoped routes
//! - [`backend`]: Backend trait and in-memory backend
//! - [`config`]: Client configuration

pub mod attachments;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod form;
pub mod list;
pub mod models;
pub mod resolver;
pub mod routes;
pub mod session;

// Re-export commonly used types
pub use attachments::{AttachmentSet, Download, LocalFile, PreviewRef, PreviewRegistry, Submission};
pub use backend::{BackendError, MemoryBackend, RecordPayload, RecordsBackend, SearchFilter};
pub use config::ClientConfig;
pub use dashboard::DashboardView;
pub use form::{FormError, FormMode, FormPhase, RecordForm, SubmitOutcome};
pub use list::{ListError, ListView, RecordList};
pub use models::{Doctor, PatientId, PatientInfo, Record, RecordKind, ServerId, SpecialtyCatalog};
pub use resolver::{DoctorResolver, DoctorSelection, SpecialtyLock, SpecialtyNormalizer};
pub use routes::Route;
pub use session::{PatientContext, PatientSession};

use std::sync::Arc;

// =========================================================================
// Main API Object
// =========================================================================

/// Entry point wiring configuration, backend, session and previews together.
///
/// One client lives for the whole application; pages get their engines from
/// it.
pub struct MedRecordsClient<B: ?Sized> {
    config: ClientConfig,
    backend: Arc<B>,
    session: PatientContext,
    previews: PreviewRegistry,
    normalizer: SpecialtyNormalizer,
}

impl<B: RecordsBackend + ?Sized> MedRecordsClient<B> {
    pub fn new(config: ClientConfig, backend: Arc<B>) -> Self {
        let normalizer = SpecialtyNormalizer::default().with_fallback_id(config.fallback_specialty_id);
        Self {
            config,
            backend,
            session: PatientContext::new(),
            previews: PreviewRegistry::new(),
            normalizer,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn session(&self) -> &PatientContext {
        &self.session
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn normalizer(&self) -> &SpecialtyNormalizer {
        &self.normalizer
    }

    // =========================================================================
    // Pages
    // =========================================================================

    /// Load the dashboard for `patient_id`.
    pub async fn dashboard(&self, patient_id: &PatientId) -> DashboardView {
        dashboard::load_dashboard(self.backend.as_ref(), &self.session, patient_id).await
    }

    /// List engine for one kind; call [`RecordList::load`] to populate it.
    pub fn record_list(&self, kind: RecordKind, patient_id: PatientId) -> RecordList<B> {
        self.session.set_patient_id(patient_id.clone());
        RecordList::new(Arc::clone(&self.backend), kind, patient_id)
    }

    /// Empty form for a new record.
    pub fn new_record_form(&self, kind: RecordKind, patient_id: PatientId) -> RecordForm<B> {
        self.session.set_patient_id(patient_id.clone());
        self.form(kind, FormMode::Create { patient_id })
    }

    /// Form for an existing record, already loaded.
    ///
    /// A failed load still returns the form (in [`FormPhase::LoadFailed`]) so
    /// the page can show its error.
    pub async fn edit_record_form(
        &self,
        kind: RecordKind,
        patient_id: PatientId,
        record_id: ServerId,
    ) -> RecordForm<B> {
        self.session.set_patient_id(patient_id.clone());
        let form = self.form(
            kind,
            FormMode::Edit {
                patient_id,
                record_id,
            },
        );
        if let Err(e) = form.load().await {
            tracing::debug!(error = %e, "edit form opened without a record");
        }
        form
    }

    fn form(&self, kind: RecordKind, mode: FormMode) -> RecordForm<B> {
        RecordForm::new(
            Arc::clone(&self.backend),
            self.normalizer.clone(),
            self.previews.clone(),
            kind,
            mode,
        )
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// See [`ClientConfig::attachment_url`].
    pub fn attachment_url(&self, reference: &str) -> String {
        self.config.attachment_url(reference)
    }

    /// Fetch a remote attachment for saving, falling back to opening its URL.
    pub async fn download_attachment(&self, kind: RecordKind, title: &str, reference: &str) -> Download {
        attachments::download_attachment(self.backend.as_ref(), &self.config, kind, title, reference).await
    }
}
