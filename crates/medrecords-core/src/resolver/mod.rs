//! Doctor/specialty resolver.
//!
//! Pipeline: doctor-name keystroke → candidate search → doctor selection →
//! specialty normalization → specialty lock
//!
//! The lock is an explicit two-state machine:
//!
//! ```text
//!              select_doctor
//!   Unlocked ───────────────▶ Locked
//!      ▲                        │
//!      └──── manual name edit ──┘
//! ```

mod normalizer;

pub use normalizer::*;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::RecordsBackend;
use crate::models::{Doctor, PatientId};

/// Whether the specialty field may be edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecialtyLock {
    #[default]
    Unlocked,
    /// Specialty derived from a selected doctor
    Locked,
}

impl SpecialtyLock {
    pub fn is_locked(&self) -> bool {
        matches!(self, SpecialtyLock::Locked)
    }

    /// Transition on `select_doctor`.
    pub fn on_select(self) -> Self {
        SpecialtyLock::Locked
    }

    /// Transition on any doctor-name edit not produced by a selection.
    pub fn on_manual_edit(self) -> Self {
        SpecialtyLock::Unlocked
    }
}

/// What the form applies after a doctor is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorSelection {
    pub doctor_name: String,
    /// Canonical catalog name when resolvable, else the doctor's raw text
    pub specialty: String,
    pub locked: bool,
}

/// Resolves free-text doctor entry against the patient's doctors and the
/// specialty catalog.
pub struct DoctorResolver<B: ?Sized> {
    backend: Arc<B>,
    normalizer: SpecialtyNormalizer,
    search_seq: AtomicU64,
}

impl<B: RecordsBackend + ?Sized> DoctorResolver<B> {
    pub fn new(backend: Arc<B>, normalizer: SpecialtyNormalizer) -> Self {
        Self {
            backend,
            normalizer,
            search_seq: AtomicU64::new(0),
        }
    }

    pub fn normalizer(&self) -> &SpecialtyNormalizer {
        &self.normalizer
    }

    /// Fetch doctor candidates for `patient_id` matching `query`.
    ///
    /// Returns `None` when a newer search started while this one was in
    /// flight; the caller keeps whatever the newer search produces. Backend
    /// failures yield an empty list.
    pub async fn search(&self, patient_id: &PatientId, query: &str) -> Option<Vec<Doctor>> {
        let ticket = self.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();
        let query = (!query.is_empty()).then_some(query);

        let result = self.backend.doctors_for_patient(patient_id, query).await;

        if self.search_seq.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, "discarding superseded doctor search");
            return None;
        }

        match result {
            Ok(doctors) => Some(doctors),
            Err(e) => {
                tracing::warn!(patient = %patient_id, error = %e, "doctor search failed");
                Some(Vec::new())
            }
        }
    }

    /// See [`SpecialtyNormalizer::normalize`].
    pub fn normalize_specialty(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    /// Catalog id for a specialty, falling back when unresolved.
    pub fn specialty_id(&self, raw: &str) -> u32 {
        self.normalizer.specialty_id(raw)
    }

    /// Cross-link a chosen doctor to its specialty.
    pub fn select_doctor(&self, doctor: &Doctor) -> DoctorSelection {
        DoctorSelection {
            doctor_name: doctor.name.clone(),
            specialty: self.normalize_specialty(&doctor.specialty_name),
            locked: SpecialtyLock::Unlocked.on_select().is_locked(),
        }
    }
}
