//! Patient session context shared by the dashboard and record pages.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{PatientId, PatientInfo};

/// Process-wide patient state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientSession {
    /// Unset until a route names a patient
    pub patient_id: Option<PatientId>,
    /// Unset until the profile has been fetched
    pub patient_info: Option<PatientInfo>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Cheaply clonable handle to the one [`PatientSession`].
///
/// Constructed at application start and passed to whichever page is active.
#[derive(Debug, Clone, Default)]
pub struct PatientContext {
    inner: Arc<Mutex<PatientSession>>,
}

impl PatientContext {
    pub fn new() -> Self {
        Self::default()
    }

    // Session fields are plain values, so a poisoned lock still holds a usable state.
    fn lock(&self) -> MutexGuard<'_, PatientSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> PatientSession {
        self.lock().clone()
    }

    pub fn patient_id(&self) -> Option<PatientId> {
        self.lock().patient_id.clone()
    }

    /// Switch to `patient_id`, dropping the previous patient's profile.
    pub fn set_patient_id(&self, patient_id: PatientId) {
        let mut session = self.lock();
        if session.patient_id.as_ref() != Some(&patient_id) {
            session.patient_info = None;
        }
        session.patient_id = Some(patient_id);
    }

    pub fn set_patient_info(&self, info: Option<PatientInfo>) {
        self.lock().patient_info = info;
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.lock().is_loading = is_loading;
    }

    pub fn set_error(&self, error: Option<String>) {
        self.lock().error = error;
    }
}
