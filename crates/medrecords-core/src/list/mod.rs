//! Record list engine: fetch, filter and delete records of one kind.
//!
//! Overlapping loads follow "newest wins": every load takes a ticket, and a
//! result whose ticket is no longer the latest is dropped on arrival.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use thiserror::Error;

use crate::backend::{RecordsBackend, SearchFilter};
use crate::models::{PatientId, Record, RecordKind, ServerId};

/// Shown when a delete fails without a server message.
pub const GENERIC_DELETE_MESSAGE: &str = "حدث خطأ أثناء محاولة الحذف";

/// List errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ListError {
    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    #[error("Delete failed: {message}")]
    Delete { message: String },

    #[error("Lock error: {0}")]
    Lock(String),
}

impl<T> From<PoisonError<T>> for ListError {
    fn from(e: PoisonError<T>) -> Self {
        ListError::Lock(format!("Lock poisoned: {}", e))
    }
}

pub type ListResult<T> = Result<T, ListError>;

/// Which empty-state message a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// The patient has no records of this kind
    NoRecords,
    /// Filters are active and nothing matched
    NoResults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { count: usize },
    /// A newer load started first; this result was discarded
    Superseded,
}

/// Point-in-time copy of the list for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    /// In backend order
    pub records: Vec<Record>,
    pub is_searching: bool,
    pub is_loading: bool,
    pub empty_state: Option<EmptyState>,
    pub error: Option<ListError>,
}

#[derive(Debug, Default)]
struct ListState {
    records: Vec<Record>,
    is_searching: bool,
    is_loading: bool,
    error: Option<ListError>,
}

/// Records of one kind for one patient.
pub struct RecordList<B: ?Sized> {
    kind: RecordKind,
    patient_id: PatientId,
    backend: Arc<B>,
    load_seq: AtomicU64,
    state: Mutex<ListState>,
}

impl<B: RecordsBackend + ?Sized> RecordList<B> {
    pub fn new(backend: Arc<B>, kind: RecordKind, patient_id: PatientId) -> Self {
        Self {
            kind,
            patient_id,
            backend,
            load_seq: AtomicU64::new(0),
            state: Mutex::new(ListState::default()),
        }
    }

    fn state(&self) -> ListResult<MutexGuard<'_, ListState>> {
        Ok(self.state.lock()?)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    /// Fetch the collection, filtered when a keyword or date is given.
    ///
    /// A failed fetch empties the collection and reports
    /// [`ListError::Fetch`].
    pub async fn load(&self, keyword: Option<&str>, date: Option<NaiveDate>) -> ListResult<LoadOutcome> {
        let filter = SearchFilter::new(keyword, date);
        let ticket = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state()?.is_loading = true;

        let result = if filter.is_empty() {
            self.backend.list_records(self.kind, &self.patient_id).await
        } else {
            self.backend
                .search_records(self.kind, &self.patient_id, &filter)
                .await
        };

        if self.load_seq.load(Ordering::SeqCst) != ticket {
            tracing::debug!(kind = ?self.kind, ticket, "discarding superseded list load");
            return Ok(LoadOutcome::Superseded);
        }

        let mut state = self.state()?;
        state.is_loading = false;
        state.is_searching = !filter.is_empty();
        match result {
            Ok(records) => {
                let count = records.len();
                state.records = records;
                state.error = None;
                tracing::debug!(kind = ?self.kind, count, searching = state.is_searching, "list loaded");
                Ok(LoadOutcome::Applied { count })
            }
            Err(e) => {
                tracing::warn!(kind = ?self.kind, patient = %self.patient_id, error = %e, "list fetch failed");
                let error = ListError::Fetch {
                    message: format!("فشل في تحميل قائمة {}", self.kind.collection_label()),
                };
                state.records.clear();
                state.error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Delete a record. The caller has already confirmed with the user.
    ///
    /// On success the record is dropped locally without re-fetching; on
    /// failure the collection is left as it was.
    pub async fn delete(&self, id: &ServerId) -> ListResult<()> {
        match self.backend.delete_record(self.kind, id).await {
            Ok(()) => {
                let mut state = self.state()?;
                state.records.retain(|r| r.id.as_ref() != Some(id));
                state.error = None;
                tracing::info!(kind = ?self.kind, %id, "record deleted");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(kind = ?self.kind, %id, error = %e, "record delete failed");
                let message = e
                    .server_message()
                    .unwrap_or(GENERIC_DELETE_MESSAGE)
                    .to_string();
                let error = ListError::Delete { message };
                self.state()?.error = Some(error.clone());
                Err(error)
            }
        }
    }

    pub fn view(&self) -> ListResult<ListView> {
        let state = self.state()?;
        let empty_state = state.records.is_empty().then_some(if state.is_searching {
            EmptyState::NoResults
        } else {
            EmptyState::NoRecords
        });
        Ok(ListView {
            records: state.records.clone(),
            is_searching: state.is_searching,
            is_loading: state.is_loading,
            empty_state,
            error: state.error.clone(),
        })
    }
}
