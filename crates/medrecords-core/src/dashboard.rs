//! Patient dashboard: profile, record counts and last visit.
//!
//! The four fetches run concurrently and are applied independently, so one
//! failing source leaves the others on screen.

use chrono::{DateTime, Utc};

use crate::backend::{BackendResult, RecordsBackend};
use crate::models::{PatientId, PatientInfo, Record, RecordKind};
use crate::session::PatientContext;

/// Session error set when any dashboard source failed.
pub const DASHBOARD_PARTIAL_MESSAGE: &str = "تعذر تحديث بعض البيانات";
pub const UNKNOWN_DOCTOR: &str = "طبيب غير مسجل";
pub const GENERAL_SPECIALTY: &str = "تخصص عام";

/// Per-kind record counts; `None` when that fetch failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub analyses: Option<usize>,
    pub scans: Option<usize>,
    pub prescriptions: Option<usize>,
}

impl RecordCounts {
    pub fn get(&self, kind: RecordKind) -> Option<usize> {
        match kind {
            RecordKind::Analysis => self.analyses,
            RecordKind::Scan => self.scans,
            RecordKind::Prescription => self.prescriptions,
        }
    }

    fn set(&mut self, kind: RecordKind, count: usize) {
        let slot = match kind {
            RecordKind::Analysis => &mut self.analyses,
            RecordKind::Scan => &mut self.scans,
            RecordKind::Prescription => &mut self.prescriptions,
        };
        *slot = Some(count);
    }
}

/// Most recent prescription, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastVisit {
    pub doctor_name: String,
    pub specialty: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardSource {
    PatientInfo,
    Records(RecordKind),
}

/// A dismissible notice for one failed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchNotice {
    pub source: DashboardSource,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    pub patient: Option<PatientInfo>,
    pub counts: RecordCounts,
    pub last_visit: Option<LastVisit>,
    pub notices: Vec<FetchNotice>,
}

impl DashboardView {
    pub fn is_partial(&self) -> bool {
        !self.notices.is_empty()
    }
}

/// Latest prescription by creation time; ties keep backend order.
pub fn last_visit(prescriptions: &[Record]) -> Option<LastVisit> {
    let mut sorted: Vec<&Record> = prescriptions.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.created_at_utc()));
    sorted.first().map(|record| LastVisit {
        doctor_name: non_blank_or(&record.doctor_name, UNKNOWN_DOCTOR),
        specialty: non_blank_or(&record.specialty, GENERAL_SPECIALTY),
        date: record.created_at_utc(),
    })
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Fetch everything the dashboard shows and record it in the session.
pub async fn load_dashboard<B>(
    backend: &B,
    session: &PatientContext,
    patient_id: &PatientId,
) -> DashboardView
where
    B: RecordsBackend + ?Sized,
{
    session.set_patient_id(patient_id.clone());
    session.set_loading(true);

    let (info, analyses, scans, prescriptions) = tokio::join!(
        backend.patient_info(patient_id),
        backend.list_records(RecordKind::Analysis, patient_id),
        backend.list_records(RecordKind::Scan, patient_id),
        backend.list_records(RecordKind::Prescription, patient_id),
    );

    let mut view = DashboardView::default();

    match info {
        Ok(info) => {
            session.set_patient_info(Some(info.clone()));
            view.patient = Some(info);
        }
        Err(e) => {
            tracing::warn!(patient = %patient_id, error = %e, "patient info fetch failed");
            view.notices.push(FetchNotice {
                source: DashboardSource::PatientInfo,
                message: "فشل في تحميل بيانات المريض".to_string(),
            });
        }
    }

    let collections: [(RecordKind, BackendResult<Vec<Record>>); 3] = [
        (RecordKind::Analysis, analyses),
        (RecordKind::Scan, scans),
        (RecordKind::Prescription, prescriptions),
    ];
    for (kind, result) in collections {
        match result {
            Ok(records) => {
                view.counts.set(kind, records.len());
                if kind == RecordKind::Prescription {
                    view.last_visit = last_visit(&records);
                }
            }
            Err(e) => {
                tracing::warn!(patient = %patient_id, ?kind, error = %e, "dashboard fetch failed");
                view.notices.push(FetchNotice {
                    source: DashboardSource::Records(kind),
                    message: format!("فشل في تحميل قائمة {}", kind.collection_label()),
                });
            }
        }
    }

    session.set_error(view.is_partial().then(|| DASHBOARD_PARTIAL_MESSAGE.to_string()));
    session.set_loading(false);
    tracing::debug!(patient = %patient_id, partial = view.is_partial(), "dashboard loaded");
    view
}
