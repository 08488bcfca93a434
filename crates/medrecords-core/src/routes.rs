//! Patient-scoped routes.
//!
//! ```text
//! /                                  Root (redirects to the demo patient)
//! /{patientId}                       Dashboard
//! /{patientId}/{kind}                List
//! /{patientId}/{kind}/add            Add
//! /{patientId}/{kind}/{id}/edit      Edit
//! ```
//!
//! `{kind}` is one of `analysis`, `scans`, `prescriptions`.

use crate::config::ClientConfig;
use crate::models::{PatientId, RecordKind, ServerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Root,
    Dashboard {
        patient_id: PatientId,
    },
    List {
        patient_id: PatientId,
        kind: RecordKind,
    },
    Add {
        patient_id: PatientId,
        kind: RecordKind,
    },
    Edit {
        patient_id: PatientId,
        kind: RecordKind,
        record_id: ServerId,
    },
    NotFound,
}

impl Route {
    /// Parse a path. Query strings and fragments are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Root,
            [patient] => Route::Dashboard {
                patient_id: PatientId::from(*patient),
            },
            [patient, kind] => match RecordKind::from_route_segment(kind) {
                Some(kind) => Route::List {
                    patient_id: PatientId::from(*patient),
                    kind,
                },
                None => Route::NotFound,
            },
            [patient, kind, "add"] => match RecordKind::from_route_segment(kind) {
                Some(kind) => Route::Add {
                    patient_id: PatientId::from(*patient),
                    kind,
                },
                None => Route::NotFound,
            },
            [patient, kind, id, "edit"] => match RecordKind::from_route_segment(kind) {
                Some(kind) => Route::Edit {
                    patient_id: PatientId::from(*patient),
                    kind,
                    record_id: ServerId::from(*id),
                },
                None => Route::NotFound,
            },
            _ => Route::NotFound,
        }
    }

    /// Render back to a path; `None` for [`Route::NotFound`].
    pub fn path(&self) -> Option<String> {
        match self {
            Route::Root => Some("/".to_string()),
            Route::Dashboard { patient_id } => Some(format!("/{patient_id}")),
            Route::List { patient_id, kind } => {
                Some(format!("/{patient_id}/{}", kind.route_segment()))
            }
            Route::Add { patient_id, kind } => {
                Some(format!("/{patient_id}/{}/add", kind.route_segment()))
            }
            Route::Edit {
                patient_id,
                kind,
                record_id,
            } => Some(format!(
                "/{patient_id}/{}/{record_id}/edit",
                kind.route_segment()
            )),
            Route::NotFound => None,
        }
    }

    /// Where this route immediately redirects, if anywhere.
    pub fn redirect(&self, config: &ClientConfig) -> Option<Route> {
        match self {
            Route::Root => config
                .default_patient_id
                .as_deref()
                .map(|patient| Route::Dashboard {
                    patient_id: PatientId::from(patient),
                }),
            _ => None,
        }
    }

    pub fn patient_id(&self) -> Option<&PatientId> {
        match self {
            Route::Dashboard { patient_id }
            | Route::List { patient_id, .. }
            | Route::Add { patient_id, .. }
            | Route::Edit { patient_id, .. } => Some(patient_id),
            Route::Root | Route::NotFound => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_shapes() {
        assert_eq!(Route::parse("/"), Route::Root);
        assert_eq!(
            Route::parse("/PDG6U51W"),
            Route::Dashboard {
                patient_id: PatientId::from("PDG6U51W")
            }
        );
        assert_eq!(
            Route::parse("/P1/scans"),
            Route::List {
                patient_id: PatientId::from("P1"),
                kind: RecordKind::Scan
            }
        );
        assert_eq!(
            Route::parse("/P1/prescriptions/add"),
            Route::Add {
                patient_id: PatientId::from("P1"),
                kind: RecordKind::Prescription
            }
        );
        assert_eq!(
            Route::parse("/P1/analysis/42/edit?tab=files"),
            Route::Edit {
                patient_id: PatientId::from("P1"),
                kind: RecordKind::Analysis,
                record_id: ServerId::from("42")
            }
        );
    }

    #[test]
    fn test_unmatched_routes() {
        assert_eq!(Route::parse("/P1/xrays"), Route::NotFound);
        assert_eq!(Route::parse("/P1/scans/42"), Route::NotFound);
        assert_eq!(Route::parse("/P1/scans/42/view"), Route::NotFound);
        assert_eq!(Route::parse("/a/b/c/d/e"), Route::NotFound);
    }

    #[test]
    fn test_path_round_trip() {
        for path in ["/", "/P1", "/P1/analysis", "/P1/scans/add", "/P1/prescriptions/7/edit"] {
            assert_eq!(Route::parse(path).path().as_deref(), Some(path));
        }
        assert_eq!(Route::NotFound.path(), None);
    }

    #[test]
    fn test_root_redirect() {
        let mut config = ClientConfig::default();
        assert_eq!(Route::Root.redirect(&config), None);

        config.default_patient_id = Some("PDG6U51W".into());
        assert_eq!(
            Route::Root.redirect(&config),
            Some(Route::Dashboard {
                patient_id: PatientId::from("PDG6U51W")
            })
        );
        assert_eq!(Route::parse("/P1").redirect(&config), None);
    }
}
