//! `HttpBackend` against an in-process fake of the records API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{json, Value};

use medrecords_core::backend::{BackendError, RecordPayload, RecordsBackend, SearchFilter};
use medrecords_core::config::ClientConfig;
use medrecords_core::models::{PatientId, RecordKind, ServerId};
use medrecords_core::form::{FormError, FormMode, RecordForm};
use medrecords_core::list::{ListError, RecordList};
use medrecords_core::{Download, LocalFile, MedRecordsClient, PreviewRegistry, SpecialtyNormalizer};
use medrecords_http::HttpBackend;

#[derive(Debug, Clone)]
struct CapturedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Default)]
struct Captured {
    queries: Mutex<Vec<(String, HashMap<String, String>)>>,
    parts: Mutex<Vec<CapturedPart>>,
}

impl Captured {
    fn last_query(&self, path: &str) -> Option<HashMap<String, String>> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, q)| q.clone())
    }

    fn text_parts(&self, name: &str) -> Vec<String> {
        self.parts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.name == name && p.file_name.is_none())
            .map(|p| String::from_utf8_lossy(&p.data).into_owned())
            .collect()
    }

    fn file_parts(&self) -> Vec<CapturedPart> {
        self.parts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.file_name.is_some())
            .cloned()
            .collect()
    }
}

type Shared = Arc<Captured>;

fn analysis(id: u64, name: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "doctorName": "Dr A",
        "doctorSpecialty": "باطنة",
        "note": "",
        "createdAt": created_at,
        "fileUrls": ["a.jpg"]
    })
}

async fn patient_info(Path(patient): Path<String>) -> impl IntoResponse {
    if patient == "P1" {
        (
            StatusCode::OK,
            Json(json!({"name": "محمد علي", "age": 54, "phoneNumber": "0100", "address": "القاهرة"})),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"message": "المريض غير موجود"})))
    }
}

async fn list_records(Path((kind, _patient)): Path<(String, String)>) -> impl IntoResponse {
    match kind.as_str() {
        "analysis" => Json(json!([
            analysis(1, "CBC", "2024-03-01T08:00:00"),
            {"id": {"bad": true}, "name": "broken"},
            analysis(2, "Lipids", "2024-03-02T08:00:00"),
        ])),
        "scan" => Json(json!({"data": []})),
        _ => Json(json!([
            {"id": 7, "name": "Rx", "doctorName": "Dr New", "doctorSpecialty": "عيون",
             "createdAt": "2024-04-10T09:00:00", "fileUrls": []}
        ])),
    }
}

async fn search_records(
    State(captured): State<Shared>,
    Path((kind, patient)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    captured
        .queries
        .lock()
        .unwrap()
        .push((format!("/api/{kind}/patient/{patient}/search"), query));
    Json(json!([analysis(2, "Lipids", "2024-03-02T08:00:00")]))
}

async fn capture_multipart(captured: &Captured, mut multipart: Multipart) {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        parts.push(CapturedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    *captured.parts.lock().unwrap() = parts;
}

async fn create_record(
    State(captured): State<Shared>,
    Path((_kind, _patient)): Path<(String, String)>,
    multipart: Multipart,
) -> impl IntoResponse {
    capture_multipart(&captured, multipart).await;
    let name = captured.text_parts("name").pop().unwrap_or_default();
    (
        StatusCode::CREATED,
        Json(json!({"id": 42, "name": name, "createdAt": "2024-05-01T10:00:00Z"})),
    )
}

async fn get_record(Path((_kind, id)): Path<(String, String)>) -> impl IntoResponse {
    match id.as_str() {
        "500" => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
        "503" => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"message": "الخادم مشغول"})),
        )
            .into_response(),
        _ => Json(analysis(id.parse().unwrap_or(0), "CBC", "2024-03-01T08:00:00")).into_response(),
    }
}

async fn update_record(
    State(captured): State<Shared>,
    Path((_kind, id)): Path<(String, String)>,
    multipart: Multipart,
) -> impl IntoResponse {
    capture_multipart(&captured, multipart).await;
    if id == "404" {
        (StatusCode::NOT_FOUND, Json(json!({"message": "الأشعة غير موجودة"})))
    } else {
        (StatusCode::OK, Json(json!({"success": true})))
    }
}

async fn delete_record(Path((_kind, id)): Path<(String, String)>) -> impl IntoResponse {
    match id.as_str() {
        "409" => (StatusCode::CONFLICT, Json(json!({"message": "لا يمكن حذف التحليل"}))),
        "404" => (StatusCode::NOT_FOUND, Json(json!({"message": "التحليل غير موجود"}))),
        _ => (StatusCode::OK, Json(json!({}))),
    }
}

async fn doctors(
    State(captured): State<Shared>,
    Path(patient): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    captured
        .queries
        .lock()
        .unwrap()
        .push((format!("/api/doctors/patients/{patient}/all"), query));
    Json(json!([
        {"id": 1, "name": "Ahmed", "specialtyName": "قلب"},
        {"id": 2, "name": "Mona"}
    ]))
}

async fn upload(Path(file): Path<String>) -> impl IntoResponse {
    if file == "scan.jpg" {
        (StatusCode::OK, vec![1u8, 2, 3]).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn spawn_server() -> (ClientConfig, Shared) {
    let captured: Shared = Arc::new(Captured::default());
    let app = Router::new()
        .route("/api/patient/info/:patient", get(patient_info))
        .route("/api/doctors/patients/:patient/all", get(doctors))
        .route(
            "/api/:kind/patient/:patient",
            get(list_records).post(create_record),
        )
        .route("/api/:kind/patient/:patient/search", get(search_records))
        .route("/api/:kind/delete/:id", delete(delete_record))
        .route("/api/:kind/:id", get(get_record).put(update_record))
        .route("/uploads/:file", get(upload))
        .with_state(Arc::clone(&captured));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (ClientConfig::new(format!("http://{addr}")), captured)
}

fn patient() -> PatientId {
    PatientId::from("P1")
}

fn payload(files: Vec<LocalFile>, images_to_delete: Vec<String>) -> RecordPayload {
    RecordPayload {
        name: "CBC".into(),
        doctor_name: "Dr A".into(),
        note: "صائم".into(),
        specialty_id: 3,
        files,
        images_to_delete,
    }
}

#[tokio::test]
async fn test_patient_info_and_not_found() {
    let (config, _) = spawn_server().await;
    let backend = HttpBackend::new(&config).unwrap();

    let info = backend.patient_info(&patient()).await.unwrap();
    assert_eq!(info.name, "محمد علي");
    assert_eq!(info.age, 54);
    assert_eq!(info.phone.as_deref(), Some("0100"));

    let err = backend
        .patient_info(&PatientId::from("NOPE"))
        .await
        .unwrap_err();
    assert_eq!(err.server_message(), Some("المريض غير موجود"));
    assert!(matches!(err, BackendError::NotFound { .. }));
}

#[tokio::test]
async fn test_list_is_lenient() {
    let (config, _) = spawn_server().await;
    let backend = HttpBackend::new(&config).unwrap();

    let analyses = backend
        .list_records(RecordKind::Analysis, &patient())
        .await
        .unwrap();
    let titles: Vec<&str> = analyses.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["CBC", "Lipids"]);
    assert_eq!(analyses[0].specialty, "باطنة");
    assert_eq!(analyses[0].attachments, vec!["a.jpg".to_string()]);

    let scans = backend.list_records(RecordKind::Scan, &patient()).await.unwrap();
    assert!(scans.is_empty());
}

#[tokio::test]
async fn test_search_sends_filters() {
    let (config, captured) = spawn_server().await;
    let backend = HttpBackend::new(&config).unwrap();

    let filter = SearchFilter::new(Some(" دم "), NaiveDate::from_ymd_opt(2024, 3, 2));
    let found = backend
        .search_records(RecordKind::Analysis, &patient(), &filter)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let query = captured.last_query("/api/analysis/patient/P1/search").unwrap();
    assert_eq!(query.get("keyword").map(String::as_str), Some("دم"));
    assert_eq!(query.get("date").map(String::as_str), Some("2024-03-02"));

    let filter = SearchFilter::new(None, NaiveDate::from_ymd_opt(2024, 3, 2));
    backend
        .search_records(RecordKind::Analysis, &patient(), &filter)
        .await
        .unwrap();
    let query = captured.last_query("/api/analysis/patient/P1/search").unwrap();
    assert!(!query.contains_key("keyword"));
}

#[tokio::test]
async fn test_doctor_query_only_when_non_empty() {
    let (config, captured) = spawn_server().await;
    let backend = HttpBackend::new(&config).unwrap();
    let path = "/api/doctors/patients/P1/all";

    let doctors = backend.doctors_for_patient(&patient(), None).await.unwrap();
    assert_eq!(doctors.len(), 2);
    assert_eq!(doctors[0].specialty_name, "قلب");
    assert!(doctors[1].specialty_name.is_empty());
    assert!(captured.last_query(path).unwrap().is_empty());

    backend
        .doctors_for_patient(&patient(), Some("Ah"))
        .await
        .unwrap();
    assert_eq!(
        captured.last_query(path).unwrap().get("query").map(String::as_str),
        Some("Ah")
    );
}

#[tokio::test]
async fn test_create_sends_multipart() {
    let (config, captured) = spawn_server().await;
    let backend = HttpBackend::new(&config).unwrap();

    let files = vec![
        LocalFile::new("page1.jpg", vec![0xFF, 0xD8]),
        LocalFile::new("report.pdf", b"%PDF".to_vec()),
    ];
    let record = backend
        .create_record(RecordKind::Analysis, &patient(), payload(files, vec![]))
        .await
        .unwrap();
    assert_eq!(record.id, Some(ServerId::from("42")));
    assert_eq!(record.title, "CBC");

    assert_eq!(captured.text_parts("name"), vec!["CBC"]);
    assert_eq!(captured.text_parts("doctorName"), vec!["Dr A"]);
    assert_eq!(captured.text_parts("note"), vec!["صائم"]);
    assert_eq!(captured.text_parts("specialtyId"), vec!["3"]);
    assert!(captured.text_parts("imagesToDelete").is_empty());

    let files = captured.file_parts();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.name == "files"));
    assert_eq!(files[0].file_name.as_deref(), Some("page1.jpg"));
    assert_eq!(files[0].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(files[0].data, vec![0xFF, 0xD8]);
    assert_eq!(files[1].content_type.as_deref(), Some("application/pdf"));
}

#[tokio::test]
async fn test_update_sends_deletions_and_falls_back_to_sent_fields() {
    let (config, captured) = spawn_server().await;
    let backend = HttpBackend::new(&config).unwrap();

    let id = ServerId::from("12");
    let record = backend
        .update_record(
            RecordKind::Scan,
            &id,
            payload(
                vec![LocalFile::new("new.png", vec![1])],
                vec!["old1.jpg".into(), "old2.jpg".into()],
            ),
        )
        .await
        .unwrap();

    assert_eq!(
        captured.text_parts("imagesToDelete"),
        vec!["old1.jpg", "old2.jpg"]
    );
    assert_eq!(captured.file_parts()[0].file_name.as_deref(), Some("new.png"));

    // `{"success": true}` carries no record
    assert_eq!(record.id, Some(id));
    assert_eq!(record.specialty, "جراحة");
    assert_eq!(record.attachments, vec!["new.png".to_string()]);
}

#[tokio::test]
async fn test_delete_and_error_messages() {
    let (config, _) = spawn_server().await;
    let backend = HttpBackend::new(&config).unwrap();

    backend
        .delete_record(RecordKind::Analysis, &ServerId::from("5"))
        .await
        .unwrap();

    let err = backend
        .delete_record(RecordKind::Analysis, &ServerId::from("409"))
        .await
        .unwrap_err();
    assert_eq!(err.server_message(), Some("لا يمكن حذف التحليل"));
    assert!(matches!(err, BackendError::Status { status: 409, .. }));

    let err = backend
        .get_record(RecordKind::Analysis, &ServerId::from("500"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BackendError::Status {
            status: 500,
            message: None
        }
    );

    let err = backend
        .get_record(RecordKind::Analysis, &ServerId::from("503"))
        .await
        .unwrap_err();
    assert_eq!(err.server_message(), Some("الخادم مشغول"));
}

#[tokio::test]
async fn test_get_record() {
    let (config, _) = spawn_server().await;
    let backend = HttpBackend::new(&config).unwrap();

    let record = backend
        .get_record(RecordKind::Analysis, &ServerId::from("8"))
        .await
        .unwrap();
    assert_eq!(record.id, Some(ServerId::from("8")));
    assert_eq!(record.attachments, vec!["a.jpg".to_string()]);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&ClientConfig::new(format!("http://{addr}"))).unwrap();
    let err = backend.patient_info(&patient()).await.unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}

#[tokio::test]
async fn test_client_over_http() {
    let (config, _) = spawn_server().await;
    let backend = Arc::new(HttpBackend::new(&config).unwrap());
    let client = MedRecordsClient::new(config, backend);

    let view = client.dashboard(&patient()).await;
    assert_eq!(view.patient.as_ref().map(|p| p.name.as_str()), Some("محمد علي"));
    assert_eq!(view.counts.get(RecordKind::Analysis), Some(2));
    assert_eq!(view.counts.get(RecordKind::Scan), Some(0));
    assert_eq!(view.counts.get(RecordKind::Prescription), Some(1));
    assert_eq!(
        view.last_visit.as_ref().map(|v| v.doctor_name.as_str()),
        Some("Dr New")
    );
    assert!(!view.is_partial());

    let download = client
        .download_attachment(RecordKind::Scan, "MRI", "scan.jpg")
        .await;
    assert_eq!(
        download,
        Download::Saved {
            file_name: "أشعة_MRI.jpg".into(),
            bytes: vec![1, 2, 3],
        }
    );

    let missing = client
        .download_attachment(RecordKind::Scan, "MRI", "gone.jpg")
        .await;
    assert!(matches!(missing, Download::OpenExternally { .. }));
}

#[tokio::test]
async fn test_not_found_keeps_server_message() {
    let (config, _) = spawn_server().await;
    let backend = Arc::new(HttpBackend::new(&config).unwrap());

    let err = backend
        .delete_record(RecordKind::Analysis, &ServerId::from("404"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::NotFound { .. }));
    assert_eq!(err.server_message(), Some("التحليل غير موجود"));

    // The list engine surfaces it instead of the generic message
    let list = RecordList::new(Arc::clone(&backend), RecordKind::Analysis, patient());
    list.load(None, None).await.unwrap();
    assert_eq!(
        list.delete(&ServerId::from("404")).await.unwrap_err(),
        ListError::Delete {
            message: "التحليل غير موجود".into()
        }
    );

    // Same for an update submitted from the form
    let form = RecordForm::new(
        Arc::clone(&backend),
        SpecialtyNormalizer::default(),
        PreviewRegistry::new(),
        RecordKind::Scan,
        FormMode::Edit {
            patient_id: patient(),
            record_id: ServerId::from("404"),
        },
    );
    form.load().await.unwrap();
    assert_eq!(
        form.submit().await.unwrap_err(),
        FormError::Submit {
            message: "الأشعة غير موجودة".into()
        }
    );
}

#[tokio::test]
async fn test_not_found_without_message_carries_url() {
    let (config, _) = spawn_server().await;
    let backend = HttpBackend::new(&config).unwrap();

    let err = backend
        .fetch_attachment(&config.attachment_url("gone.jpg"))
        .await
        .unwrap_err();
    assert_eq!(err.server_message(), None);
    match err {
        BackendError::NotFound { target, message } => {
            assert!(target.ends_with("/uploads/gone.jpg"));
            assert!(message.is_none());
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}
