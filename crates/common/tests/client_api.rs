//! Conversion client and SMS transport against an in-process fake service

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;
use tempfile::TempDir;

use flowlab_common::alert::{Alerter, Priority, TwilioTransport};
use flowlab_common::config::{AlertConfig, ApiConfig};
use flowlab_common::{ConversionClient, ConvertOptions, Error, JobOutcome, Platform};

#[derive(Clone, Default)]
struct FakeApi {
    polls: Arc<AtomicUsize>,
    uploads: Arc<Mutex<Vec<String>>>,
    sms: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn convert(State(api): State<FakeApi>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    if headers.get("x-api-key").map(|v| v.as_bytes()) != Some(&b"secret"[..]) {
        return (StatusCode::UNAUTHORIZED, "missing key").into_response();
    }
    let text = String::from_utf8_lossy(&body).to_string();
    api.uploads.lock().unwrap().push(text);
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "jobId": "job-1",
            "status": "pending",
            "statusUrl": "/api/v1/jobs/job-1",
            "filesUrl": "/api/v1/jobs/job-1/files"
        })),
    )
        .into_response()
}

async fn job(State(api): State<FakeApi>, Path(id): Path<String>) -> Json<serde_json::Value> {
    match id.as_str() {
        "job-1" => {
            let n = api.polls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Json(json!({"status": "processing"}))
            } else {
                Json(json!({"status": "completed", "jobId": "job-1"}))
            }
        }
        "job-bad" => Json(json!({"status": "failed", "error": "unsupported activity"})),
        "job-null" => {
            let n = api.polls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Json(json!({"status": null}))
            } else {
                Json(json!({"status": "completed"}))
            }
        }
        _ => Json(json!({"status": "pending", "progress": 10})),
    }
}

async fn files(Path(id): Path<String>, Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
    if id != "job-1" || q.get("format").map(String::as_str) != Some("zip") {
        return (StatusCode::NOT_FOUND, Vec::new());
    }
    (StatusCode::OK, b"PK\x03\x04converted".to_vec())
}

async fn messages(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> StatusCode {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !authorized {
        return StatusCode::UNAUTHORIZED;
    }
    api.sms.lock().unwrap().push(form);
    StatusCode::CREATED
}

async fn fake() -> (FakeApi, String) {
    let api = FakeApi::default();
    let app = Router::new()
        .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
        .route("/api/v1/convert", post(convert))
        .route("/api/v1/assess", post(|| async { Json(json!({"complexity": "low"})) }))
        .route("/api/v1/jobs/:id", get(job))
        .route("/api/v1/jobs/:id/files", get(files))
        .route("/2010-04-01/Accounts/:sid/Messages.json", post(messages))
        .with_state(api.clone());
    let url = spawn(app).await;
    (api, url)
}

fn client(base_url: &str, key: Option<&str>) -> ConversionClient {
    ConversionClient::new(&ApiConfig {
        base_url: base_url.to_string(),
        api_key: key.map(String::from),
        ..Default::default()
    })
    .unwrap()
}

fn package(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("Simple_File_Create.nupkg");
    std::fs::write(&path, b"PK\x03\x04fixture").unwrap();
    path
}

#[tokio::test]
async fn test_health_check() {
    let (_, url) = fake().await;
    let health = client(&url, None).health_check().await.unwrap();
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_convert_poll_download() {
    let (api, url) = fake().await;
    let tmp = TempDir::new().unwrap();
    let client = client(&url, Some("secret"));

    let submitted = client
        .convert(&package(&tmp), Platform::UiPath, Platform::FlowBots, ConvertOptions::default())
        .await
        .unwrap();
    assert_eq!(submitted.job_id.as_deref(), Some("job-1"));

    let upload = api.uploads.lock().unwrap()[0].clone();
    assert!(upload.contains("name=\"sourcePlatform\""));
    assert!(upload.contains("uipath"));
    assert!(upload.contains("name=\"generateDocumentation\""));
    assert!(upload.contains("filename=\"Simple_File_Create.nupkg\""));

    let outcome = client
        .wait_for_job("job-1", Duration::from_secs(5), Duration::from_millis(10))
        .await
        .unwrap();
    assert!(matches!(outcome, JobOutcome::Completed(_)));
    assert_eq!(api.polls.load(Ordering::SeqCst), 3);

    let out = tmp.path().join("converted");
    let zip = client.download_files("job-1", &out).await.unwrap().unwrap();
    assert_eq!(zip, out.join("job-1.zip"));
    assert!(std::fs::read(&zip).unwrap().starts_with(b"PK"));

    assert!(client.download_files("job-2", &out).await.unwrap().is_none());
}

#[tokio::test]
async fn test_convert_rejected_status_is_api_error() {
    let (_, url) = fake().await;
    let tmp = TempDir::new().unwrap();
    let err = client(&url, None)
        .convert(&package(&tmp), Platform::UiPath, Platform::FlowBots, ConvertOptions::default())
        .await
        .unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "missing key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unsupported_direction_makes_no_request() {
    let (api, url) = fake().await;
    let tmp = TempDir::new().unwrap();
    let err = client(&url, Some("secret"))
        .convert(&package(&tmp), Platform::PowerAutomateCloud, Platform::UiPath, ConvertOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedPlatform { .. }));
    assert!(api.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_and_timed_out_jobs() {
    let (_, url) = fake().await;
    let client = client(&url, None);

    match client
        .wait_for_job("job-bad", Duration::from_secs(5), Duration::from_millis(10))
        .await
        .unwrap()
    {
        JobOutcome::Failed(status) => {
            assert_eq!(status.error_message().as_deref(), Some("unsupported activity"))
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let outcome = client
        .wait_for_job("job-stuck", Duration::from_millis(200), Duration::from_millis(20))
        .await
        .unwrap();
    match outcome {
        JobOutcome::TimedOut { last, .. } => {
            let last = last.expect("last polled status");
            assert_eq!(last.extra.get("progress").unwrap(), 10);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_null_status_is_polled_until_terminal() {
    let (api, url) = fake().await;
    let outcome = client(&url, None)
        .wait_for_job("job-null", Duration::from_secs(5), Duration::from_millis(10))
        .await
        .unwrap();
    assert!(matches!(outcome, JobOutcome::Completed(_)));
    assert_eq!(api.polls.load(Ordering::SeqCst), 3);
}

async fn record_key(State(seen): State<Arc<Mutex<Vec<Option<String>>>>>, headers: HeaderMap) -> &'static str {
    let key = headers
        .get("x-api-key")
        .map(|v| String::from_utf8_lossy(v.as_bytes()).to_string());
    seen.lock().unwrap().push(key);
    "ok"
}

#[tokio::test]
async fn test_api_key_not_sent_to_other_hosts() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let other = spawn(Router::new().route("/", get(record_key)).with_state(seen.clone())).await;
    let (_, api_url) = fake().await;

    let resp = client(&api_url, Some("secret"))
        .get_raw(&format!("{}/", other), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(resp.status, 200);

    let resp = client(&other, Some("secret"))
        .get_raw("/", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(resp.status, 200);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[None, Some("secret".to_string())]);
}

#[tokio::test]
async fn test_assess() {
    let (_, url) = fake().await;
    let tmp = TempDir::new().unwrap();
    let report = client(&url, None)
        .assess(&package(&tmp), Platform::UiPath, Platform::PowerAutomateDesktop)
        .await
        .unwrap();
    assert_eq!(report["complexity"], "low");
}

#[tokio::test]
async fn test_twilio_transport_posts_form() {
    let (api, url) = fake().await;
    let config = AlertConfig {
        account_sid: Some("AC123".into()),
        auth_token: Some("token".into()),
        from_number: Some("+15550001".into()),
        to_number: Some("+15550002".into()),
        api_base: url,
        ..Default::default()
    };
    let transport = TwilioTransport::from_config(&config).unwrap();
    let alerter = Alerter::with_transport(Arc::new(transport), &config.prefix);

    assert!(alerter.send(Priority::Critical, "runner stalled").await);

    let sent = api.sms.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["Body"], "[CRITICAL] FLOWBOTS: runner stalled");
    assert_eq!(sent[0]["To"], "+15550002");
    assert_eq!(sent[0]["From"], "+15550001");
}
