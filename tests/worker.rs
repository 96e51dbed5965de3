//! End-to-end tests: drive the worker router with a mock engine and a
//! local fixture server standing in for the reference-audio host.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use voiceclone_worker::api::routes::{create_router, AppState};
use voiceclone_worker::error::WorkerError;
use voiceclone_worker::job::JobHandler;
use voiceclone_worker::tts::{SynthesisRequest, VoiceCloneEngine};

const REFERENCE: &[u8] = b"RIFFxxxxWAVEreference-bytes";
const GENERATED: &[u8] = b"RIFFyyyyWAVEgenerated-bytes";

/// Records what the job pipeline asked of it and writes canned audio.
struct MockEngine {
    loads: AtomicUsize,
    synth_calls: AtomicUsize,
    scratch_paths: Mutex<Vec<(PathBuf, PathBuf)>>,
    languages_seen: Mutex<Vec<Option<String>>>,
    default_language: Option<&'static str>,
    fail_synthesis: bool,
}

impl MockEngine {
    fn multilingual() -> Self {
        Self {
            loads: AtomicUsize::new(0),
            synth_calls: AtomicUsize::new(0),
            scratch_paths: Mutex::new(Vec::new()),
            languages_seen: Mutex::new(Vec::new()),
            default_language: Some("en"),
            fail_synthesis: false,
        }
    }

    fn monolingual() -> Self {
        Self {
            default_language: None,
            ..Self::multilingual()
        }
    }

    fn failing() -> Self {
        Self {
            fail_synthesis: true,
            ..Self::multilingual()
        }
    }
}

impl VoiceCloneEngine for MockEngine {
    fn load(&self) -> Result<(), WorkerError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn synthesize(&self, request: &SynthesisRequest) -> Result<(), WorkerError> {
        self.synth_calls.fetch_add(1, Ordering::SeqCst);
        self.scratch_paths
            .lock()
            .unwrap()
            .push((request.reference.clone(), request.output.clone()));
        self.languages_seen
            .lock()
            .unwrap()
            .push(request.language.clone());

        // The reference must be staged before synthesis runs.
        let staged = std::fs::read(&request.reference)?;
        assert_eq!(staged, REFERENCE);

        if self.fail_synthesis {
            return Err(WorkerError::Synthesis("vocoder exploded".to_string()));
        }
        std::fs::write(&request.output, GENERATED)?;
        Ok(())
    }

    fn default_language(&self) -> Option<&str> {
        self.default_language
    }
}

/// Serve the reference fixture on an ephemeral local port.
async fn spawn_fixture() -> SocketAddr {
    let app = Router::new()
        .route(
            "/ref.wav",
            get(|| async { ([(header::CONTENT_TYPE, "audio/wav")], REFERENCE) }),
        )
        .route("/missing.wav", get(|| async { StatusCode::NOT_FOUND }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn worker_app(engine: Arc<MockEngine>) -> Router {
    let handler = JobHandler::new(engine, Duration::from_secs(5));
    create_router(Arc::new(AppState { handler }))
}

async fn post_job(app: Router, body: Value) -> Value {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/run")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn successful_job_returns_encoded_audio() {
    let fixture = spawn_fixture().await;
    let engine = Arc::new(MockEngine::multilingual());

    let result = post_job(
        worker_app(engine.clone()),
        json!({
            "input": {
                "text": "Hello world",
                "reference_audio_url": format!("http://{}/ref.wav", fixture),
            }
        }),
    )
    .await;

    let decoded = STANDARD
        .decode(result["audio_base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, GENERATED);
    assert_eq!(result["audio_size_bytes"], GENERATED.len());
    assert_eq!(result["text_length"], 11);
    assert_eq!(result["language"], "en");
    assert!(result["generation_time"].as_f64().unwrap() >= 0.0);
    assert!(result.get("error").is_none());
    assert_eq!(engine.synth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scratch_files_are_gone_after_success() {
    let fixture = spawn_fixture().await;
    let engine = Arc::new(MockEngine::multilingual());

    post_job(
        worker_app(engine.clone()),
        json!({
            "input": {
                "text": "cleanup please",
                "reference_audio_url": format!("http://{}/ref.wav", fixture),
            }
        }),
    )
    .await;

    let paths = engine.scratch_paths.lock().unwrap();
    let (reference, output) = paths.first().expect("engine was invoked");
    assert!(!reference.exists());
    assert!(!output.exists());
}

#[tokio::test]
async fn scratch_files_are_gone_after_engine_failure() {
    let fixture = spawn_fixture().await;
    let engine = Arc::new(MockEngine::failing());

    let result = post_job(
        worker_app(engine.clone()),
        json!({
            "input": {
                "text": "this will fail",
                "reference_audio_url": format!("http://{}/ref.wav", fixture),
            }
        }),
    )
    .await;

    assert_eq!(
        result["error"],
        "Error during inference: Synthesis failed: vocoder exploded"
    );
    assert!(result["traceback"].is_string());

    let paths = engine.scratch_paths.lock().unwrap();
    let (reference, output) = paths.first().expect("engine was invoked");
    assert!(!reference.exists());
    assert!(!output.exists());
}

#[tokio::test]
async fn requested_language_is_passed_through_and_echoed() {
    let fixture = spawn_fixture().await;
    let engine = Arc::new(MockEngine::multilingual());

    let result = post_job(
        worker_app(engine.clone()),
        json!({
            "input": {
                "text": "Hola",
                "reference_audio_url": format!("http://{}/ref.wav", fixture),
                "language": "es",
            }
        }),
    )
    .await;

    assert_eq!(result["language"], "es");
    let languages = engine.languages_seen.lock().unwrap();
    assert_eq!(*languages, vec![Some("es".to_string())]);
}

#[tokio::test]
async fn monolingual_engine_reports_no_language() {
    let fixture = spawn_fixture().await;
    let engine = Arc::new(MockEngine::monolingual());

    let result = post_job(
        worker_app(engine),
        json!({
            "input": {
                "text": "Hello",
                "reference_audio_url": format!("http://{}/ref.wav", fixture),
            }
        }),
    )
    .await;

    assert!(result.get("language").is_none());
    assert!(result["audio_base64"].is_string());
}

#[tokio::test]
async fn missing_text_does_not_fetch_or_synthesize() {
    let engine = Arc::new(MockEngine::multilingual());

    let result = post_job(
        worker_app(engine.clone()),
        json!({
            "input": {
                "reference_audio_url": "http://127.0.0.1:1/unreachable.wav",
            }
        }),
    )
    .await;

    assert_eq!(result["error"], "Missing required parameter: text");
    assert!(result.get("traceback").is_none());
    assert_eq!(engine.synth_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_reference_url_is_reported() {
    let engine = Arc::new(MockEngine::multilingual());

    let result = post_job(
        worker_app(engine.clone()),
        json!({"input": {"text": "Hello world"}}),
    )
    .await;

    assert_eq!(
        result["error"],
        "Missing required parameter: reference_audio_url"
    );
    assert_eq!(engine.synth_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fetch_failure_becomes_a_job_error() {
    let fixture = spawn_fixture().await;
    let engine = Arc::new(MockEngine::multilingual());

    let result = post_job(
        worker_app(engine.clone()),
        json!({
            "input": {
                "text": "Hello",
                "reference_audio_url": format!("http://{}/missing.wav", fixture),
            }
        }),
    )
    .await;

    let error = result["error"].as_str().unwrap();
    assert!(
        error.starts_with("Error during inference: Failed to download reference audio:"),
        "unexpected error: {}",
        error
    );
    assert!(result["traceback"].is_string());
    assert_eq!(engine.synth_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn job_id_is_accepted_in_the_envelope() {
    let fixture = spawn_fixture().await;
    let engine = Arc::new(MockEngine::multilingual());

    let result = post_job(
        worker_app(engine),
        json!({
            "id": "job-42",
            "input": {
                "text": "Hi",
                "reference_audio_url": format!("http://{}/ref.wav", fixture),
            }
        }),
    )
    .await;

    assert!(result["audio_base64"].is_string());
}

#[tokio::test]
async fn health_reports_ok() {
    let engine = Arc::new(MockEngine::multilingual());
    let response = worker_app(engine)
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
