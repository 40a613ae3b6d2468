use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_multipart::Multipart;
use actix_web::dev::{ServerHandle, ServiceResponse};
use actix_web::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpResponse, HttpServer};
use futures::{StreamExt, TryStreamExt};
use serde_json::{json, Value};

use crate::config::{EncoderConfig, HandlerConfig, TranscriptionConfig};
use crate::encoder::Encoder;
use crate::handlers::configure_routes;
use crate::handlers::routes::GREETING;
use crate::transcription_client::TranscriptionClient;

const BOUNDARY: &str = "----videorelaytestboundary";

/// One part of a hand-built multipart body
struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    data: &'a [u8],
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: video/webm\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        part.name
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(uri: &str, parts: &[Part<'_>]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}

fn video_part(data: &[u8]) -> Part<'_> {
    Part {
        name: "video",
        file_name: Some("a.webm"),
        data,
    }
}

fn other_part() -> Part<'static> {
    Part {
        name: "comment",
        file_name: None,
        data: b"no video here",
    }
}

/// Dependencies injected into the app under test
struct TestDeps {
    handler: HandlerConfig,
    client: TranscriptionClient,
    encoder: Encoder,
}

impl TestDeps {
    fn new(temp_dir: &Path) -> Self {
        Self {
            handler: HandlerConfig {
                temp_dir: temp_dir.to_path_buf(),
                max_file_size: 1024,
            },
            client: TranscriptionClient::new(TranscriptionConfig {
                api_key: Some("test-key".to_string()),
                ..TranscriptionConfig::default()
            })
            .expect("client"),
            encoder: Encoder::new(EncoderConfig::default()),
        }
    }

    fn with_upstream(self, endpoint: String) -> Self {
        self.with_transcription(TranscriptionConfig {
            endpoint,
            api_key: Some("test-key".to_string()),
            timeout_seconds: 10,
            ..TranscriptionConfig::default()
        })
    }

    fn with_transcription(mut self, config: TranscriptionConfig) -> Self {
        self.client = TranscriptionClient::new(config).expect("client");
        self
    }

    fn with_encoder(mut self, config: EncoderConfig) -> Self {
        self.encoder = Encoder::new(config);
        self
    }
}

async fn call(deps: TestDeps, req: test::TestRequest) -> ServiceResponse {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(deps.handler))
            .app_data(web::Data::new(deps.client))
            .app_data(web::Data::new(deps.encoder))
            .configure(configure_routes),
    )
    .await;
    test::call_service(&app, req.to_request()).await
}

async fn json_body(resp: ServiceResponse) -> Value {
    let bytes = test::read_body(resp).await;
    serde_json::from_slice(&bytes).expect("json body")
}

fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|rd| rd.count()).unwrap_or(0)
}

/// Encoder that runs `sh <script>` so the script needs no exec permission
fn script_encoder(script_dir: &Path, body: &str) -> EncoderConfig {
    let script = script_dir.join("fake_encoder.sh");
    fs::write(&script, body).expect("write script");
    EncoderConfig {
        command: "sh".to_string(),
        extra_args: vec![script.to_string_lossy().into_owned()],
        timeout_seconds: 30,
        ..EncoderConfig::default()
    }
}

// ---- fake transcription service ----

#[derive(Debug, Clone)]
struct ReceivedField {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

struct FakeUpstream {
    status: StatusCode,
    body: String,
    delay: Duration,
    received: Arc<Mutex<Vec<ReceivedField>>>,
}

async fn fake_transcribe(mut form: Multipart, state: web::Data<FakeUpstream>) -> HttpResponse {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    while let Ok(Some(mut field)) = form.try_next().await {
        let cd = field.content_disposition().cloned();
        let mut data = Vec::new();
        while let Some(Ok(chunk)) = field.next().await {
            data.extend_from_slice(&chunk);
        }
        state
            .received
            .lock()
            .expect("lock")
            .push(ReceivedField {
                name: cd
                    .as_ref()
                    .and_then(|cd| cd.get_name())
                    .unwrap_or_default()
                    .to_string(),
                file_name: cd.as_ref().and_then(|cd| cd.get_filename()).map(String::from),
                content_type: field.content_type().map(|m| m.to_string()),
                data,
            });
    }

    HttpResponse::build(state.status)
        .content_type("application/json")
        .body(state.body.clone())
}

/// Start the fake service, returning its URL, the recorded fields and a handle
fn start_upstream(
    status: StatusCode,
    body: &str,
) -> (String, Arc<Mutex<Vec<ReceivedField>>>, ServerHandle) {
    start_delayed_upstream(status, body, Duration::ZERO)
}

/// Same as `start_upstream`, answering only after `delay`
fn start_delayed_upstream(
    status: StatusCode,
    body: &str,
    delay: Duration,
) -> (String, Arc<Mutex<Vec<ReceivedField>>>, ServerHandle) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = web::Data::new(FakeUpstream {
        status,
        body: body.to_string(),
        delay,
        received: received.clone(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/transcribe", web::post().to(fake_transcribe))
    })
    .workers(1)
    .listen(listener)
    .expect("listen")
    .run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    (
        format!("http://127.0.0.1:{}/transcribe", port),
        received,
        handle,
    )
}

// ---- root ----

#[actix_web::test]
async fn test_index_returns_greeting() {
    let dir = tempfile::tempdir().expect("temp dir");
    let resp = call(
        TestDeps::new(dir.path()),
        test::TestRequest::get().uri("/"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, GREETING.as_bytes());
}

// ---- missing upload ----

#[actix_web::test]
async fn test_transcribe_without_video_is_bad_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    let resp = call(
        TestDeps::new(dir.path()),
        upload_request("/api/transcribe", &[other_part()]),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "No video file uploaded" })
    );
}

#[actix_web::test]
async fn test_convert_without_video_is_bad_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    let resp = call(
        TestDeps::new(dir.path()),
        upload_request("/api/convert-to-mp4", &[other_part()]),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "No video file uploaded" })
    );
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_non_multipart_request_is_bad_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    let req = test::TestRequest::post()
        .uri("/api/convert-to-mp4")
        .insert_header((CONTENT_TYPE, "application/json"))
        .set_payload("{}");
    let resp = call(TestDeps::new(dir.path()), req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "No video file uploaded" })
    );
}

#[actix_web::test]
async fn test_text_video_field_is_not_an_upload() {
    let dir = tempfile::tempdir().expect("temp dir");
    let scripts = tempfile::tempdir().expect("script dir");
    let encoder = script_encoder(
        scripts.path(),
        "for last in \"$@\"; do :; done\ncp \"$3\" \"$last\"\n",
    );
    let text_video = Part {
        name: "video",
        file_name: None,
        data: b"plain text",
    };

    let resp = call(
        TestDeps::new(dir.path()).with_encoder(encoder),
        upload_request("/api/convert-to-mp4", &[text_video]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "No video file uploaded" })
    );
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_file_part_after_text_video_field_is_used() {
    let dir = tempfile::tempdir().expect("temp dir");
    let scripts = tempfile::tempdir().expect("script dir");
    let encoder = script_encoder(
        scripts.path(),
        "for last in \"$@\"; do :; done\ncp \"$3\" \"$last\"\n",
    );
    let text_video = Part {
        name: "video",
        file_name: None,
        data: b"plain text",
    };

    let resp = call(
        TestDeps::new(dir.path()).with_encoder(encoder),
        upload_request(
            "/api/convert-to-mp4",
            &[text_video, video_part(b"real-file")],
        ),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "real-file".as_bytes());
}

#[actix_web::test]
async fn test_multipart_without_boundary_is_bad_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    let req = test::TestRequest::post()
        .uri("/api/transcribe")
        .insert_header((CONTENT_TYPE, "multipart/form-data"))
        .set_payload(multipart_body(&[video_part(b"data")]));

    let resp = call(TestDeps::new(dir.path()), req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .starts_with("Form error"));
}

#[actix_web::test]
async fn test_upload_over_limit_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let big = vec![0u8; 4096];
    let resp = call(
        TestDeps::new(dir.path()),
        upload_request("/api/convert-to-mp4", &[video_part(&big)]),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(entries(dir.path()), 0);
}

// ---- transcription ----

#[actix_web::test]
async fn test_transcribe_relays_upstream_value() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (url, received, handle) = start_upstream(
        StatusCode::OK,
        r#"{"transcription": {"text": "hello there", "words": 2}, "latency_ms": 12}"#,
    );

    let resp = call(
        TestDeps::new(dir.path()).with_upstream(url),
        upload_request("/api/transcribe", &[other_part(), video_part(b"0123456789")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        json_body(resp).await,
        json!({ "transcription": { "text": "hello there", "words": 2 } })
    );

    let received = received.lock().expect("lock").clone();
    let field = |name: &str| {
        received
            .iter()
            .find(|f| f.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("upstream did not receive '{}'", name))
    };
    let video = field("video");
    assert_eq!(video.data, b"0123456789");
    assert_eq!(video.file_name.as_deref(), Some("input.webm"));
    assert_eq!(video.content_type.as_deref(), Some("video/webm"));
    assert_eq!(field("api_key").data, b"test-key");
    assert_eq!(field("tier").data, b"free");

    handle.stop(false).await;
}

#[actix_web::test]
async fn test_transcribe_relays_plain_string() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (url, _, handle) = start_upstream(StatusCode::OK, r#"{"transcription": "hi"}"#);

    let resp = call(
        TestDeps::new(dir.path()).with_upstream(url),
        upload_request("/api/transcribe", &[video_part(b"data")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "transcription": "hi" }));
    handle.stop(false).await;
}

#[actix_web::test]
async fn test_transcribe_upstream_error_status_is_generic() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (url, _, handle) = start_upstream(
        StatusCode::BAD_GATEWAY,
        r#"{"detail": "Traceback (most recent call last): secret internals"}"#,
    );

    let resp = call(
        TestDeps::new(dir.path()).with_upstream(url),
        upload_request("/api/transcribe", &[video_part(b"data")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "Failed to transcribe video" })
    );
    handle.stop(false).await;
}

#[actix_web::test]
async fn test_transcribe_malformed_upstream_body_is_generic() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (url, _, handle) = start_upstream(StatusCode::OK, "not json at all");

    let resp = call(
        TestDeps::new(dir.path()).with_upstream(url),
        upload_request("/api/transcribe", &[video_part(b"data")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "Failed to transcribe video" })
    );
    handle.stop(false).await;
}

#[actix_web::test]
async fn test_transcribe_unreachable_upstream_is_generic() {
    let dir = tempfile::tempdir().expect("temp dir");
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let resp = call(
        TestDeps::new(dir.path()).with_upstream(format!("http://127.0.0.1:{}/transcribe", port)),
        upload_request("/api/transcribe", &[video_part(b"data")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "Failed to transcribe video" })
    );
}

#[actix_web::test]
async fn test_transcribe_upstream_timeout_is_generic() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (url, _, handle) = start_delayed_upstream(
        StatusCode::OK,
        r#"{"transcription": "too late"}"#,
        Duration::from_secs(3),
    );
    let deps = TestDeps::new(dir.path()).with_transcription(TranscriptionConfig {
        endpoint: url,
        api_key: Some("test-key".to_string()),
        timeout_seconds: 1,
        ..TranscriptionConfig::default()
    });

    let start = Instant::now();
    let resp = call(
        deps,
        upload_request("/api/transcribe", &[video_part(b"data")]),
    )
    .await;

    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "Failed to transcribe video" })
    );
    handle.stop(false).await;
}

#[actix_web::test]
async fn test_transcribe_without_api_key_makes_no_upstream_call() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (url, received, handle) =
        start_upstream(StatusCode::OK, r#"{"transcription": "unexpected"}"#);
    let deps = TestDeps::new(dir.path()).with_transcription(TranscriptionConfig {
        endpoint: url,
        api_key: None,
        timeout_seconds: 10,
        ..TranscriptionConfig::default()
    });

    let resp = call(
        deps,
        upload_request("/api/transcribe", &[video_part(b"data")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "Failed to transcribe video" })
    );
    assert!(received.lock().expect("lock").is_empty());
    handle.stop(false).await;
}

// ---- conversion ----

#[actix_web::test]
async fn test_convert_with_missing_encoder_reports_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let deps = TestDeps::new(dir.path()).with_encoder(EncoderConfig {
        command: "video-relay-encoder-that-does-not-exist".to_string(),
        ..EncoderConfig::default()
    });

    let resp = call(
        deps,
        upload_request("/api/convert-to-mp4", &[video_part(b"0123456789")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "Conversion failed");
    assert!(body["details"]
        .as_str()
        .expect("details string")
        .contains("not found"));
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_convert_success_returns_mp4_attachment() {
    let dir = tempfile::tempdir().expect("temp dir");
    let scripts = tempfile::tempdir().expect("script dir");
    // Last argument is the output path
    let encoder = script_encoder(
        scripts.path(),
        "for last in \"$@\"; do :; done\nprintf 'MP4DATA' > \"$last\"\n",
    );

    let resp = call(
        TestDeps::new(dir.path()).with_encoder(encoder),
        upload_request("/api/convert-to-mp4", &[video_part(b"0123456789")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("video/mp4")
    );
    assert_eq!(
        resp.headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\"converted_video.mp4\"")
    );
    assert_eq!(test::read_body(resp).await, "MP4DATA".as_bytes());
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_convert_encoder_failure_includes_stderr() {
    let dir = tempfile::tempdir().expect("temp dir");
    let scripts = tempfile::tempdir().expect("script dir");
    // Leaves a partial output behind before failing
    let encoder = script_encoder(
        scripts.path(),
        "for last in \"$@\"; do :; done\nprintf 'partial' > \"$last\"\necho 'a.webm: Invalid data found when processing input' >&2\nexit 1\n",
    );

    let resp = call(
        TestDeps::new(dir.path()).with_encoder(encoder),
        upload_request("/api/convert-to-mp4", &[video_part(b"0123456789")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(resp).await,
        json!({
            "error": "Conversion failed",
            "details": "a.webm: Invalid data found when processing input"
        })
    );
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_encoder_receives_uploaded_bytes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let scripts = tempfile::tempdir().expect("script dir");
    // $3 is the input path; echo it back as the output
    let encoder = script_encoder(
        scripts.path(),
        "for last in \"$@\"; do :; done\ncp \"$3\" \"$last\"\n",
    );

    let resp = call(
        TestDeps::new(dir.path()).with_encoder(encoder),
        upload_request("/api/convert-to-mp4", &[video_part(b"webm-bytes")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "webm-bytes".as_bytes());
    assert_eq!(entries(dir.path()), 0);
}

#[actix_web::test]
async fn test_convert_without_encoder_output_is_conversion_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let scripts = tempfile::tempdir().expect("script dir");
    let encoder = script_encoder(scripts.path(), "exit 0\n");

    let resp = call(
        TestDeps::new(dir.path()).with_encoder(encoder),
        upload_request("/api/convert-to-mp4", &[video_part(b"0123456789")]),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "Conversion failed");
    assert!(body["details"]
        .as_str()
        .expect("details string")
        .contains("no readable output"));
    assert_eq!(entries(dir.path()), 0);
}
