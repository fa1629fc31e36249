use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;
use xray_gate::{GateOutcome, TwoStageGate, preprocess_bytes};

use crate::{
    analysis::{AnalysisStore, InMemoryAnalysisStore},
    chat::{ChatBackend, GroqChatBackend, build_system_prompt},
    config::{MAX_BODY_BYTES, ServiceConfig},
    error::{ApiError, ApiResult, CHAT_UNAVAILABLE_MESSAGE},
    models::{
        AnalysisContext, AnalysisResult, ChatRequest, ChatResponse, InvalidImageResponse,
        PatientFields, PredictResponse, ReportRequest,
    },
    report::{REPORT_DOWNLOAD_NAME, ReportInput, render_report},
    uploads::{UploadStore, allowed_extension},
};

pub const UNPROCESSABLE_IMAGE_MESSAGE: &str =
    "Could not process the uploaded file. Please upload a valid image.";
pub const NOT_XRAY_MESSAGE: &str =
    "This does not appear to be a chest X-ray. Please upload a valid chest X-ray image.";

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    pub gate: TwoStageGate,
    pub uploads: Arc<UploadStore>,
    pub analyses: Arc<dyn AnalysisStore>,
    pub chat: Option<Arc<dyn ChatBackend>>,
}

impl AppState {
    /// Load both models, prepare the upload directory and, when an API key
    /// is configured, the chat backend. Model loading failures are fatal.
    pub async fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        let uploads = UploadStore::open(&config.upload_dir).await?;
        info!("Upload directory: {}", uploads.dir().display());

        let models_dir = config.models_dir.clone();
        let threads = config.onnx_intra_threads;
        let gate =
            tokio::task::spawn_blocking(move || xray_gate::load_gate(&models_dir, threads))
                .await??;

        let chat: Option<Arc<dyn ChatBackend>> = match &config.groq_api_key {
            Some(key) => Some(Arc::new(GroqChatBackend::new(key, &config.chat_model))),
            None => {
                warn!("GROQ_API_KEY not set; AI assistant disabled");
                None
            }
        };

        Ok(Self {
            gate,
            uploads: Arc::new(uploads),
            analyses: Arc::new(InMemoryAnalysisStore::new()),
            chat,
        })
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/predict", post(predict))
        .route("/chat", post(chat))
        .route("/download-report", post(download_report))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

struct UploadedFile {
    filename: String,
    bytes: Bytes,
}

#[derive(Default)]
struct PredictForm {
    xray: Option<UploadedFile>,
    patient: PatientFields,
}

async fn read_predict_form(multipart: &mut Multipart) -> ApiResult<PredictForm> {
    let mut form = PredictForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "xray" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.xray = Some(UploadedFile { filename, bytes });
            }
            "patient_name" => form.patient.name = field.text().await?.trim().to_string(),
            "patient_age" => form.patient.age = field.text().await?.trim().to_string(),
            "notes" => form.patient.notes = field.text().await?.trim().to_string(),
            _ => {}
        }
    }

    Ok(form)
}

fn invalid_image(message: &str) -> Response {
    Json(InvalidImageResponse::new(message)).into_response()
}

async fn predict(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Response> {
    let form = read_predict_form(&mut multipart).await?;

    let upload = form.xray.ok_or(ApiError::InvalidUpload)?;
    let extension = allowed_extension(&upload.filename).ok_or(ApiError::InvalidUpload)?;

    let image_filename = state.uploads.save_image(&upload.bytes, &extension).await?;
    info!("Received X-ray {} as {}", upload.filename, image_filename);

    let bytes = upload.bytes;
    let tensor = match tokio::task::spawn_blocking(move || preprocess_bytes(&bytes)).await? {
        Ok(tensor) => Arc::new(tensor),
        Err(e) => {
            warn!("Could not preprocess {}: {}", image_filename, e);
            return Ok(invalid_image(UNPROCESSABLE_IMAGE_MESSAGE));
        }
    };

    let outcome = state.gate.evaluate(tensor).await.inspect_err(|e| {
        error!("Inference failed for {}: {}", image_filename, e);
    })?;

    match outcome {
        GateOutcome::NotXray { .. } => Ok(invalid_image(NOT_XRAY_MESSAGE)),
        GateOutcome::Classified(diagnosis) => {
            let analysis = AnalysisResult::new(
                Uuid::new_v4().to_string(),
                &diagnosis,
                form.patient,
                image_filename,
            );
            state.analyses.save(analysis.clone()).await;
            Ok(Json(PredictResponse::from(&analysis)).into_response())
        }
    }
}

/// Inline context wins; otherwise look the id up. Unknown ids fall back to
/// "no report" rather than failing the chat.
async fn resolve_chat_context(
    state: &AppState,
    inline: Option<AnalysisContext>,
    analysis_id: Option<&str>,
) -> Option<AnalysisContext> {
    if inline.is_some() {
        return inline;
    }

    let id = analysis_id.map(str::trim).filter(|id| !id.is_empty())?;
    match state.analyses.get(id).await {
        Some(analysis) => Some(analysis.context()),
        None => {
            warn!("Chat referenced unknown or expired analysis {}", id);
            None
        }
    }
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload.map_err(ApiError::ChatRequest)?;
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::EmptyChatMessage);
    }

    let Some(backend) = state.chat.as_ref() else {
        return Ok(Json(ChatResponse {
            reply: CHAT_UNAVAILABLE_MESSAGE.to_string(),
        }));
    };

    let context =
        resolve_chat_context(&state, request.analysis, request.analysis_id.as_deref()).await;
    let system_prompt = build_system_prompt(context.as_ref());

    match backend.reply(&system_prompt, message).await {
        Ok(reply) => Ok(Json(ChatResponse { reply })),
        Err(e) => {
            error!("Chat error: {:#}", e);
            Err(ApiError::Chat(e.to_string()))
        }
    }
}

const PDF_CONTENT_DISPOSITION: &str = "attachment; filename=\"PneumoScan_Report.pdf\"";

/// The body is parsed as JSON whatever its declared content type.
async fn download_report(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request: ReportRequest = serde_json::from_slice(&body).map_err(ApiError::ReportRequest)?;

    let image_path = match request.image_filename.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => state.uploads.resolve(name).await,
        _ => None,
    };

    let input = ReportInput::from_request(request, image_path);
    let pdf = tokio::task::spawn_blocking(move || render_report(&input))
        .await?
        .map_err(|e| ApiError::Report(e.to_string()))?;

    let report_path = state.uploads.new_report_path();
    tokio::fs::write(&report_path, &pdf).await?;
    info!(
        "Generated {} ({} bytes) as {}",
        REPORT_DOWNLOAD_NAME,
        pdf.len(),
        report_path.display()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static(PDF_CONTENT_DISPOSITION),
            ),
        ],
        pdf,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EMPTY_CHAT_MESSAGE, INVALID_UPLOAD_MESSAGE};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use xray_gate::{Classifier, GateError, ImageTensor};

    const BOUNDARY: &str = "pneumoscan-test-boundary";

    struct FixedScore {
        score: Result<f32, String>,
        calls: AtomicUsize,
    }

    impl FixedScore {
        fn ok(score: f32) -> Arc<Self> {
            Arc::new(Self {
                score: Ok(score),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                score: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for FixedScore {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn score(&self, _input: Arc<ImageTensor>) -> xray_gate::Result<f32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.score.clone().map_err(GateError::Inference)
        }
    }

    struct RecordingChat {
        reply: Result<String, String>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl RecordingChat {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err("upstream 503".to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_system_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().unwrap().0.clone()
        }
    }

    #[async_trait]
    impl ChatBackend for RecordingChat {
        async fn reply(&self, system_prompt: &str, message: &str) -> anyhow::Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), message.to_string()));
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    struct Harness {
        app: Router,
        analyses: Arc<InMemoryAnalysisStore>,
        classifier: Arc<FixedScore>,
        upload_dir: tempfile::TempDir,
    }

    async fn harness(
        gate: Arc<FixedScore>,
        classifier: Arc<FixedScore>,
        chat: Option<Arc<dyn ChatBackend>>,
    ) -> Harness {
        let upload_dir = tempfile::tempdir().unwrap();
        let analyses = Arc::new(InMemoryAnalysisStore::new());
        let state = AppState {
            gate: TwoStageGate::new(gate, classifier.clone()),
            uploads: Arc::new(UploadStore::open(upload_dir.path()).await.unwrap()),
            analyses: analyses.clone(),
            chat,
        };

        Harness {
            app: build_router(state),
            analyses,
            classifier,
            upload_dir,
        }
    }

    fn png_fixture() -> Vec<u8> {
        let img = image::GrayImage::from_fn(64, 64, |x, y| image::Luma([((x + y) * 2) as u8]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn multipart_request(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"xray\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_predict_known_normal_xray() {
        let h = harness(FixedScore::ok(0.92), FixedScore::ok(0.12), None).await;
        let png = png_fixture();

        let (status, body) = send_json(
            &h.app,
            multipart_request(
                Some(("chest.PNG", &png)),
                &[("patient_name", "  Jane Roe "), ("patient_age", "54"), ("notes", "cough")],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "NORMAL");
        assert_eq!(body["confidence"], 88.0);
        assert_eq!(body["pneumonia_prob"], 12.0);
        assert_eq!(body["normal_prob"], 88.0);
        assert_eq!(body["patient_name"], "Jane Roe");
        assert_eq!(body["patient_age"], "54");
        assert_eq!(body["notes"], "cough");

        let filename = body["image_filename"].as_str().unwrap();
        assert!(filename.ends_with(".png"));
        assert!(h.upload_dir.path().join(filename).exists());

        let id = body["analysis_id"].as_str().unwrap();
        let stored = h.analyses.get(id).await.unwrap();
        assert_eq!(stored.image_filename, filename);
    }

    #[tokio::test]
    async fn test_predict_rejected_by_gate() {
        let h = harness(FixedScore::ok(0.3), FixedScore::ok(0.9), None).await;
        let png = png_fixture();

        let (status, body) =
            send_json(&h.app, multipart_request(Some(("cat.jpg", &png)), &[])).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "prediction": "Invalid Image", "message": NOT_XRAY_MESSAGE })
        );
        assert_eq!(h.classifier.calls(), 0);
        assert!(h.analyses.is_empty());
    }

    #[tokio::test]
    async fn test_predict_rejects_disallowed_extension() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), None).await;
        let png = png_fixture();

        let (status, body) =
            send_json(&h.app, multipart_request(Some(("scan.txt", &png)), &[])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": INVALID_UPLOAD_MESSAGE }));
        assert!(std::fs::read_dir(h.upload_dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_predict_requires_file() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), None).await;

        let (status, body) =
            send_json(&h.app, multipart_request(None, &[("patient_name", "x")])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_UPLOAD_MESSAGE);
    }

    #[tokio::test]
    async fn test_predict_corrupt_image_is_invalid_not_error() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), None).await;

        let (status, body) = send_json(
            &h.app,
            multipart_request(Some(("broken.png", b"\x89PNG garbage")), &[]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "Invalid Image");
        assert_eq!(body["message"], UNPROCESSABLE_IMAGE_MESSAGE);
        assert_eq!(h.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_predict_stage_failures_are_server_errors() {
        let png = png_fixture();

        let h = harness(FixedScore::failing("detector offline"), FixedScore::ok(0.5), None).await;
        let (status, body) =
            send_json(&h.app, multipart_request(Some(("a.png", &png)), &[])).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("X-ray detection failed:"));
        assert!(error.contains("detector offline"));

        let h = harness(FixedScore::ok(0.8), FixedScore::failing("bad output"), None).await;
        let (status, body) =
            send_json(&h.app, multipart_request(Some(("a.png", &png)), &[])).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Pneumonia prediction failed:")
        );
        assert!(h.analyses.is_empty());
    }

    #[tokio::test]
    async fn test_predictions_keep_separate_analyses() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.8), None).await;
        let png = png_fixture();

        let (_, first) = send_json(
            &h.app,
            multipart_request(Some(("a.png", &png)), &[("patient_name", "First")]),
        )
        .await;
        let (_, second) = send_json(
            &h.app,
            multipart_request(Some(("b.png", &png)), &[("patient_name", "Second")]),
        )
        .await;

        let first = h.analyses.get(first["analysis_id"].as_str().unwrap()).await;
        let second = h.analyses.get(second["analysis_id"].as_str().unwrap()).await;
        assert_eq!(first.unwrap().patient_name, "First");
        assert_eq!(second.unwrap().patient_name, "Second");
    }

    #[tokio::test]
    async fn test_chat_empty_message_is_bad_request() {
        let disabled = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), None).await;
        let (status, body) =
            send_json(&disabled.app, json_request("/chat", json!({ "message": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["reply"], EMPTY_CHAT_MESSAGE);

        let chat = RecordingChat::replying("hi");
        let enabled = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), Some(chat.clone())).await;
        let (status, _) =
            send_json(&enabled.app, json_request("/chat", json!({ "message": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_disabled_returns_fallback() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), None).await;

        let (status, body) = send_json(
            &h.app,
            json_request("/chat", json!({ "message": "Is it serious?" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "reply": CHAT_UNAVAILABLE_MESSAGE }));
    }

    #[tokio::test]
    async fn test_chat_uses_referenced_analysis() {
        let chat = RecordingChat::replying("Please see a pulmonologist.");
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.95), Some(chat.clone())).await;
        let png = png_fixture();

        let (_, predicted) = send_json(
            &h.app,
            multipart_request(Some(("a.png", &png)), &[("patient_name", "Sam")]),
        )
        .await;

        let (status, body) = send_json(
            &h.app,
            json_request(
                "/chat",
                json!({ "message": " What now? ", "analysis_id": predicted["analysis_id"] }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "Please see a pulmonologist.");

        let prompt = chat.last_system_prompt();
        assert!(prompt.contains("- Patient: Sam"));
        assert!(prompt.contains("- Prediction: PNEUMONIA"));
        assert_eq!(chat.prompts.lock().unwrap()[0].1, "What now?");
    }

    #[tokio::test]
    async fn test_chat_inline_context_and_unknown_id() {
        let chat = RecordingChat::replying("ok");
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), Some(chat.clone())).await;

        send_json(
            &h.app,
            json_request(
                "/chat",
                json!({
                    "message": "Explain",
                    "analysis": {
                        "prediction": "NORMAL",
                        "confidence": 97.1,
                        "pneumonia_prob": 2.9,
                        "normal_prob": 97.1
                    }
                }),
            ),
        )
        .await;
        assert!(chat.last_system_prompt().contains("- Prediction: NORMAL"));

        send_json(
            &h.app,
            json_request("/chat", json!({ "message": "Explain", "analysis_id": "nope" })),
        )
        .await;
        assert!(
            chat.last_system_prompt()
                .contains("No analysis report is currently available.")
        );
    }

    #[tokio::test]
    async fn test_chat_backend_failure() {
        let h = harness(
            FixedScore::ok(0.9),
            FixedScore::ok(0.9),
            Some(RecordingChat::failing()),
        )
        .await;

        let (status, body) =
            send_json(&h.app, json_request("/chat", json!({ "message": "hello" }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "reply": CHAT_UNAVAILABLE_MESSAGE }));
    }

    #[tokio::test]
    async fn test_download_report() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.12), None).await;
        let png = png_fixture();
        let (_, predicted) =
            send_json(&h.app, multipart_request(Some(("a.png", &png)), &[])).await;

        let response = h
            .app
            .clone()
            .oneshot(json_request("/download-report", predicted))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert!(
            response.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .contains(REPORT_DOWNLOAD_NAME)
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(!body.is_empty());
        assert!(body.starts_with(b"%PDF"));

        let reports = std::fs::read_dir(h.upload_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("report_"))
            .count();
        assert_eq!(reports, 1);
    }

    #[tokio::test]
    async fn test_download_report_ignores_path_escape() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), None).await;

        let (status, body) = send(
            &h.app,
            json_request(
                "/download-report",
                json!({
                    "prediction": "PNEUMONIA",
                    "confidence": 80.5,
                    "pneumonia_prob": 80.5,
                    "normal_prob": 19.5,
                    "patient_age": 71,
                    "image_filename": "../../etc/passwd"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_malformed_json_gets_json_errors() {
        let chat = RecordingChat::replying("hi");
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), Some(chat.clone())).await;

        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["reply"].is_string());
        assert!(chat.prompts.lock().unwrap().is_empty());

        let (status, body) = send_json(
            &h.app,
            json_request("/download-report", json!({ "confidence": "88.0" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid report request:")
        );
    }

    #[tokio::test]
    async fn test_download_report_without_content_type() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), None).await;

        let request = Request::builder()
            .method("POST")
            .uri("/download-report")
            .body(Body::from(r#"{"prediction":"NORMAL","confidence":91.2}"#))
            .unwrap();
        let (status, body) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_predict_body_over_limit() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), None).await;
        let oversized = vec![0u8; MAX_BODY_BYTES + 1];

        let (status, body) =
            send_json(&h.app, multipart_request(Some(("big.png", &oversized)), &[])).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
        assert_eq!(h.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let h = harness(FixedScore::ok(0.9), FixedScore::ok(0.9), None).await;

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8_lossy(&body).contains("PneumoScan"));

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}
