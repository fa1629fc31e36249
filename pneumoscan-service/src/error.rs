use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use xray_gate::GateError;

pub const INVALID_UPLOAD_MESSAGE: &str = "Please upload a valid image (png, jpg, jpeg, bmp, webp).";
pub const EMPTY_CHAT_MESSAGE: &str = "Please say something.";
pub const CHAT_UNAVAILABLE_MESSAGE: &str =
    "AI assistant is temporarily unavailable. Please try again later.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{}", INVALID_UPLOAD_MESSAGE)]
    InvalidUpload,

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    Inference(#[from] GateError),

    #[error("{}", EMPTY_CHAT_MESSAGE)]
    EmptyChatMessage,

    #[error("Invalid chat request: {0}")]
    ChatRequest(JsonRejection),

    #[error("Invalid report request: {0}")]
    ReportRequest(serde_json::Error),

    #[error("Chat backend failed: {0}")]
    Chat(String),

    #[error("Failed to generate report: {0}")]
    Report(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::InvalidUpload => (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() })),
            ApiError::Multipart(e) => (e.status(), json!({ "error": e.body_text() })),
            ApiError::Inference(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
            ApiError::EmptyChatMessage => {
                (StatusCode::BAD_REQUEST, json!({ "reply": EMPTY_CHAT_MESSAGE }))
            }
            ApiError::ChatRequest(e) => (e.status(), json!({ "reply": e.body_text() })),
            ApiError::ReportRequest(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            // The cause is logged where it happens; clients only see the fallback.
            ApiError::Chat(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "reply": CHAT_UNAVAILABLE_MESSAGE }),
            ),
            ApiError::Report(_) | ApiError::Storage(_) | ApiError::Join(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
