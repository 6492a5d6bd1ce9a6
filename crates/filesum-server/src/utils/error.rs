use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure reasons of the content extractor.
/// The extractor never returns partial text: it is either `Ok(text)` or one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("File too large: {size_kb} KB (max: {limit_kb} KB)")]
    SizeExceeded { size_kb: u64, limit_kb: u64 },

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Converter unavailable: {0}")]
    ConverterUnavailable(String),

    #[error("Decoder unavailable: {0}")]
    DecoderUnavailable(String),

    #[error("No text content extracted")]
    EmptyContent,

    #[error("File unreadable: {0}")]
    Unreadable(String),
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        ExtractError::Unreadable(err.to_string())
    }
}

/// Failure of a single exchange with the chat completions endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Failed to call LLM API: {0}")]
    Transport(String),

    #[error("LLM API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse LLM response: {0}")]
    InvalidResponse(String),
}

/// Everything that can go wrong while the flow controller handles one event.
/// Converted into a single user-visible error reply at the controller boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Pending file no longer available")]
    FileExpired,

    #[error("No cached content for follow-up question")]
    ContentExpired,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl FlowError {
    /// Short, non-technical text shown to the chat user.
    pub fn user_message(&self) -> &'static str {
        match self {
            FlowError::FileExpired => "文件已过期，请重新发送",
            FlowError::ContentExpired => "文件内容已过期，请重新发送文件后再提问",
            FlowError::Extract(ExtractError::SizeExceeded { .. }) => "文件太大，无法处理",
            FlowError::Extract(ExtractError::UnsupportedFormat(_)) => "不支持的文件格式",
            FlowError::Extract(_) => "无法读取文件内容",
            FlowError::Gateway(GatewayError::Transport(_)) => "网络请求失败，请稍后重试",
            FlowError::Gateway(_) => "调用API失败，请稍后重试",
        }
    }
}

/// Errors of the HTTP adapter itself
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
