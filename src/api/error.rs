use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::{IngestError, RepositoryError, StorageError};

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// 接口错误, 映射为 HTTP 状态码 + JSON 错误体
#[derive(Debug)]
pub enum ApiError {
    /// 400 - metadata 非法, 指明出错字段
    MalformedMetadata { field: String, message: String },
    /// 400 - 请求体形态不被接受
    UnsupportedSubmissionShape(String),
    /// 400
    BadRequest(String),
    /// 404
    NotFound(String),
    /// 413
    PayloadTooLarge(String),
    /// 415
    UnsupportedMediaType(String),
    /// 500
    Internal(String),
}

impl ApiError {
    /// axum 提取器拒绝 (读取请求体 / multipart) 的转换
    pub fn from_rejection(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(message)
        } else {
            ApiError::BadRequest(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::MalformedMetadata { field, message } => (
                StatusCode::BAD_REQUEST,
                "malformed_metadata",
                message,
                Some(serde_json::json!({ "field": field })),
            ),
            ApiError::UnsupportedSubmissionShape(msg) => {
                (StatusCode::BAD_REQUEST, "unsupported_submission_shape", msg, None)
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg, None)
            }
            ApiError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                msg,
                None,
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MalformedMetadata { field, reason } => ApiError::MalformedMetadata {
                message: format!("invalid `{}`: {}", field, reason),
                field,
            },
            IngestError::UnsupportedSubmissionShape(msg) => {
                ApiError::UnsupportedSubmissionShape(msg)
            }
            IngestError::UnsupportedContentType(ct) => ApiError::UnsupportedMediaType(format!(
                "expected application/json or multipart/form-data, got {}",
                ct
            )),
            IngestError::Storage(e) => e.into(),
            IngestError::Repository(e) => e.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidReference(r) => {
                ApiError::BadRequest(format!("invalid file reference: {}", r))
            }
            StorageError::NotFound(r) => ApiError::NotFound(format!("file {} not found", r)),
            StorageError::Io(e) => {
                tracing::error!("File storage failure: {}", e);
                ApiError::Internal("failed to store uploaded file".to_string())
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        tracing::error!("Invoice repository failure: {}", err);
        ApiError::Internal("failed to persist invoice".to_string())
    }
}
