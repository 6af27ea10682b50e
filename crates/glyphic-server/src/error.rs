//! Closed set of service failure conditions and their wire mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Every way a request can fail, each with a fixed machine code, HTTP status,
/// and structured details. This is classification only; retry and recovery
/// policy live with callers.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("{message}")]
    FileValidation {
        message: String,
        details: Option<Map<String, Value>>,
    },
    #[error("Unsupported file type: {file_type}. Supported types: {}", .supported.join(", "))]
    UnsupportedFileType {
        file_type: String,
        supported: Vec<String>,
    },
    #[error("File size {file_size} bytes exceeds maximum allowed size {max_size} bytes")]
    FileSizeExceeded { file_size: u64, max_size: u64 },
    #[error("OCR model is not loaded. Please wait for model initialization.")]
    ModelNotLoaded,
    #[error("OCR processing failed: {message}")]
    Processing {
        message: String,
        details: Option<Map<String, Value>>,
    },
    #[error("{message}")]
    FileCorrupted { message: String },
    #[error("Insufficient storage space for processing")]
    InsufficientStorage,
}

impl ServiceError {
    pub fn file_validation(message: impl Into<String>) -> Self {
        ServiceError::FileValidation {
            message: message.into(),
            details: None,
        }
    }

    pub fn unsupported_file_type(file_type: impl Into<String>) -> Self {
        ServiceError::UnsupportedFileType {
            file_type: file_type.into(),
            supported: crate::files::supported_extensions()
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        ServiceError::Processing {
            message: message.into(),
            details: None,
        }
    }

    pub fn file_corrupted() -> Self {
        ServiceError::FileCorrupted {
            message: "File is corrupted or cannot be processed".to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::FileValidation { .. } => "FILE_VALIDATION_ERROR",
            ServiceError::UnsupportedFileType { .. } => "UNSUPPORTED_FILE_TYPE",
            ServiceError::FileSizeExceeded { .. } => "FILE_SIZE_EXCEEDED",
            ServiceError::ModelNotLoaded => "MODEL_NOT_LOADED",
            ServiceError::Processing { .. } => "OCR_PROCESSING_ERROR",
            ServiceError::FileCorrupted { .. } => "FILE_CORRUPTED",
            ServiceError::InsufficientStorage => "INSUFFICIENT_STORAGE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::FileValidation { .. } | ServiceError::UnsupportedFileType { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::FileSizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Processing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::FileCorrupted { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::InsufficientStorage => StatusCode::INSUFFICIENT_STORAGE,
        }
    }

    /// Structured payload serialized under `details` in the error body.
    pub fn details(&self) -> Option<Map<String, Value>> {
        match self {
            ServiceError::FileValidation { details, .. }
            | ServiceError::Processing { details, .. } => details.clone(),
            ServiceError::UnsupportedFileType {
                file_type,
                supported,
            } => {
                let mut map = Map::new();
                map.insert("file_type".to_string(), json!(file_type));
                map.insert("supported_types".to_string(), json!(supported));
                Some(map)
            }
            ServiceError::FileSizeExceeded {
                file_size,
                max_size,
            } => {
                let mut map = Map::new();
                map.insert("file_size".to_string(), json!(file_size));
                map.insert("max_size".to_string(), json!(max_size));
                Some(map)
            }
            ServiceError::ModelNotLoaded
            | ServiceError::FileCorrupted { .. }
            | ServiceError::InsufficientStorage => None,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.error_code(), self.to_string(), self.details())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_error_response())).into_response()
    }
}
