use http::StatusCode;
use thiserror::Error;
use worker::Error as WorkerError;

/// Failures that are not the client's fault.
///
/// Upload policy violations are `Rejection`s, not `AppError`s.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
    #[error("Storage error for key {key}: {message}")]
    Storage { key: String, message: String },
    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn storage(key: impl Into<String>, source: impl std::fmt::Display) -> Self {
        AppError::Storage {
            key: key.into(),
            message: source.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
        }
    }

    /// Status sent to the client. The message is never exposed.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Worker(_) => "worker",
            AppError::Storage { .. } => "storage",
            AppError::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_names_key() {
        let err = AppError::storage("casita-x.webm", "bucket unavailable");
        assert_eq!(err.kind(), "storage");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("casita-x.webm"));
    }
}
