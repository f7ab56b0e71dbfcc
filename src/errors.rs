use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upload failed: {method} {url} returned {status}: {body}")]
    UploadFailed {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Unexpected story service response: {0}")]
    StoryResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_a_directory(path: &str) -> Self {
        Self::NotADirectory {
            path: path.to_string(),
        }
    }

    pub fn upload_failed(method: &reqwest::Method, url: &str, status: u16, body: String) -> Self {
        Self::UploadFailed {
            method: method.to_string(),
            url: url.to_string(),
            status,
            body,
        }
    }

    /// Only failures to get a response at all are worth another attempt.
    /// A response carrying an error status is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Network(_))
    }

    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }

    /// HTTP status of a rejected request, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::UploadFailed { status, .. } => Some(*status),
            AppError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_failed_is_permanent() {
        let err = AppError::upload_failed(
            &reqwest::Method::PUT,
            "http://localhost:8080/quarto/update/abc",
            500,
            "boom".to_string(),
        );
        assert!(!err.is_retryable());
        assert!(err.is_permanent());
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("PUT"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_io_and_validation_are_permanent() {
        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_permanent());
        assert_eq!(io.status(), None);

        let validation = AppError::validation("batch_size", "Must be greater than 0");
        assert!(validation.is_permanent());
        assert_eq!(
            validation.to_string(),
            "Validation error: batch_size - Must be greater than 0"
        );
    }
}
