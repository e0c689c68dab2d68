//! Error types for the inkpress pipeline.

use thiserror::Error;

/// Result type alias using inkpress's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for inkpress operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Source PDF could not be opened or read
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Raster or encode operation failed
    #[error("Image error: {0}")]
    Image(String),

    /// Blob storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_job_not_found() {
        let id = Uuid::nil();
        let err = Error::JobNotFound(id);
        assert_eq!(err.to_string(), format!("Job not found: {}", id));
    }

    #[test]
    fn test_error_display_pdf() {
        let err = Error::Pdf("corrupt xref table".to_string());
        assert_eq!(err.to_string(), "PDF error: corrupt xref table");
    }

    #[test]
    fn test_error_display_image() {
        let err = Error::Image("encode failed".to_string());
        assert_eq!(err.to_string(), "Image error: encode failed");
    }

    #[test]
    fn test_error_display_storage() {
        let err = Error::Storage("blob missing".to_string());
        assert_eq!(err.to_string(), "Storage error: blob missing");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("dpi out of range".to_string());
        assert_eq!(err.to_string(), "Invalid input: dpi out of range");
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
