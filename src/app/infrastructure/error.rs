use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Project error: {0}")]
    Project(String),

    #[error("Language error: {0}")]
    Language(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Translation error: {0}")]
    Translation(String),
}

/// Convenience type alias for Results with AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Json(_)));
    }

    #[test]
    fn test_error_display() {
        let err = AppError::Project("cannot delete the last project".to_string());
        assert_eq!(err.to_string(), "Project error: cannot delete the last project");

        let err = AppError::Settings("unknown field 'shadow.glow'".to_string());
        assert_eq!(err.to_string(), "Settings error: unknown field 'shadow.glow'");

        let err = AppError::Language("a project needs at least one language".to_string());
        assert_eq!(
            err.to_string(),
            "Language error: a project needs at least one language"
        );
    }
}
