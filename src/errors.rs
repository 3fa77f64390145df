// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FluxError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Recommended step index {index} out of range (model offers {len} values)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("API key is required")]
    MissingCredential,

    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Image-to-image mode needs an uploaded or history source image")]
    MissingSourceImage,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to fetch result image: {0}")]
    ResultFetch(String),

    #[error("Failed to decode result image: {0}")]
    ResultDecode(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("History ordinal {ordinal} out of range (history holds {len} images)")]
    HistoryIndex { ordinal: usize, len: usize },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),
}

impl FluxError {
    /// True for errors raised before any network activity.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FluxError::MissingCredential
                | FluxError::EmptyPrompt
                | FluxError::MissingSourceImage
                | FluxError::InvalidParameter(_)
        )
    }

    fn label(&self) -> &'static str {
        match self {
            FluxError::UnknownModel(_) => "Unknown model",
            FluxError::IndexOutOfRange { .. } | FluxError::HistoryIndex { .. } => "Index error",
            FluxError::MissingCredential
            | FluxError::EmptyPrompt
            | FluxError::MissingSourceImage
            | FluxError::InvalidParameter(_) => "Validation error",
            FluxError::ResultFetch(_) | FluxError::ResultDecode(_) => "Result error",
            FluxError::Generation(_) => "Generation error",
            FluxError::ImageProcessing(_) => "Image processing error",
            FluxError::Archive(_) | FluxError::Serialization(_) => "Data processing error",
            FluxError::SessionNotFound(_) => "Session not found",
        }
    }
}

impl ResponseError for FluxError {
    fn status_code(&self) -> StatusCode {
        match self {
            FluxError::UnknownModel(_) | FluxError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            FluxError::IndexOutOfRange { .. }
            | FluxError::HistoryIndex { .. }
            | FluxError::MissingCredential
            | FluxError::EmptyPrompt
            | FluxError::MissingSourceImage
            | FluxError::InvalidParameter(_)
            | FluxError::ImageProcessing(_) => StatusCode::BAD_REQUEST,
            FluxError::ResultFetch(_) | FluxError::ResultDecode(_) | FluxError::Generation(_) => {
                StatusCode::BAD_GATEWAY
            }
            FluxError::Archive(_) | FluxError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.label(),
            "message": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        for err in [
            FluxError::MissingCredential,
            FluxError::EmptyPrompt,
            FluxError::MissingSourceImage,
        ] {
            assert!(err.is_validation());
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn index_errors_are_not_validation() {
        let err = FluxError::HistoryIndex { ordinal: 4, len: 2 };
        assert!(!err.is_validation());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "History ordinal 4 out of range (history holds 2 images)"
        );
    }

    #[test]
    fn lookups_map_to_not_found() {
        assert_eq!(
            FluxError::UnknownModel("flux.9".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            FluxError::SessionNotFound(Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn generation_failure_maps_to_bad_gateway() {
        assert_eq!(
            FluxError::Generation("upstream 500".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
