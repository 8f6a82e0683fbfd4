// document-synthesis-service/src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Template error: {0}")]
    TemplateError(#[from] handlebars::TemplateError),

    #[error("Rendering error: {0}")]
    RenderError(#[from] handlebars::RenderError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Base64 decoding error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Asset request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Chart capture unavailable: {0}")]
    ChartCaptureUnavailable(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid study input: {0}")]
    InvalidStudyInput(String),

    #[error("Unsupported document kind: {0}")]
    UnsupportedDocumentKind(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Font error: {0}")]
    FontError(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

impl DocumentError {
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentError::TemplateError(_) => "template_error",
            DocumentError::RenderError(_) => "render_error",
            DocumentError::IoError(_) => "io_error",
            DocumentError::SerializationError(_) => "serialization_error",
            DocumentError::Base64Error(_) => "base64_error",
            DocumentError::ImageError(_) => "image_error",
            DocumentError::HttpError(_) => "http_error",
            DocumentError::ChartCaptureUnavailable(_) => "chart_capture_unavailable",
            DocumentError::UnsupportedLanguage(_) => "unsupported_language",
            DocumentError::InvalidStudyInput(_) => "invalid_study_input",
            DocumentError::UnsupportedDocumentKind(_) => "unsupported_document_kind",
            DocumentError::MissingField(_) => "missing_field",
            DocumentError::InvalidData(_) => "invalid_data",
            DocumentError::FontError(_) => "font_error",
            DocumentError::GenerationFailed(_) => "generation_failed",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            error_type: self.kind().to_string(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_carries_kind() {
        let err = DocumentError::InvalidStudyInput("daily capacity must be positive".into());
        let response = err.to_error_response();
        assert_eq!(response.error_type, "invalid_study_input");
        assert!(response.error.contains("daily capacity"));
    }
}
