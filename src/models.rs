// document-synthesis-service/src/models.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::charts::ChartHandle;
use crate::error::{DocumentError, Result};
use crate::signature::SignatureRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    /// JSON dump of the drawing operations of every page.
    Layout,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Layout => "layout.json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Layout => "application/json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    FeasibilityStudy,
    LetterOfIntent,
    ProfessionalDocument,
    TemplateDocument,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::FeasibilityStudy,
        DocumentKind::LetterOfIntent,
        DocumentKind::ProfessionalDocument,
        DocumentKind::TemplateDocument,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::FeasibilityStudy => "feasibility_study",
            DocumentKind::LetterOfIntent => "letter_of_intent",
            DocumentKind::ProfessionalDocument => "professional_document",
            DocumentKind::TemplateDocument => "template_document",
        }
    }

    pub fn parse(kind: &str) -> Result<Self> {
        let wanted = kind.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| DocumentError::UnsupportedDocumentKind(kind.to_string()))
    }

    pub fn slug(&self) -> &'static str {
        match self {
            DocumentKind::FeasibilityStudy => "feasibility-study",
            DocumentKind::LetterOfIntent => "letter-of-intent",
            DocumentKind::ProfessionalDocument => "document",
            DocumentKind::TemplateDocument => "document",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Watermark {
    #[default]
    None,
    Confidential,
    Draft,
}

impl Watermark {
    pub fn label_key(&self) -> Option<&'static str> {
        match self {
            Watermark::None => None,
            Watermark::Confidential => Some("watermark.confidential"),
            Watermark::Draft => Some("watermark.draft"),
        }
    }
}

/// Operator notes for the due-diligence checklist; empty areas are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DueDiligenceNotes {
    #[serde(default)]
    pub legal: Option<String>,
    #[serde(default)]
    pub technical: Option<String>,
    #[serde(default)]
    pub financial: Option<String>,
    #[serde(default)]
    pub environmental: Option<String>,
    #[serde(default)]
    pub commercial: Option<String>,
}

impl DueDiligenceNotes {
    /// `(label key, note)` pairs with non-blank notes, in checklist order.
    pub fn filled(&self) -> Vec<(&'static str, &str)> {
        [
            ("dd.legal", &self.legal),
            ("dd.technical", &self.technical),
            ("dd.financial", &self.financial),
            ("dd.environmental", &self.environmental),
            ("dd.commercial", &self.commercial),
        ]
        .into_iter()
        .filter_map(|(key, note)| {
            note.as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| (key, n))
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(default)]
    pub watermark: Watermark,
    #[serde(default)]
    pub qr_target_url: Option<String>,
    #[serde(default)]
    pub include_signature: bool,
    #[serde(default)]
    pub signature: Option<SignatureRecord>,
    #[serde(default)]
    pub due_diligence: DueDiligenceNotes,
    /// Issue date printed on the document and used in the filename; today when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub reference: Option<String>,
}

fn default_formats() -> Vec<DocumentFormat> {
    vec![DocumentFormat::Pdf]
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    #[serde(default = "new_request_id")]
    pub request_id: String,
    pub kind: DocumentKind,
    /// Language code; the configured default language when absent or unknown.
    #[serde(default)]
    pub language: Option<String>,
    /// Client or project the document is about; drives the filename.
    pub subject: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub charts: Vec<ChartHandle>,
    /// Free-text analysis in the lightweight markup.
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default = "default_formats")]
    pub formats: Vec<DocumentFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub format: DocumentFormat,
    pub content_base64: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub sha256: String,
    pub page_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentGenerationResponse {
    pub request_id: String,
    pub status: String,
    pub documents: Vec<GeneratedDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl DocumentGenerationResponse {
    pub fn success(request_id: String, documents: Vec<GeneratedDocument>) -> Self {
        Self {
            request_id,
            status: "success".to_string(),
            documents,
            error: None,
            error_type: None,
            generated_at: Utc::now(),
        }
    }

    pub fn failed(request_id: String, error: &DocumentError) -> Self {
        let response = error.to_error_response();
        Self::error(request_id, response.error, response.error_type)
    }

    pub fn error(request_id: String, error: String, error_type: String) -> Self {
        Self {
            request_id,
            status: "error".to_string(),
            documents: vec![],
            error: Some(error),
            error_type: Some(error_type),
            generated_at: Utc::now(),
        }
    }
}
