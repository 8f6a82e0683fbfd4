// document-synthesis-service/src/lib.rs

//! Turns structured business data for a tire-recycling operation into
//! paginated, localized documents: feasibility studies with financial
//! projections, letters of intent, and free-form or template-filled
//! documents, rendered to PDF or to a JSON layout dump.

pub mod assembler;
pub mod assets;
pub mod charts;
pub mod config;
pub mod error;
pub mod finance;
pub mod generators;
pub mod layout;
pub mod locale;
pub mod models;
pub mod output;
pub mod renderers;
pub mod service;
pub mod signature;

pub use config::Config;
pub use error::{DocumentError, Result};
pub use models::{DocumentFormat, DocumentGenerationResponse, DocumentKind, DocumentRequest, GeneratedDocument};
pub use service::DocumentService;
