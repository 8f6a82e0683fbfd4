// document-synthesis-service/src/generators/mod.rs

mod feasibility;
mod letter_of_intent;
mod professional;
mod template;

use chrono::NaiveDate;

use crate::assembler::DocumentAssembler;
use crate::assets::DocumentAssets;
use crate::charts::{ChartAsset, ChartHandle};
use crate::config::BrandingConfig;
use crate::error::Result;
use crate::locale::LocaleBundle;
use crate::models::{DocumentKind, DocumentRequest};

pub use feasibility::FeasibilityStudyGenerator;
pub use letter_of_intent::LetterOfIntentGenerator;
pub use professional::ProfessionalDocumentGenerator;
pub use template::TemplateDocumentGenerator;

/// Everything resolved before layout starts.
pub struct GenerationContext<'a> {
    pub request: &'a DocumentRequest,
    pub locale: &'a LocaleBundle,
    pub charts: &'a [ChartAsset],
    pub assets: &'a DocumentAssets,
    pub branding: &'a BrandingConfig,
    pub date: NaiveDate,
}

/// One document kind. Instances are built per request from validated data,
/// so layout itself cannot fail on bad input and may run once per format.
pub trait Generator: Send + Sync {
    /// Document title; also the running header of every page after the first.
    fn title(&self, locale: &LocaleBundle) -> String;

    /// Charts this document embeds, before caller-supplied captures are merged in.
    fn chart_handles(&self, _locale: &LocaleBundle) -> Vec<ChartHandle> {
        Vec::new()
    }

    fn assemble(&self, assembler: &mut DocumentAssembler<'_>, ctx: &GenerationContext<'_>) -> Result<()>;
}

pub fn create_generator(request: &DocumentRequest) -> Result<Box<dyn Generator>> {
    match request.kind {
        DocumentKind::FeasibilityStudy => Ok(Box::new(FeasibilityStudyGenerator::from_request(request)?)),
        DocumentKind::LetterOfIntent => Ok(Box::new(LetterOfIntentGenerator::from_request(request)?)),
        DocumentKind::ProfessionalDocument => {
            Ok(Box::new(ProfessionalDocumentGenerator::from_request(request)?))
        }
        DocumentKind::TemplateDocument => Ok(Box::new(TemplateDocumentGenerator::from_request(request)?)),
    }
}
