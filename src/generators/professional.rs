// document-synthesis-service/src/generators/professional.rs

use serde::Deserialize;

use crate::assembler::{DocumentAssembler, SignatureParty};
use crate::error::{DocumentError, Result};
use crate::generators::{GenerationContext, Generator};
use crate::locale::LocaleBundle;
use crate::models::DocumentRequest;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BodySection {
    heading: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfessionalContent {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    sections: Vec<BodySection>,
    /// Counterparty named in the signature block; the subject when absent.
    #[serde(default)]
    counterparty: Option<String>,
}

/// Contracts, proposals and other free-form documents written in markup.
pub struct ProfessionalDocumentGenerator {
    title: String,
    content: ProfessionalContent,
    counterparty: String,
}

impl ProfessionalDocumentGenerator {
    pub fn from_request(request: &DocumentRequest) -> Result<Self> {
        let content: ProfessionalContent = serde_json::from_value(request.data.clone())
            .map_err(|e| DocumentError::InvalidData(format!("professional document: {e}")))?;

        let title = content
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| request.subject.clone());
        if title.trim().is_empty() {
            return Err(DocumentError::MissingField("data.title".to_string()));
        }
        let has_analysis = request.analysis.as_deref().is_some_and(|a| !a.trim().is_empty());
        if content.sections.is_empty() && !has_analysis {
            return Err(DocumentError::MissingField("data.sections".to_string()));
        }
        if let Some(section) = content.sections.iter().find(|s| s.heading.trim().is_empty()) {
            return Err(DocumentError::InvalidData(format!(
                "section without heading: {:.40}",
                section.body
            )));
        }

        let counterparty = content
            .counterparty
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| request.subject.clone());
        Ok(Self { title, content, counterparty })
    }
}

impl Generator for ProfessionalDocumentGenerator {
    fn title(&self, _locale: &LocaleBundle) -> String {
        self.title.clone()
    }

    fn assemble(&self, asm: &mut DocumentAssembler<'_>, ctx: &GenerationContext<'_>) -> Result<()> {
        let locale = ctx.locale;
        asm.title(&self.title, self.content.subtitle.as_deref());

        let mut meta = vec![
            (locale.text("document.prepared_by"), ctx.branding.company_name.clone()),
            (locale.text("cover.date"), locale.format_date(ctx.date)),
        ];
        if let Some(reference) = &ctx.request.options.reference {
            meta.push((locale.text("document.reference"), reference.clone()));
        }
        asm.key_value_table(&meta);

        for section in &self.content.sections {
            asm.section(section.heading.trim());
            asm.markup(&section.body);
        }
        if let Some(analysis) = ctx.request.analysis.as_deref().filter(|a| !a.trim().is_empty()) {
            asm.markup(analysis);
        }

        let options = &ctx.request.options;
        if options.include_signature || options.signature.is_some() {
            asm.section(&locale.text("section.signature"));
            asm.signature_block(&[
                SignatureParty {
                    party: ctx.branding.company_name.clone(),
                    record: None,
                },
                SignatureParty {
                    party: self.counterparty.clone(),
                    record: options.signature.as_ref(),
                },
            ]);
        }
        if let Some(url) = options.qr_target_url.as_deref().filter(|u| !u.trim().is_empty()) {
            asm.section(&locale.text("section.partnership"));
            asm.qr_block(ctx.assets.qr.as_ref(), url);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::DocumentAssets;
    use crate::config::Config;
    use crate::layout::PageGeometry;
    use crate::locale::{Language, LocalizationTable};
    use crate::models::{DocumentKind, GenerationOptions};
    use crate::renderers::RecordingSurface;
    use crate::signature::{SignatureMark, SignatureRecord};
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    fn request(data: serde_json::Value, options: GenerationOptions) -> DocumentRequest {
        DocumentRequest {
            request_id: "prof".into(),
            kind: DocumentKind::ProfessionalDocument,
            language: Some("en".into()),
            subject: "Acme Tires".into(),
            data,
            charts: vec![],
            analysis: None,
            options,
            formats: vec![],
        }
    }

    fn render(request: &DocumentRequest) -> (Vec<String>, RecordingSurface) {
        let generator = ProfessionalDocumentGenerator::from_request(request).unwrap();
        let config = Config::defaults().unwrap();
        let locale = LocalizationTable::global().bundle(Language::En);
        let assets = DocumentAssets::default();
        let ctx = GenerationContext {
            request,
            locale,
            charts: &[],
            assets: &assets,
            branding: &config.branding,
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        };
        let mut surface = RecordingSurface::new(PageGeometry::a4());
        let outline = {
            let mut asm = DocumentAssembler::new(&mut surface, locale, generator.title(locale));
            generator.assemble(&mut asm, &ctx).unwrap();
            asm.finish()
        };
        (outline.sections, surface)
    }

    #[test]
    fn sections_are_laid_out_in_order() {
        let request = request(
            json!({
                "title": "Supply Agreement",
                "subtitle": "Rubber granulate, 2027",
                "sections": [
                    { "heading": "Scope", "body": "Monthly delivery of **granulate**.\n\n- Mesh 10-30\n- Big bags" },
                    { "heading": "Price", "body": "| Item | Price |\n|---|---|\n| Granulate | 240 |" }
                ]
            }),
            GenerationOptions::default(),
        );
        let (sections, surface) = render(&request);
        assert_eq!(sections, vec!["Supply Agreement", "Scope", "Price"]);
        assert!(surface.page_has_text(0, "Mesh 10-30"));
        assert!(surface.page_has_text(0, "Granulate"));
    }

    #[test]
    fn signed_document_shows_the_integrity_hash() {
        let record = SignatureRecord::new(
            "Maria Souza",
            "maria@acme.example",
            Utc.with_ymd_and_hms(2026, 10, 19, 14, 0, 0).unwrap(),
            SignatureMark::Typed { text: "Maria Souza".into() },
        )
        .sealed()
        .unwrap();
        let short = record.short_hash().to_string();
        let options = GenerationOptions {
            signature: Some(record),
            ..Default::default()
        };
        let request = request(
            json!({ "sections": [{ "heading": "Terms", "body": "Net 30." }] }),
            options,
        );
        let (sections, surface) = render(&request);
        assert_eq!(sections[0], "Acme Tires");
        assert_eq!(sections.last().map(String::as_str), Some("Signatures"));
        assert!(surface.pages().iter().flat_map(|p| p.texts()).any(|t| t.contains(&short)));
    }

    #[test]
    fn empty_document_is_rejected() {
        let result = ProfessionalDocumentGenerator::from_request(&request(json!({}), GenerationOptions::default()));
        assert!(matches!(result, Err(DocumentError::MissingField(_))));
    }
}
