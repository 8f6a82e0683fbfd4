// document-synthesis-service/src/generators/letter_of_intent.rs

use serde::Deserialize;
use serde_json::json;

use crate::assembler::{CoverPage, DocumentAssembler, SignatureParty};
use crate::error::{DocumentError, Result};
use crate::generators::{GenerationContext, Generator};
use crate::locale::LocaleBundle;
use crate::models::DocumentRequest;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LetterTerms {
    #[serde(default)]
    counterparty: Option<String>,
    purpose: String,
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default = "default_validity_days")]
    validity_days: u32,
}

fn default_validity_days() -> u32 {
    90
}

pub struct LetterOfIntentGenerator {
    counterparty: String,
    terms: LetterTerms,
}

impl LetterOfIntentGenerator {
    pub fn from_request(request: &DocumentRequest) -> Result<Self> {
        if request.data.get("purpose").and_then(|v| v.as_str()).map_or(true, |p| p.trim().is_empty()) {
            return Err(DocumentError::MissingField("data.purpose".to_string()));
        }
        let terms: LetterTerms = serde_json::from_value(request.data.clone())
            .map_err(|e| DocumentError::InvalidData(format!("letter of intent: {e}")))?;

        // The counterparty defaults to the document subject.
        let counterparty = terms
            .counterparty
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| request.subject.clone());
        if counterparty.trim().is_empty() {
            return Err(DocumentError::MissingField("subject".to_string()));
        }
        Ok(Self { counterparty, terms })
    }

    fn term_rows(&self, locale: &LocaleBundle) -> Vec<(String, String)> {
        let t = &self.terms;
        let mut rows: Vec<(String, String)> = [
            ("loi.term.product", &t.product),
            ("loi.term.volume", &t.volume),
            ("loi.term.country", &t.country),
            ("loi.term.value", &t.value),
            ("loi.term.start", &t.start),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (locale.text(key), v.to_string()))
        })
        .collect();
        rows.push((
            locale.text("loi.term.validity"),
            locale.render("loi.term.validity_value", &json!({ "days": t.validity_days })),
        ));
        rows
    }
}

impl Generator for LetterOfIntentGenerator {
    fn title(&self, locale: &LocaleBundle) -> String {
        format!("{} | {}", locale.text("loi.title"), self.counterparty)
    }

    fn assemble(&self, asm: &mut DocumentAssembler<'_>, ctx: &GenerationContext<'_>) -> Result<()> {
        let locale = ctx.locale;
        let company = &ctx.branding.company_name;

        let mut fields = vec![
            (locale.text("loi.party_to"), self.counterparty.clone()),
            (locale.text("cover.date"), locale.format_date(ctx.date)),
        ];
        if let Some(reference) = &ctx.request.options.reference {
            fields.push((locale.text("document.reference"), reference.clone()));
        }
        asm.cover(&CoverPage {
            company: company.clone(),
            title: locale.text("loi.title"),
            subtitle: None,
            fields,
            logo: ctx.assets.logo.as_ref(),
        });

        asm.section(&locale.text("loi.parties"));
        asm.key_value_table(&[
            (locale.text("loi.party_from"), company.clone()),
            (locale.text("loi.party_to"), self.counterparty.clone()),
        ]);
        asm.paragraph(&locale.render(
            "loi.intro",
            &json!({
                "company": company,
                "purpose": self.terms.purpose.trim(),
                "counterparty": self.counterparty,
            }),
        ));
        for body in locale.list("loi.body") {
            asm.paragraph(&body);
        }
        if let Some(analysis) = ctx.request.analysis.as_deref().filter(|a| !a.trim().is_empty()) {
            asm.markup(analysis);
        }

        asm.section(&locale.text("loi.terms"));
        asm.key_value_table(&self.term_rows(locale));

        asm.section(&locale.text("loi.nonbinding_title"));
        asm.paragraph(&locale.text("loi.nonbinding"));
        asm.paragraph(&locale.text("loi.closing"));

        asm.section(&locale.text("section.signature"));
        asm.signature_block(&[
            SignatureParty {
                party: company.clone(),
                record: None,
            },
            SignatureParty {
                party: self.counterparty.clone(),
                record: ctx.request.options.signature.as_ref(),
            },
        ]);

        if let Some(url) = ctx.request.options.qr_target_url.as_deref().filter(|u| !u.trim().is_empty()) {
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
    use chrono::NaiveDate;

    fn request(data: serde_json::Value) -> DocumentRequest {
        DocumentRequest {
            request_id: "loi".into(),
            kind: DocumentKind::LetterOfIntent,
            language: Some("pt".into()),
            subject: "Prefeitura de Campinas".into(),
            data,
            charts: vec![],
            analysis: None,
            options: GenerationOptions::default(),
            formats: vec![],
        }
    }

    #[test]
    fn letter_lists_parties_terms_and_signatures() {
        let request = request(json!({
            "purpose": "install a tire recycling plant",
            "volume": "25,000 t/year",
            "validityDays": 60
        }));
        let generator = LetterOfIntentGenerator::from_request(&request).unwrap();
        let config = Config::defaults().unwrap();
        let locale = LocalizationTable::global().bundle(Language::Pt);
        let assets = DocumentAssets::default();
        let ctx = GenerationContext {
            request: &request,
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

        assert_eq!(outline.sections.len(), 5);
        assert_eq!(outline.sections[0], "cover");
        assert_eq!(outline.sections[4], locale.text("section.signature"));
        let texts: Vec<&str> = surface.pages().iter().flat_map(|p| p.texts()).collect();
        assert!(texts.iter().any(|t| t.contains("25,000 t/year")));
        assert!(texts.iter().any(|t| t.contains("Prefeitura de Campinas")));
        assert!(texts.iter().any(|t| t.contains("60")));
    }

    #[test]
    fn purpose_is_required() {
        let result = LetterOfIntentGenerator::from_request(&request(json!({ "volume": "10 t" })));
        assert!(matches!(result, Err(DocumentError::MissingField(f)) if f == "data.purpose"));
    }

    #[test]
    fn counterparty_overrides_subject() {
        let generator = LetterOfIntentGenerator::from_request(&request(json!({
            "purpose": "buy granulate",
            "counterparty": "Borracha Sul S.A."
        })))
        .unwrap();
        assert_eq!(generator.counterparty, "Borracha Sul S.A.");
    }
}
