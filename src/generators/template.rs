// document-synthesis-service/src/generators/template.rs

use handlebars::Handlebars;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::assembler::{DocumentAssembler, SignatureParty};
use crate::error::{DocumentError, Result};
use crate::generators::{GenerationContext, Generator};
use crate::locale::LocaleBundle;
use crate::models::DocumentRequest;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSource {
    template: String,
    #[serde(default)]
    record: Value,
    #[serde(default)]
    title: Option<String>,
}

/// Fills a Handlebars template with a JSON record and lays the result out
/// as markup. The template is rendered once, when the generator is built.
pub struct TemplateDocumentGenerator {
    title: String,
    body: String,
}

impl TemplateDocumentGenerator {
    pub fn from_request(request: &DocumentRequest) -> Result<Self> {
        if request.data.get("template").and_then(Value::as_str).map_or(true, |t| t.trim().is_empty()) {
            return Err(DocumentError::MissingField("data.template".to_string()));
        }
        let source: TemplateSource = serde_json::from_value(request.data.clone())
            .map_err(|e| DocumentError::InvalidData(format!("template document: {e}")))?;

        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_template_string("document", &source.template)?;
        let body = handlebars.render("document", &source.record)?;

        let title = source
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| request.subject.clone());
        debug!(title = %title, body_len = body.len(), "Template rendered");
        Ok(Self { title, body })
    }
}

impl Generator for TemplateDocumentGenerator {
    fn title(&self, _locale: &LocaleBundle) -> String {
        self.title.clone()
    }

    fn assemble(&self, asm: &mut DocumentAssembler<'_>, ctx: &GenerationContext<'_>) -> Result<()> {
        asm.title(&self.title, None);
        asm.markup(&self.body);

        let options = &ctx.request.options;
        if options.include_signature || options.signature.is_some() {
            asm.section(&ctx.locale.text("section.signature"));
            asm.signature_block(&[
                SignatureParty {
                    party: ctx.branding.company_name.clone(),
                    record: None,
                },
                SignatureParty {
                    party: ctx.request.subject.clone(),
                    record: options.signature.as_ref(),
                },
            ]);
        }
        if let Some(url) = options.qr_target_url.as_deref().filter(|u| !u.trim().is_empty()) {
            asm.section(&ctx.locale.text("section.partnership"));
            asm.qr_block(ctx.assets.qr.as_ref(), url);
        }
        Ok(())
    }
}
