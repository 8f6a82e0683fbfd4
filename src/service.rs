// document-synthesis-service/src/service.rs

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::assembler::{DocumentAssembler, DocumentOutline};
use crate::assets::{load_document_assets, qr_image_url, AssetLoader, DocumentAssets, HttpAssetLoader};
use crate::charts::{capture_all, merge_handles, ChartAsset, ChartRenderer, DefaultChartRenderer};
use crate::config::{BrandingConfig, Config};
use crate::error::{DocumentError, Result};
use crate::generators::{create_generator, GenerationContext, Generator};
use crate::layout::PageGeometry;
use crate::locale::{Language, LocaleBundle, LocalizationTable};
use crate::models::{DocumentFormat, DocumentGenerationResponse, DocumentKind, DocumentRequest, GeneratedDocument};
use crate::output::{document_filename, OutputSerializer};
use crate::renderers::{create_surface, CjkFont, RecordingSurface};

/// Turns document requests into finished artifacts. Holds no per-request
/// state, so one instance can serve concurrent calls.
pub struct DocumentService {
    config: Config,
    geometry: PageGeometry,
    default_language: Language,
    cjk_font: CjkFont,
    loader: Arc<dyn AssetLoader>,
    renderer: Arc<dyn ChartRenderer>,
}

impl DocumentService {
    /// Production backends. Unlike `with_backends`, an unknown default
    /// language or an unreadable CJK font is a startup error.
    pub fn new(config: Config) -> Result<Self> {
        Language::parse(&config.localization.default_language)?;
        let cjk_font = match config.layout.cjk_font_path.as_deref() {
            Some(path) => CjkFont::load(Path::new(path))?,
            None => CjkFont::default(),
        };
        let timeout = Duration::from_secs(config.charts.capture_timeout_secs);
        let loader = Arc::new(HttpAssetLoader::new(timeout)?);
        let renderer = Arc::new(DefaultChartRenderer::new(config.charts.max_width_px));
        Ok(Self::with_backends(config, loader, renderer).with_cjk_font(cjk_font))
    }

    pub fn with_backends(
        config: Config,
        loader: Arc<dyn AssetLoader>,
        renderer: Arc<dyn ChartRenderer>,
    ) -> Self {
        let geometry = config.page_geometry();
        let default_language = Language::parse(&config.localization.default_language).unwrap_or_else(|e| {
            warn!(error = %e, fallback = %Language::DEFAULT, "Configured default language ignored");
            Language::DEFAULT
        });
        Self {
            config,
            geometry,
            default_language,
            cjk_font: CjkFont::default(),
            loader,
            renderer,
        }
    }

    pub fn with_cjk_font(mut self, cjk_font: CjkFont) -> Self {
        self.cjk_font = cjk_font;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Envelope entry point: never fails, errors become `status = "error"`.
    pub async fn handle_request(&self, data: &[u8]) -> DocumentGenerationResponse {
        let request = match parse_request(data) {
            Ok(request) => request,
            Err((request_id, e)) => {
                error!(request_id = %request_id, error = %e, "Failed to parse request");
                return DocumentGenerationResponse::failed(request_id, &e);
            }
        };

        match self.generate_document(&request).await {
            Ok(documents) => DocumentGenerationResponse::success(request.request_id, documents),
            Err(e) => {
                error!(request_id = %request.request_id, error = %e, "Document generation failed");
                DocumentGenerationResponse::failed(request.request_id, &e)
            }
        }
    }

    #[instrument(skip(self, request), fields(
        request_id = %request.request_id,
        document_kind = request.kind.as_str(),
        language = request.language.as_deref().unwrap_or("default")
    ))]
    pub async fn generate_document(&self, request: &DocumentRequest) -> Result<Vec<GeneratedDocument>> {
        let prepared = self.prepare(request).await?;
        let ctx = prepared.context(&self.config.branding);

        let mut formats: Vec<DocumentFormat> = Vec::with_capacity(request.formats.len());
        for format in &request.formats {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
        if formats.is_empty() {
            formats.push(DocumentFormat::Pdf);
        }

        let mut documents = Vec::with_capacity(formats.len());
        for format in formats {
            match self.render_format(prepared.generator.as_ref(), &ctx, format) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    // Other formats may still succeed.
                    warn!(format = ?format, error = %e, "Failed to render format");
                }
            }
        }

        if documents.is_empty() {
            return Err(DocumentError::GenerationFailed(
                "no requested format could be rendered".to_string(),
            ));
        }

        info!(
            document_count = documents.len(),
            pages = documents[0].page_count,
            "Successfully generated documents"
        );
        Ok(documents)
    }

    /// Lays the document out without serializing it, for previews and checks.
    pub async fn outline(&self, request: &DocumentRequest) -> Result<DocumentOutline> {
        let prepared = self.prepare(request).await?;
        let ctx = prepared.context(&self.config.branding);
        let title = prepared.generator.title(ctx.locale);
        let mut surface = RecordingSurface::new(self.geometry);
        let mut assembler = DocumentAssembler::new(&mut surface, ctx.locale, title);
        prepared.generator.assemble(&mut assembler, &ctx)?;
        Ok(assembler.finish())
    }

    /// Everything that must be resolved before layout: validated input,
    /// captured charts and the optional logo and QR images.
    async fn prepare(&self, request: &DocumentRequest) -> Result<Prepared> {
        let request = normalize_signature(request)?;
        let table = LocalizationTable::global();
        let locale = match request.language.as_deref() {
            Some(code) => table.get(code, self.default_language),
            None => table.bundle(self.default_language),
        };
        let generator = create_generator(&request)?;

        info!(
            subject = %request.subject,
            formats = ?request.formats,
            "Processing document generation request"
        );

        let handles = merge_handles(generator.chart_handles(locale), &request.charts);
        let timeout = Duration::from_secs(self.config.charts.capture_timeout_secs);
        let charts = capture_all(self.renderer.as_ref(), &handles, timeout).await;

        let qr_url = request
            .options
            .qr_target_url
            .as_deref()
            .filter(|target| !target.trim().is_empty())
            .and_then(|target| match qr_image_url(&self.config.qr.service_url, target) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, "QR service URL could not be built, continuing without QR image");
                    None
                }
            });
        let assets = load_document_assets(
            self.loader.as_ref(),
            self.config.branding.logo_path.as_deref(),
            qr_url.as_deref(),
        )
        .await;

        let date = request.options.date.unwrap_or_else(|| Utc::now().date_naive());
        Ok(Prepared { request, locale, generator, charts, assets, date })
    }

    fn render_format(
        &self,
        generator: &dyn Generator,
        ctx: &GenerationContext<'_>,
        format: DocumentFormat,
    ) -> Result<GeneratedDocument> {
        let locale: &LocaleBundle = ctx.locale;
        let title = generator.title(locale);
        let mut surface = create_surface(format, self.geometry, &title, &self.cjk_font);

        let outline = {
            let mut assembler = DocumentAssembler::new(&mut *surface, locale, title.clone());
            generator.assemble(&mut assembler, ctx)?;
            assembler.finish()
        };
        info!(
            format = ?format,
            pages = outline.page_count,
            sections = outline.sections.len(),
            "Document assembled"
        );

        let branding = &self.config.branding;
        let company_line = if branding.website.trim().is_empty() {
            branding.company_name.clone()
        } else {
            format!("{} | {}", branding.company_name, branding.website)
        };
        let serializer = OutputSerializer::new(locale, company_line, ctx.request.options.watermark);
        let filename = document_filename(&ctx.request.subject, ctx.request.kind, ctx.date, format);
        serializer.serialize(&mut *surface, format, filename)
    }
}

struct Prepared {
    request: DocumentRequest,
    locale: &'static LocaleBundle,
    generator: Box<dyn Generator>,
    charts: Vec<ChartAsset>,
    assets: DocumentAssets,
    date: NaiveDate,
}

impl Prepared {
    fn context<'a>(&'a self, branding: &'a BrandingConfig) -> GenerationContext<'a> {
        GenerationContext {
            request: &self.request,
            locale: self.locale,
            charts: &self.charts,
            assets: &self.assets,
            branding,
            date: self.date,
        }
    }
}

/// Parses the raw envelope. The kind is checked before typed deserialization
/// so an unknown kind is reported as such rather than as a parse error.
fn parse_request(data: &[u8]) -> std::result::Result<DocumentRequest, (String, DocumentError)> {
    let mut value: Value = serde_json::from_slice(data).map_err(|e| ("unknown".to_string(), DocumentError::from(e)))?;
    let request_id = value
        .get("requestId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let kind = match value.get("kind").and_then(Value::as_str) {
        Some(kind) => DocumentKind::parse(kind).map_err(|e| (request_id.clone(), e))?,
        None => return Err((request_id, DocumentError::MissingField("kind".to_string()))),
    };
    if let Some(object) = value.as_object_mut() {
        object.insert("kind".to_string(), Value::from(kind.as_str()));
        object.insert("requestId".to_string(), Value::from(request_id.clone()));
    }

    serde_json::from_value(value)
        .map_err(|e| (request_id, DocumentError::InvalidData(format!("invalid request: {e}"))))
}

/// Seals an attached signature so every rendered format shows the same hash.
fn normalize_signature(request: &DocumentRequest) -> Result<DocumentRequest> {
    let mut request = request.clone();
    if let Some(signature) = request.options.signature.take() {
        request.options.signature = Some(signature.sealed()?);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoAssets;

    #[async_trait]
    impl AssetLoader for NoAssets {
        async fn load(&self, location: &str) -> Result<Vec<u8>> {
            Err(DocumentError::GenerationFailed(format!("offline: {location}")))
        }
    }

    fn service() -> DocumentService {
        service_with(Config::defaults().unwrap())
    }

    fn service_with(config: Config) -> DocumentService {
        let renderer = Arc::new(DefaultChartRenderer::new(config.charts.max_width_px));
        DocumentService::with_backends(config, Arc::new(NoAssets), renderer)
    }

    fn letter(language: Option<&str>) -> DocumentRequest {
        let mut body = serde_json::json!({
            "kind": "letter_of_intent",
            "subject": "Prefeitura de Campinas",
            "data": { "purpose": "install a tire recycling plant" },
            "options": { "date": "2026-10-19" }
        });
        if let Some(language) = language {
            body["language"] = Value::from(language);
        }
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn configured_language_applies_when_the_request_has_none() {
        let mut config = Config::defaults().unwrap();
        config.localization.default_language = "pt".to_string();
        let service = service_with(config);
        let pt = LocalizationTable::global().bundle(Language::Pt);

        let omitted = service.outline(&letter(None)).await.unwrap();
        assert!(omitted.sections.contains(&pt.text("loi.terms")));

        let unknown = service.outline(&letter(Some("xx"))).await.unwrap();
        assert!(unknown.sections.contains(&pt.text("loi.terms")));

        let en = LocalizationTable::global().bundle(Language::En);
        let explicit = service.outline(&letter(Some("en"))).await.unwrap();
        assert!(explicit.sections.contains(&en.text("loi.terms")));
    }

    #[test]
    fn unknown_configured_language_fails_at_startup() {
        let mut config = Config::defaults().unwrap();
        config.localization.default_language = "xx".to_string();
        assert!(matches!(
            DocumentService::new(config),
            Err(DocumentError::UnsupportedLanguage(_))
        ));
    }

    #[tokio::test]
    async fn unknown_kind_is_reported_by_kind() {
        let response = service()
            .handle_request(br#"{"requestId":"r-1","kind":"invoice","subject":"Acme"}"#)
            .await;
        assert_eq!(response.status, "error");
        assert_eq!(response.request_id, "r-1");
        assert_eq!(response.error_type.as_deref(), Some("unsupported_document_kind"));
    }

    #[tokio::test]
    async fn malformed_json_becomes_an_error_envelope() {
        let response = service().handle_request(b"{not json").await;
        assert_eq!(response.status, "error");
        assert_eq!(response.request_id, "unknown");
        assert_eq!(response.error_type.as_deref(), Some("serialization_error"));
    }

    #[tokio::test]
    async fn template_document_renders_every_requested_format() {
        let body = serde_json::json!({
            "requestId": "r-2",
            "kind": "template-document",
            "subject": "Acme Tires",
            "data": { "template": "# Hello {{name}}\n\nGranulate offer.", "record": { "name": "Acme" } },
            "options": { "watermark": "draft", "date": "2026-10-19" },
            "formats": ["pdf", "layout"]
        });
        let response = service().handle_request(body.to_string().as_bytes()).await;
        assert_eq!(response.status, "success", "{:?}", response.error);
        assert_eq!(response.documents.len(), 2);
        assert_eq!(response.documents[0].filename, "acme-tires_document_2026-10-19.pdf");
        assert_eq!(response.documents[1].filename, "acme-tires_document_2026-10-19.layout.json");
        assert!(response.documents.iter().all(|d| d.page_count == 1));
    }

    #[tokio::test]
    async fn oversized_template_heading_stays_above_the_content_bottom() {
        let request: DocumentRequest = serde_json::from_value(serde_json::json!({
            "kind": "template_document",
            "subject": "Acme Tires",
            "data": { "template": format!("# {}", "Market ".repeat(900)) },
            "options": { "date": "2026-10-19" }
        }))
        .unwrap();
        let service = service();
        let outline = service.outline(&request).await.unwrap();
        let bottom = service.config().page_geometry().content_bottom();
        assert!(outline
            .placements
            .iter()
            .all(|p| p.y + p.height <= bottom + 1e-9));
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let body = serde_json::json!({
            "kind": "professional_document",
            "subject": "Acme Tires",
            "data": { "sections": [{ "heading": "Terms", "body": "Net 30." }] },
            "options": {
                "signature": {
                    "signerName": "Ana",
                    "signerEmail": "ana@example.com",
                    "signedAt": "2026-10-19T10:00:00Z",
                    "mark": { "type": "typed", "text": "Ana" },
                    "integrityHash": "deadbeef"
                }
            },
            "formats": ["layout"]
        });
        let response = service().handle_request(body.to_string().as_bytes()).await;
        assert_eq!(response.error_type.as_deref(), Some("invalid_data"));
    }
}
