// document-synthesis-service/src/output.rs

use base64::{engine::general_purpose, Engine as _};
use chrono::NaiveDate;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::Result;
use crate::layout::text::fit_text;
use crate::layout::{text_width, Color, Font, Surface, TextStyle};
use crate::locale::{fold_accent, LocaleBundle};
use crate::models::{DocumentFormat, DocumentKind, GeneratedDocument, Watermark};

const FOOTER_OFFSET: f64 = 18.0;
const WATERMARK_ANGLE: f64 = 45.0;

/// Final pass over an assembled surface: page numbers, company line and
/// watermark on every page, then serialization into a named artifact.
pub struct OutputSerializer<'a> {
    locale: &'a LocaleBundle,
    company_line: String,
    watermark: Watermark,
}

impl<'a> OutputSerializer<'a> {
    pub fn new(locale: &'a LocaleBundle, company_line: String, watermark: Watermark) -> Self {
        Self { locale, company_line, watermark }
    }

    pub fn stamp(&self, surface: &mut dyn Surface) {
        let geometry = *surface.geometry();
        let total = surface.page_count();
        let footer_style = TextStyle::small();
        let footer_y = geometry.content_bottom() + FOOTER_OFFSET;
        let left = geometry.content_left();
        let right = left + geometry.content_width();
        let watermark = self.watermark.label_key().map(|key| self.locale.text(key));

        for index in 0..total {
            surface.select_page(index);

            let page_label = self
                .locale
                .render("footer.page", &json!({ "page": index + 1, "total": total }));
            let label_width = text_width(&page_label, &footer_style);
            surface.draw_text(right - label_width, footer_y, &page_label, &footer_style);
            let company = fit_text(
                &self.company_line,
                &footer_style,
                (geometry.content_width() - label_width - 24.0).max(0.0),
            );
            surface.draw_text(left, footer_y, &company, &footer_style);

            if let Some(text) = &watermark {
                let style = TextStyle::new(Font::Bold, 64.0, Color::WATERMARK);
                let half = text_width(text, &style) / 2.0;
                let (sin, cos) = WATERMARK_ANGLE.to_radians().sin_cos();
                let x = geometry.width / 2.0 - half * cos;
                let y = geometry.height / 2.0 + half * sin;
                surface.draw_rotated_text(x, y, WATERMARK_ANGLE, text, &style);
            }
        }
    }

    pub fn serialize(
        &self,
        surface: &mut dyn Surface,
        format: DocumentFormat,
        filename: String,
    ) -> Result<GeneratedDocument> {
        self.stamp(surface);
        let page_count = surface.page_count();
        let bytes = surface.finish()?;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        info!(
            filename = %filename,
            format = ?format,
            pages = page_count,
            size_kb = bytes.len() / 1024,
            watermark = ?self.watermark,
            "Document serialized"
        );

        Ok(GeneratedDocument {
            format,
            content_base64: general_purpose::STANDARD.encode(&bytes),
            filename,
            mime_type: format.mime_type().to_string(),
            size_bytes: bytes.len(),
            sha256,
            page_count,
        })
    }
}

/// `{subject-slug}_{kind-slug}_{YYYY-MM-DD}.{ext}`
pub fn document_filename(subject: &str, kind: DocumentKind, date: NaiveDate, format: DocumentFormat) -> String {
    format!(
        "{}_{}_{}.{}",
        slugify(subject),
        kind.slug(),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// ASCII-folded, lowercase, dash-separated; `document` when nothing survives.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars().map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "document".to_string()
    } else {
        slug.chars().take(60).collect::<String>().trim_end_matches('-').to_string()
    }
}
