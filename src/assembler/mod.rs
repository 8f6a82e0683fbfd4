// document-synthesis-service/src/assembler/mod.rs

//! Section-level layout primitives.
//!
//! Every primitive measures its block, asks the [`PaginationController`] for
//! room and only then draws. Generators compose these primitives; they never
//! touch the cursor directly.

pub mod markup;

use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use tracing::{debug, warn};

use crate::charts::{ChartAsset, RasterImage};
use crate::layout::text::fit_text;
use crate::layout::{
    line_height, text_width, wrap_text, Color, Font, PageChrome, PageGeometry, PaginationController,
    Placement, Rect, Surface, TextStyle,
};
use crate::locale::LocaleBundle;
use crate::signature::{SignatureMark, SignatureRecord};
use markup::MarkupBlock;

const BODY: TextStyle = TextStyle::body();
const TABLE_TEXT: TextStyle = TextStyle::new(Font::Regular, 9.0, Color::TEXT);
const TABLE_HEAD: TextStyle = TextStyle::new(Font::Bold, 9.0, Color::TEXT);
const SECTION: TextStyle = TextStyle::new(Font::Bold, 14.0, Color::BRAND);
const SUBSECTION: TextStyle = TextStyle::new(Font::Bold, 11.0, Color::TEXT);
const CAPTION: TextStyle = TextStyle::new(Font::Italic, 8.5, Color::MUTED);

const PARAGRAPH_GAP: f64 = 6.0;
const SECTION_GAP: f64 = 16.0;
const CELL_PADDING: f64 = 4.0;
const MAX_CELL_LINES: usize = 6;
// Headings, titles, captions and links are kept whole on one page, so they
// are cut to a few lines.
const MAX_HEADING_LINES: usize = 3;
const MAX_CAPTION_LINES: usize = 3;
const LIST_INDENT: f64 = 14.0;
const CHART_MAX_SHARE: f64 = 0.45;
const SIGNATURE_IMAGE_HEIGHT: f64 = 36.0;
const QR_SIZE: f64 = 110.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub title: String,
    /// Relative width; columns share the content width proportionally.
    pub weight: f64,
    pub align: Align,
}

impl Column {
    pub fn left(title: impl Into<String>, weight: f64) -> Self {
        Self { title: title.into(), weight, align: Align::Left }
    }

    pub fn right(title: impl Into<String>, weight: f64) -> Self {
        Self { title: title.into(), weight, align: Align::Right }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
    /// Draws the last row in bold, for totals.
    pub total_row: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CoverPage<'a> {
    pub company: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub fields: Vec<(String, String)>,
    pub logo: Option<&'a RasterImage>,
}

/// One side of a signature block. Without a record the fields stay blank.
#[derive(Debug, Clone)]
pub struct SignatureParty<'a> {
    pub party: String,
    pub record: Option<&'a SignatureRecord>,
}

/// What the assembler produced, for logging and structural comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentOutline {
    pub sections: Vec<String>,
    pub page_count: usize,
    pub placements: Vec<Placement>,
}

pub struct DocumentAssembler<'a> {
    surface: &'a mut dyn Surface,
    pager: PaginationController,
    locale: &'a LocaleBundle,
    sections: Vec<String>,
    section_number: usize,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(surface: &'a mut dyn Surface, locale: &'a LocaleBundle, header: String) -> Self {
        let geometry = *surface.geometry();
        let mut pager = PaginationController::new(geometry, PageChrome { header });
        pager.begin(surface);
        Self {
            surface,
            pager,
            locale,
            sections: Vec::new(),
            section_number: 0,
        }
    }

    fn geometry(&self) -> PageGeometry {
        *self.pager.geometry()
    }

    fn left(&self) -> f64 {
        self.geometry().content_left()
    }

    fn width(&self) -> f64 {
        self.geometry().content_width()
    }

    fn fits(&self, height: f64) -> bool {
        self.pager.cursor().y + height <= self.pager.cursor().bottom
    }

    pub fn spacer(&mut self, height: f64) {
        self.pager.advance(height);
    }

    pub fn page_break(&mut self) {
        self.pager.new_page(self.surface);
    }

    pub fn cover(&mut self, cover: &CoverPage<'_>) {
        let left = self.left();
        let width = self.width();

        if let Some(logo) = cover.logo {
            let (w, h) = fit_box(logo.aspect_ratio(), 140.0, 56.0);
            let y = self.pager.reserve(self.surface, h + 12.0);
            self.surface.draw_image(Rect::new(left, y, w, h), logo);
        }
        let company = TextStyle::new(Font::Bold, 11.0, Color::MUTED);
        let y = self.pager.reserve(self.surface, line_height(company.size));
        self.surface.draw_text(left, y, &cover.company, &company);
        let y = self.pager.reserve(self.surface, 4.0);
        self.surface.draw_rect(Rect::new(left, y + 2.0, width, 2.0), Color::BRAND);

        self.pager.reserve(self.surface, 150.0);
        let title = TextStyle::new(Font::Bold, 26.0, Color::BRAND);
        for line in wrap_text(&cover.title, &title, width) {
            let y = self.pager.reserve(self.surface, line_height(title.size));
            self.surface.draw_text(left, y, &line, &title);
        }
        if let Some(subtitle) = &cover.subtitle {
            let style = TextStyle::new(Font::Regular, 13.0, Color::MUTED);
            self.pager.reserve(self.surface, 6.0);
            for line in wrap_text(subtitle, &style, width) {
                let y = self.pager.reserve(self.surface, line_height(style.size));
                self.surface.draw_text(left, y, &line, &style);
            }
        }

        self.pager.reserve(self.surface, 60.0);
        let label_style = TextStyle::new(Font::Bold, 10.0, Color::MUTED);
        let label_width = cover
            .fields
            .iter()
            .map(|(label, _)| text_width(label, &label_style))
            .fold(0.0, f64::max)
            .min(width * 0.4)
            + 12.0;
        for (label, value) in &cover.fields {
            let label = fit_text(label, &label_style, label_width - 12.0);
            for (i, line) in wrap_text(value, &BODY, width - label_width).iter().enumerate() {
                let y = self.pager.reserve(self.surface, line_height(BODY.size));
                if i == 0 {
                    self.surface.draw_text(left, y, &label, &label_style);
                }
                self.surface.draw_text(left + label_width, y, line, &BODY);
            }
            self.pager.reserve(self.surface, 4.0);
        }
        self.sections.push("cover".to_string());
        self.page_break();
    }

    /// Numbered section heading, kept together with the first body line.
    pub fn section(&mut self, title: &str) {
        self.section_number += 1;
        let text = format!("{}. {}", self.section_number, title);
        self.heading_block(&text, &SECTION, SECTION_GAP);
        self.sections.push(title.to_string());
        debug!(section = %title, page = self.pager.cursor().page + 1, "Section started");
    }

    pub fn subheading(&mut self, title: &str) {
        self.heading_block(title, &SUBSECTION, 8.0);
    }

    /// Unnumbered top-level title, used by documents without a cover.
    pub fn title(&mut self, title: &str, subtitle: Option<&str>) {
        let style = TextStyle::new(Font::Bold, 20.0, Color::BRAND);
        let lines = wrap_capped(title, &style, self.width(), MAX_HEADING_LINES);
        let height = lines.len() as f64 * line_height(style.size);
        let left = self.left();
        let y = self.pager.reserve_keep_with(self.surface, height, line_height(BODY.size));
        for (i, line) in lines.iter().enumerate() {
            self.surface
                .draw_text(left, y + i as f64 * line_height(style.size), line, &style);
        }
        if let Some(subtitle) = subtitle {
            let style = TextStyle::new(Font::Regular, 12.0, Color::MUTED);
            for line in wrap_text(subtitle, &style, self.width()) {
                let y = self.pager.reserve(self.surface, line_height(style.size));
                self.surface.draw_text(left, y, &line, &style);
            }
        }
        let right = left + self.width();
        let y = self.pager.reserve(self.surface, 10.0);
        self.surface
            .draw_line((left, y + 5.0), (right, y + 5.0), 1.0, Color::BRAND);
        self.sections.push(title.to_string());
    }

    fn heading_block(&mut self, text: &str, style: &TextStyle, gap: f64) {
        self.spacer(gap);
        let lines = wrap_capped(text, style, self.width(), MAX_HEADING_LINES);
        let height = lines.len() as f64 * line_height(style.size) + 6.0;
        let left = self.left();
        let y = self
            .pager
            .reserve_keep_with(self.surface, height, line_height(BODY.size) * 2.0);
        for (i, line) in lines.iter().enumerate() {
            self.surface
                .draw_text(left, y + i as f64 * line_height(style.size), line, style);
        }
        if style.size >= SECTION.size {
            let rule_y = y + height - 3.0;
            let right = left + self.width();
            self.surface
                .draw_line((left, rule_y), (right, rule_y), 0.75, Color::RULE);
        }
    }

    pub fn paragraph(&mut self, text: &str) {
        self.styled_paragraph(text, &BODY);
    }

    pub fn styled_paragraph(&mut self, text: &str, style: &TextStyle) {
        let left = self.left();
        let width = self.width();
        self.lines_at(text, style, left, width);
        self.spacer(PARAGRAPH_GAP);
    }

    // One reservation per line so long paragraphs flow across pages.
    fn lines_at(&mut self, text: &str, style: &TextStyle, x: f64, width: f64) {
        for line in wrap_text(text, style, width) {
            let y = self.pager.reserve(self.surface, line_height(style.size));
            if !line.is_empty() {
                self.surface.draw_text(x, y, &line, style);
            }
        }
    }

    pub fn bullets<S: AsRef<str>>(&mut self, items: &[S]) {
        self.list(items.iter().map(|_| "•".to_string()), items);
    }

    pub fn numbered<S: AsRef<str>>(&mut self, items: &[S]) {
        self.list((1..=items.len()).map(|i| format!("{i}.")), items);
    }

    fn list<S: AsRef<str>>(&mut self, markers: impl Iterator<Item = String>, items: &[S]) {
        let left = self.left();
        let indent = LIST_INDENT + if items.len() >= 10 { 6.0 } else { 0.0 };
        let width = self.width() - indent;
        let lh = line_height(BODY.size);
        for (marker, item) in markers.zip(items) {
            let lines = wrap_text(item.as_ref(), &BODY, width);
            for (i, line) in lines.iter().enumerate() {
                let y = self.pager.reserve(self.surface, lh);
                if i == 0 {
                    self.surface.draw_text(left, y, &marker, &BODY);
                }
                self.surface.draw_text(left + indent, y, line, &BODY);
            }
            self.pager.reserve(self.surface, 2.0);
        }
        self.spacer(PARAGRAPH_GAP);
    }

    /// Two-column label/value table.
    pub fn key_value_table(&mut self, rows: &[(String, String)]) {
        let table = Table {
            columns: vec![
                Column::left(self.locale.text("common.item"), 3.0),
                Column::right(self.locale.text("common.value"), 2.0),
            ],
            rows: rows.iter().map(|(k, v)| vec![k.clone(), v.clone()]).collect(),
            total_row: false,
        };
        self.table(&table);
    }

    /// Data table; the header row is repeated on every page the table spans.
    pub fn table(&mut self, table: &Table) {
        if table.columns.is_empty() {
            return;
        }
        let widths = self.column_widths(&table.columns);
        let header_cells: Vec<String> = table.columns.iter().map(|c| c.title.clone()).collect();
        let header = self.layout_row(&header_cells, &widths, &TABLE_HEAD);

        let first_row_height = table
            .rows
            .first()
            .map(|row| self.layout_row(row, &widths, &TABLE_TEXT).0)
            .unwrap_or(0.0);
        let y = self.pager.reserve_keep_with(self.surface, header.0, first_row_height);
        self.draw_row(y, &header, &widths, &table.columns, &TABLE_HEAD, Some(Color::TABLE_HEADER));

        for (index, row) in table.rows.iter().enumerate() {
            let is_total = table.total_row && index + 1 == table.rows.len();
            let style = if is_total { TABLE_HEAD } else { TABLE_TEXT };
            let laid_out = self.layout_row(row, &widths, &style);

            if !self.fits(laid_out.0) {
                self.page_break();
                let y = self.pager.reserve(self.surface, header.0);
                self.draw_row(y, &header, &widths, &table.columns, &TABLE_HEAD, Some(Color::TABLE_HEADER));
            }
            let y = self.pager.reserve(self.surface, laid_out.0);
            let fill = if is_total {
                Some(Color::TABLE_HEADER)
            } else if index % 2 == 1 {
                Some(Color::STRIPE)
            } else {
                None
            };
            self.draw_row(y, &laid_out, &widths, &table.columns, &style, fill);
        }

        let y = self.pager.cursor().y;
        let left = self.left();
        self.surface
            .draw_line((left, y), (left + widths.iter().sum::<f64>(), y), 0.5, Color::RULE);
        self.spacer(PARAGRAPH_GAP + 4.0);
    }

    fn column_widths(&self, columns: &[Column]) -> Vec<f64> {
        let total: f64 = columns.iter().map(|c| c.weight.max(0.1)).sum();
        columns
            .iter()
            .map(|c| self.width() * c.weight.max(0.1) / total)
            .collect()
    }

    fn layout_row(&self, cells: &[String], widths: &[f64], style: &TextStyle) -> (f64, Vec<Vec<String>>) {
        let lh = line_height(style.size);
        let wrapped: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let text = cells.get(i).map(String::as_str).unwrap_or("");
                let inner = (width - 2.0 * CELL_PADDING).max(1.0);
                wrap_capped(text, style, inner, MAX_CELL_LINES)
            })
            .collect();
        let max_lines = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        (max_lines as f64 * lh + 2.0 * CELL_PADDING, wrapped)
    }

    fn draw_row(
        &mut self,
        y: f64,
        row: &(f64, Vec<Vec<String>>),
        widths: &[f64],
        columns: &[Column],
        style: &TextStyle,
        fill: Option<Color>,
    ) {
        let left = self.left();
        let (height, cells) = row;
        if let Some(fill) = fill {
            self.surface
                .draw_rect(Rect::new(left, y, widths.iter().sum(), *height), fill);
        }
        let lh = line_height(style.size);
        let mut x = left;
        for ((width, lines), column) in widths.iter().zip(cells).zip(columns) {
            for (i, line) in lines.iter().enumerate() {
                let line_x = match column.align {
                    Align::Left => x + CELL_PADDING,
                    Align::Right => x + width - CELL_PADDING - text_width(line, style),
                };
                self.surface
                    .draw_text(line_x, y + CELL_PADDING + i as f64 * lh, line, style);
            }
            x += width;
        }
    }

    /// Chart image, or a placeholder box with the caption when capture failed.
    pub fn chart(&mut self, asset: &ChartAsset, note: Option<&str>) {
        let max_height = self.geometry().content_height() * CHART_MAX_SHARE;
        let aspect = asset
            .image
            .as_ref()
            .map(RasterImage::aspect_ratio)
            .unwrap_or(asset.aspect_ratio);
        let (width, height) = fit_box(aspect, self.width(), max_height);
        let caption_lines = wrap_capped(&asset.caption, &CAPTION, self.width(), MAX_CAPTION_LINES);
        let caption_height = caption_lines.len() as f64 * line_height(CAPTION.size);

        let y = self.pager.reserve(self.surface, height + 4.0 + caption_height);
        let x = self.left() + (self.width() - width) / 2.0;
        match &asset.image {
            Some(image) => self.surface.draw_image(Rect::new(x, y, width, height), image),
            None => {
                self.surface
                    .draw_rect(Rect::new(x, y, width, height), Color::PLACEHOLDER);
                let text = self
                    .locale
                    .render("chart.unavailable", &serde_json::json!({ "caption": asset.caption }));
                let style = TextStyle::new(Font::Italic, 10.0, Color::MUTED);
                let text = fit_text(&text, &style, width - 16.0);
                let text_x = x + (width - text_width(&text, &style)) / 2.0;
                self.surface
                    .draw_text(text_x, y + height / 2.0 - style.size / 2.0, &text, &style);
            }
        }
        for (i, line) in caption_lines.iter().enumerate() {
            let line_x = self.left() + (self.width() - text_width(line, &CAPTION)) / 2.0;
            self.surface.draw_text(
                line_x,
                y + height + 4.0 + i as f64 * line_height(CAPTION.size),
                line,
                &CAPTION,
            );
        }
        self.spacer(4.0);
        if let Some(note) = note {
            self.paragraph(note);
        }
    }

    /// Lays out free text written in the lightweight markup.
    pub fn markup(&mut self, source: &str) {
        for block in markup::parse(source) {
            match block {
                MarkupBlock::Heading { level: 1, text } => self.heading_block(&text, &SUBSECTION, 10.0),
                MarkupBlock::Heading { text, .. } => {
                    let style = TextStyle::bold(10.0);
                    self.heading_block(&text, &style, 6.0);
                }
                MarkupBlock::Paragraph(text) => self.paragraph(&text),
                MarkupBlock::Bold(text) => self.styled_paragraph(&text, &TextStyle::bold(BODY.size)),
                MarkupBlock::Bullets(items) => self.bullets(&items),
                MarkupBlock::Numbered(items) => self.numbered(&items),
                MarkupBlock::Table(mut rows) => {
                    if rows.is_empty() {
                        continue;
                    }
                    let header = rows.remove(0);
                    let columns = header.into_iter().map(|title| Column::left(title, 1.0)).collect();
                    self.table(&Table { columns, rows, total_row: false });
                }
            }
        }
    }

    /// Side-by-side signature boxes, two per row.
    pub fn signature_block(&mut self, parties: &[SignatureParty<'_>]) {
        let gap = 20.0;
        let box_width = (self.width() - gap) / 2.0;
        let label = TextStyle::new(Font::Bold, 8.0, Color::MUTED);
        let lh = line_height(BODY.size);
        let box_height = 18.0 + SIGNATURE_IMAGE_HEIGHT + 6.0 + 4.0 * (lh + 2.0);

        for pair in parties.chunks(2) {
            let y = self.pager.reserve(self.surface, box_height + 12.0);
            for (column, party) in pair.iter().enumerate() {
                let x = self.left() + column as f64 * (box_width + gap);
                let heading = self.locale.render("sig.for", &serde_json::json!({ "party": party.party }));
                self.surface
                    .draw_text(x, y, &fit_text(&heading, &SUBSECTION, box_width), &SUBSECTION);

                let mark_top = y + 18.0;
                let line_y = mark_top + SIGNATURE_IMAGE_HEIGHT;
                match party.record.map(|r| &r.mark) {
                    Some(SignatureMark::Drawn { image_base64 }) => {
                        match decode_signature(image_base64) {
                            Some(image) => {
                                let (w, h) = fit_box(image.aspect_ratio(), box_width * 0.8, SIGNATURE_IMAGE_HEIGHT);
                                self.surface
                                    .draw_image(Rect::new(x, line_y - h, w, h), &image);
                            }
                            None => warn!(party = %party.party, "Drawn signature could not be decoded"),
                        }
                    }
                    Some(SignatureMark::Typed { text }) => {
                        let style = TextStyle::new(Font::Italic, 16.0, Color::TEXT);
                        self.surface
                            .draw_text(x, line_y - 22.0, &fit_text(text, &style, box_width), &style);
                    }
                    None => {}
                }
                self.surface
                    .draw_line((x, line_y), (x + box_width, line_y), 0.75, Color::MUTED);
                self.surface
                    .draw_text(x, line_y + 2.0, &self.locale.text("sig.signature"), &label);

                let record = party.record;
                let date = record
                    .map(|r| self.locale.format_date(r.signed_at.date_naive()))
                    .unwrap_or_default();
                let mut fields = vec![
                    ("sig.name", record.map(|r| r.signer_name.clone()).unwrap_or_default()),
                    ("sig.email", record.map(|r| r.signer_email.clone()).unwrap_or_default()),
                    ("sig.date", date),
                ];
                if let Some(record) = record {
                    let note = match record.mark {
                        SignatureMark::Typed { .. } => format!(" ({})", self.locale.text("sig.typed_note")),
                        SignatureMark::Drawn { .. } => String::new(),
                    };
                    fields.push(("sig.hash", format!("{}{}", record.short_hash(), note)));
                }

                let mut field_y = line_y + 6.0 + lh - 2.0;
                for (key, value) in fields {
                    let text = format!("{}: {}", self.locale.text(key), value);
                    self.surface
                        .draw_text(x, field_y, &fit_text(&text, &TABLE_TEXT, box_width), &TABLE_TEXT);
                    if value.is_empty() {
                        let start = x + text_width(&text, &TABLE_TEXT) + 2.0;
                        let underline_y = field_y + TABLE_TEXT.size;
                        if start < x + box_width {
                            self.surface
                                .draw_line((start, underline_y), (x + box_width, underline_y), 0.5, Color::RULE);
                        }
                    }
                    field_y += lh + 2.0;
                }
            }
        }
        self.spacer(PARAGRAPH_GAP);
    }

    /// QR code with the partnership link beside it. Without an image only the
    /// link is printed.
    pub fn qr_block(&mut self, qr: Option<&RasterImage>, url: &str) {
        let left = self.left();
        let text_x = if qr.is_some() { left + QR_SIZE + 16.0 } else { left };
        let text_width_available = self.width() - (text_x - left);
        let body_lines = wrap_capped(&self.locale.text("qr.body"), &BODY, text_width_available, 4);
        let url_style = TextStyle::new(Font::Regular, 9.0, Color::BRAND);
        let url_lines = wrap_capped(url, &url_style, text_width_available, MAX_CAPTION_LINES);
        let text_height = body_lines.len() as f64 * line_height(BODY.size)
            + 4.0
            + url_lines.len() as f64 * line_height(url_style.size);
        let height = if qr.is_some() { text_height.max(QR_SIZE) } else { text_height };

        let y = self.pager.reserve(self.surface, height);
        if let Some(qr) = qr {
            self.surface.draw_image(Rect::new(left, y, QR_SIZE, QR_SIZE), qr);
        }
        let mut line_y = y;
        for line in &body_lines {
            self.surface.draw_text(text_x, line_y, line, &BODY);
            line_y += line_height(BODY.size);
        }
        line_y += 4.0;
        for line in &url_lines {
            self.surface.draw_text(text_x, line_y, line, &url_style);
            line_y += line_height(url_style.size);
        }
        self.spacer(PARAGRAPH_GAP);
    }

    /// Closes the last page and hands back what was laid out.
    pub fn finish(mut self) -> DocumentOutline {
        self.pager.finish(self.surface);
        DocumentOutline {
            sections: self.sections,
            page_count: self.surface.page_count(),
            placements: self.pager.placements().to_vec(),
        }
    }
}

fn decode_signature(image_base64: &str) -> Option<RasterImage> {
    let payload = image_base64
        .split_once(',')
        .map(|(_, data)| data)
        .unwrap_or(image_base64);
    let bytes = general_purpose::STANDARD.decode(payload.trim()).ok()?;
    RasterImage::decode(&bytes).ok()
}

/// Wraps `text` to at most `max_lines`; the last kept line ends in an ellipsis.
fn wrap_capped(text: &str, style: &TextStyle, width: f64, max_lines: usize) -> Vec<String> {
    let mut lines = wrap_text(text, style, width);
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            *last = fit_text(&format!("{last}…"), style, width);
        }
    }
    lines
}

/// Largest `(width, height)` with the given aspect ratio inside the box.
fn fit_box(aspect_ratio: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.0 { aspect_ratio } else { 1.0 };
    let width = max_width.min(max_height * aspect);
    (width, width / aspect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::{Language, LocalizationTable};
    use crate::renderers::RecordingSurface;
    use chrono::{TimeZone, Utc};

    fn with_assembler<F: FnOnce(&mut DocumentAssembler<'_>)>(build: F) -> (DocumentOutline, RecordingSurface) {
        let mut surface = RecordingSurface::new(PageGeometry::a4());
        let locale = LocalizationTable::global().bundle(Language::En);
        let outline = {
            let mut assembler = DocumentAssembler::new(&mut surface, locale, "Header".to_string());
            build(&mut assembler);
            assembler.finish()
        };
        (outline, surface)
    }

    fn assert_within_content(outline: &DocumentOutline) {
        let bottom = PageGeometry::a4().content_bottom();
        for placement in &outline.placements {
            assert!(placement.y + placement.height <= bottom + 1e-9, "{placement:?}");
        }
    }

    #[test]
    fn long_table_repeats_its_header_on_each_page() {
        let (outline, surface) = with_assembler(|asm| {
            asm.section("Cash Flow");
            let rows = (0..120)
                .map(|i| vec![format!("Year {i}"), format!("{}", i * 1000)])
                .collect();
            asm.table(&Table {
                columns: vec![Column::left("Year", 1.0), Column::right("Net cash flow", 1.0)],
                rows,
                total_row: false,
            });
        });
        assert!(outline.page_count >= 3);
        for page in surface.pages() {
            assert!(page.texts().any(|t| t == "Net cash flow"));
        }
        assert_within_content(&outline);
    }

    #[test]
    fn long_paragraphs_flow_across_pages() {
        let text = "Tire-derived rubber granulate finds buyers in several markets. ".repeat(400);
        let (outline, _) = with_assembler(|asm| asm.paragraph(&text));
        assert!(outline.page_count > 1);
        assert_within_content(&outline);
    }

    #[test]
    fn missing_chart_draws_placeholder_caption() {
        let asset = ChartAsset {
            id: "revenue".into(),
            caption: "Annual revenue by scenario".into(),
            aspect_ratio: 16.0 / 9.0,
            image: None,
        };
        let (_, surface) = with_assembler(|asm| asm.chart(&asset, Some("Note")));
        assert!(surface.page_has_text(0, "Chart unavailable: Annual revenue by scenario"));
    }

    #[test]
    fn cover_is_alone_on_the_first_page_and_has_no_header() {
        let (outline, surface) = with_assembler(|asm| {
            asm.cover(&CoverPage {
                company: "Industrial Recycling Group".into(),
                title: "Feasibility Study".into(),
                subtitle: None,
                fields: vec![("Prepared for".into(), "Acme".into())],
                logo: None,
            });
            asm.section("Executive Summary");
        });
        assert_eq!(outline.page_count, 2);
        assert_eq!(outline.sections, vec!["cover", "Executive Summary"]);
        assert!(!surface.page_has_text(0, "Header"));
        assert!(surface.page_has_text(1, "Header"));
        assert!(surface.page_has_text(1, "1. Executive Summary"));
    }

    #[test]
    fn blank_and_typed_signatures() {
        let record = SignatureRecord::new(
            "Ana Souza",
            "ana@example.com",
            Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap(),
            SignatureMark::Typed { text: "Ana Souza".into() },
        );
        let (_, surface) = with_assembler(|asm| {
            asm.signature_block(&[
                SignatureParty { party: "Acme".into(), record: Some(&record) },
                SignatureParty { party: "Industrial Recycling Group".into(), record: None },
            ]);
        });
        assert!(surface.page_has_text(0, "For Acme"));
        assert!(surface.page_has_text(0, "Name: Ana Souza"));
        assert!(surface.page_has_text(0, record.short_hash()));
        assert!(surface.page_has_text(0, "Name: "));
    }

    #[test]
    fn markup_tables_use_first_row_as_header() {
        let (_, surface) = with_assembler(|asm| asm.markup("| Product | Share |\n|---|---|\n| Rubber | 75% |"));
        let page = &surface.pages()[0];
        assert!(page.texts().any(|t| t == "Product"));
        assert!(page.texts().any(|t| t == "Rubber"));
    }

    #[test]
    fn oversized_headings_and_links_stay_inside_the_page() {
        let long = "Market ".repeat(900);
        let url = format!("https://partners.example/{}", "segment/".repeat(400));
        let (outline, surface) = with_assembler(|asm| {
            asm.title(&long, Some(long.as_str()));
            asm.markup(&format!("# {long}\n\nBody text."));
            asm.section(&long);
            asm.subheading(&long);
            asm.qr_block(None, &url);
            asm.chart(
                &ChartAsset {
                    id: "revenue".into(),
                    caption: long.clone(),
                    aspect_ratio: 16.0 / 9.0,
                    image: None,
                },
                None,
            );
        });
        assert_within_content(&outline);
        let cut = surface
            .pages()
            .iter()
            .flat_map(|page| page.texts())
            .filter(|t| t.ends_with('…'))
            .count();
        assert!(cut >= 6, "only {cut} lines were cut");
    }

    #[test]
    fn long_cover_values_flow_line_by_line() {
        let (outline, _) = with_assembler(|asm| {
            asm.cover(&CoverPage {
                company: "Industrial Recycling Group".into(),
                title: "Plant ".repeat(300),
                subtitle: Some("Granulate ".repeat(300)),
                fields: vec![("Prepared for".into(), "Acme ".repeat(2_000))],
                logo: None,
            });
            asm.section("Executive Summary");
        });
        assert!(outline.page_count > 2);
        assert_within_content(&outline);
    }

    #[test]
    fn fit_box_preserves_aspect_ratio() {
        assert_eq!(fit_box(2.0, 400.0, 100.0), (200.0, 100.0));
        assert_eq!(fit_box(2.0, 100.0, 100.0), (100.0, 50.0));
    }
}
