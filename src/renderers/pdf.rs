// document-synthesis-service/src/renderers/pdf.rs

use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect as PdfRect, Ref, Str, TextStr};
use tracing::{debug, info};

use super::cjk::{self, CjkFont};
use crate::charts::RasterImage;
use crate::error::Result;
use crate::layout::text::{encode_runs, EncodedRun};
use crate::layout::{Color, Font, PageGeometry, Rect, Surface, TextStyle};

const FONTS: [(Font, &[u8], &[u8]); 3] = [
    (Font::Regular, b"F1", b"Helvetica"),
    (Font::Bold, b"F2", b"Helvetica-Bold"),
    (Font::Italic, b"F3", b"Helvetica-Oblique"),
];

// Distance from the top of the line box to the baseline, in em.
const ASCENT: f64 = 0.8;

fn font_resource(font: Font) -> Name<'static> {
    match font {
        Font::Regular => Name(b"F1"),
        Font::Bold => Name(b"F2"),
        Font::Italic => Name(b"F3"),
    }
}

struct EmbeddedImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

struct PageBuffer {
    content: Content,
    images: Vec<usize>,
}

impl PageBuffer {
    fn new() -> Self {
        Self { content: Content::new(), images: Vec::new() }
    }
}

/// Paged PDF output. Text is set in the builtin Helvetica family with WinAnsi
/// encoding; anything WinAnsi lacks goes to the composite CJK font, which is
/// only written when some page uses it.
pub struct PdfSurface {
    geometry: PageGeometry,
    title: String,
    pages: Vec<PageBuffer>,
    images: Vec<EmbeddedImage>,
    current: usize,
    cjk: CjkFont,
    uses_cjk: bool,
}

impl PdfSurface {
    pub fn new(geometry: PageGeometry, title: &str) -> Self {
        Self::with_cjk_font(geometry, title, CjkFont::default())
    }

    pub fn with_cjk_font(geometry: PageGeometry, title: &str, cjk: CjkFont) -> Self {
        Self {
            geometry,
            title: title.to_string(),
            pages: Vec::new(),
            images: Vec::new(),
            current: 0,
            cjk,
            uses_cjk: false,
        }
    }

    /// Shows `text` at the current text position, one `Tj` per font run.
    fn show(&mut self, text: &str, style: &TextStyle) {
        let runs = encode_runs(text);
        if runs.iter().any(|run| matches!(run, EncodedRun::Wide(_))) {
            self.uses_cjk = true;
        }
        let size = style.size as f32;
        let content = &mut self.page().content;
        for run in &runs {
            match run {
                EncodedRun::WinAnsi(bytes) => {
                    content.set_font(font_resource(style.font), size);
                    content.show(Str(bytes));
                }
                EncodedRun::Wide(bytes) => {
                    content.set_font(cjk::RESOURCE, size);
                    content.show(Str(bytes));
                }
            }
        }
    }

    fn page(&mut self) -> &mut PageBuffer {
        if self.pages.is_empty() {
            self.start_page();
        }
        &mut self.pages[self.current]
    }

    fn flip(&self, y: f64) -> f32 {
        (self.geometry.height - y) as f32
    }
}

impl Surface for PdfSurface {
    fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    fn start_page(&mut self) {
        self.pages.push(PageBuffer::new());
        self.current = self.pages.len() - 1;
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn select_page(&mut self, index: usize) {
        if index < self.pages.len() {
            self.current = index;
        }
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str, style: &TextStyle) {
        let baseline = self.flip(y + style.size * ASCENT);
        let (r, g, b) = style.color.unit();
        let content = &mut self.page().content;
        content.set_fill_rgb(r, g, b);
        content.begin_text();
        content.next_line(x as f32, baseline);
        self.show(text, style);
        self.page().content.end_text();
    }

    fn draw_rotated_text(&mut self, x: f64, y: f64, angle_deg: f64, text: &str, style: &TextStyle) {
        let origin_y = self.flip(y);
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        let (r, g, b) = style.color.unit();
        let content = &mut self.page().content;
        content.set_fill_rgb(r, g, b);
        content.begin_text();
        content.set_text_matrix([cos as f32, sin as f32, -sin as f32, cos as f32, x as f32, origin_y]);
        self.show(text, style);
        self.page().content.end_text();
    }

    fn draw_rect(&mut self, rect: Rect, fill: Color) {
        let bottom = self.flip(rect.y + rect.height);
        let (r, g, b) = fill.unit();
        let content = &mut self.page().content;
        content.set_fill_rgb(r, g, b);
        content.rect(rect.x as f32, bottom, rect.width as f32, rect.height as f32);
        content.fill_nonzero();
    }

    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color) {
        let (y0, y1) = (self.flip(from.1), self.flip(to.1));
        let (r, g, b) = color.unit();
        let content = &mut self.page().content;
        content.set_stroke_rgb(r, g, b);
        content.set_line_width(width as f32);
        content.move_to(from.0 as f32, y0);
        content.line_to(to.0 as f32, y1);
        content.stroke();
    }

    fn draw_image(&mut self, rect: Rect, image: &RasterImage) {
        let index = self.images.len();
        self.images.push(EmbeddedImage {
            width: image.width(),
            height: image.height(),
            data: compress_to_vec_zlib(&image.rgb_over_white(), 6),
        });
        let bottom = self.flip(rect.y + rect.height);
        let name = format!("Im{}", index + 1);
        let page = self.page();
        page.images.push(index);
        page.content.save_state();
        page.content.transform([
            rect.width as f32,
            0.0,
            0.0,
            rect.height as f32,
            rect.x as f32,
            bottom,
        ]);
        page.content.x_object(Name(name.as_bytes()));
        page.content.restore_state();
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            self.start_page();
        }
        let pages = std::mem::take(&mut self.pages);
        let images = std::mem::take(&mut self.images);

        let mut next_id = 1;
        let mut alloc = || {
            let id = Ref::new(next_id);
            next_id += 1;
            id
        };

        let mut pdf = Pdf::new();
        let catalog_id = alloc();
        let page_tree_id = alloc();
        let info_id = alloc();
        let font_ids: Vec<Ref> = FONTS.iter().map(|_| alloc()).collect();
        let cjk_id = self.uses_cjk.then(&mut alloc);
        let image_ids: Vec<Ref> = images.iter().map(|_| alloc()).collect();
        let page_ids: Vec<Ref> = pages.iter().map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = pages.iter().map(|_| alloc()).collect();

        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);
        pdf.document_info(info_id)
            .title(TextStr(&self.title))
            .producer(TextStr(env!("CARGO_PKG_NAME")));

        for ((_, _, base), id) in FONTS.iter().zip(&font_ids) {
            pdf.type1_font(*id)
                .base_font(Name(*base))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }
        if let Some(id) = cjk_id {
            self.cjk.write(&mut pdf, id, &mut alloc);
        }

        for (image, id) in images.iter().zip(&image_ids) {
            let mut xobject = pdf.image_xobject(*id, &image.data);
            xobject.filter(Filter::FlateDecode);
            xobject.width(image.width as i32);
            xobject.height(image.height as i32);
            xobject.color_space().device_rgb();
            xobject.bits_per_component(8);
            xobject.finish();
        }

        let media_box = PdfRect::new(0.0, 0.0, self.geometry.width as f32, self.geometry.height as f32);
        let page_total = pages.len();
        for (i, buffer) in pages.into_iter().enumerate() {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(media_box)
                .parent(page_tree_id)
                .contents(content_ids[i]);
            {
                let mut resources = page.resources();
                {
                    let mut fonts = resources.fonts();
                    for ((_, name, _), id) in FONTS.iter().zip(&font_ids) {
                        fonts.pair(Name(*name), *id);
                    }
                    if let Some(id) = cjk_id {
                        fonts.pair(cjk::RESOURCE, id);
                    }
                }
                if !buffer.images.is_empty() {
                    let mut xobjects = resources.x_objects();
                    for index in &buffer.images {
                        let name = format!("Im{}", index + 1);
                        xobjects.pair(Name(name.as_bytes()), image_ids[*index]);
                    }
                }
            }
            page.finish();

            let raw = buffer.content.finish();
            let compressed = compress_to_vec_zlib(&raw, 6);
            pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
            debug!(page = i + 1, raw_bytes = raw.len(), "PDF page written");
        }

        let bytes = pdf.finish();
        info!(
            title = %self.title,
            pages = page_total,
            images = images.len(),
            cjk_font = self.uses_cjk,
            cjk_embedded = self.uses_cjk && self.cjk.is_embedded(),
            size_kb = bytes.len() / 1024,
            "PDF document written"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn writes_a_pdf_with_one_page_per_start() {
        let mut surface = PdfSurface::new(PageGeometry::a4(), "Test");
        surface.start_page();
        surface.draw_text(50.0, 56.0, "Estudo de Viabilidade", &TextStyle::bold(18.0));
        surface.start_page();
        surface.draw_rect(Rect::new(50.0, 100.0, 100.0, 20.0), Color::BRAND);
        surface.draw_image(
            Rect::new(50.0, 140.0, 200.0, 100.0),
            &RasterImage::new(RgbaImage::from_pixel(4, 2, Rgba([0, 128, 0, 255]))),
        );

        let bytes = Surface::finish(&mut surface).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 2"));
        assert!(text.contains("/Helvetica-Bold"));
        assert!(text.contains("/WinAnsiEncoding"));
        assert!(text.contains("/Im1"));
    }

    fn inflated_streams(bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut streams = Vec::new();
        let mut rest = bytes;
        while let Some(start) = find(rest, b"stream\n") {
            let body = &rest[start + 7..];
            let Some(end) = find(body, b"\nendstream") else { break };
            if let Ok(inflated) = miniz_oxide::inflate::decompress_to_vec_zlib(&body[..end]) {
                streams.push(inflated);
            }
            rest = &body[end + 10..];
        }
        streams
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn chinese_text_uses_the_composite_font() {
        let mut surface = PdfSurface::new(PageGeometry::a4(), "可行性研究");
        surface.start_page();
        surface.draw_text(50.0, 56.0, "1. 执行摘要", &TextStyle::bold(14.0));
        surface.draw_rotated_text(200.0, 400.0, 45.0, "机密", &TextStyle::body());

        let bytes = Surface::finish(&mut surface).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Type0"));
        assert!(text.contains("/F4"));

        let content = inflated_streams(&bytes)
            .into_iter()
            .find(|s| find(s, b"BT").is_some())
            .unwrap();
        assert!(find(&content, b"/F2 ").is_some());
        assert!(find(&content, b"/F4 ").is_some());
        assert!(find(&content, b"?").is_none());
        // 执 is U+6267, written either raw or as a hex string.
        assert!(find(&content, &[0x62, 0x67]).is_some() || find(&content, b"6267").is_some());
    }

    #[test]
    fn latin_only_documents_skip_the_composite_font() {
        let mut surface = PdfSurface::new(PageGeometry::a4(), "Latin");
        surface.start_page();
        surface.draw_text(50.0, 56.0, "Relatório técnico", &TextStyle::body());
        let bytes = Surface::finish(&mut surface).unwrap();
        assert!(!String::from_utf8_lossy(&bytes).contains("/Type0"));
    }

    #[test]
    fn empty_surface_still_yields_one_page() {
        let bytes = Surface::finish(&mut PdfSurface::new(PageGeometry::a4(), "Empty")).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/Count 1"));
    }

    #[test]
    fn output_is_deterministic() {
        let render = || {
            let mut surface = PdfSurface::new(PageGeometry::a4(), "Same");
            surface.start_page();
            surface.draw_text(50.0, 56.0, "Same", &TextStyle::body());
            Surface::finish(&mut surface).unwrap()
        };
        assert_eq!(render(), render());
    }
}
