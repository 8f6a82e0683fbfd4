// document-synthesis-service/src/renderers/recording.rs

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::charts::RasterImage;
use crate::error::Result;
use crate::layout::{Color, Font, PageGeometry, Rect, Surface, TextStyle};

/// One drawing call as it reached the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Text {
        x: f64,
        y: f64,
        text: String,
        font: Font,
        size: f64,
        color: Color,
    },
    RotatedText {
        x: f64,
        y: f64,
        angle: f64,
        text: String,
        font: Font,
        size: f64,
        color: Color,
    },
    Rect {
        rect: Rect,
        fill: Color,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        width: f64,
        color: Color,
    },
    Image {
        rect: Rect,
        width_px: u32,
        height_px: u32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedPage {
    pub ops: Vec<DrawOp>,
}

impl RecordedPage {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } | DrawOp::RotatedText { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// The `layout` output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub geometry: PageGeometry,
    pub pages: Vec<RecordedPage>,
}

/// Records drawing operations instead of rendering them. Used for previews and
/// for structural comparison of two generations.
pub struct RecordingSurface {
    geometry: PageGeometry,
    pages: Vec<RecordedPage>,
    current: usize,
}

impl RecordingSurface {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry, pages: Vec::new(), current: 0 }
    }

    pub fn pages(&self) -> &[RecordedPage] {
        &self.pages
    }

    pub fn page_has_text(&self, page: usize, needle: &str) -> bool {
        self.pages
            .get(page)
            .map(|p| p.texts().any(|t| t.contains(needle)))
            .unwrap_or(false)
    }

    fn push(&mut self, op: DrawOp) {
        if self.pages.is_empty() {
            self.start_page();
        }
        self.pages[self.current].ops.push(op);
    }
}

impl Surface for RecordingSurface {
    fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    fn start_page(&mut self) {
        self.pages.push(RecordedPage::default());
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
        self.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            font: style.font,
            size: style.size,
            color: style.color,
        });
    }

    fn draw_rotated_text(&mut self, x: f64, y: f64, angle_deg: f64, text: &str, style: &TextStyle) {
        self.push(DrawOp::RotatedText {
            x,
            y,
            angle: angle_deg,
            text: text.to_string(),
            font: style.font,
            size: style.size,
            color: style.color,
        });
    }

    fn draw_rect(&mut self, rect: Rect, fill: Color) {
        self.push(DrawOp::Rect { rect, fill });
    }

    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color) {
        self.push(DrawOp::Line { from, to, width, color });
    }

    fn draw_image(&mut self, rect: Rect, image: &RasterImage) {
        self.push(DrawOp::Image {
            rect,
            width_px: image.width(),
            height_px: image.height(),
        });
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        let document = LayoutDocument {
            geometry: self.geometry,
            pages: self.pages.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;
        info!(pages = self.pages.len(), size_kb = bytes.len() / 1024, "Layout document recorded");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_layout_parses_back() {
        let mut surface = RecordingSurface::new(PageGeometry::a4());
        surface.start_page();
        surface.draw_text(50.0, 60.0, "Executive Summary", &TextStyle::bold(14.0));
        surface.start_page();
        surface.draw_rect(Rect::new(50.0, 100.0, 200.0, 20.0), Color::STRIPE);
        surface.select_page(0);
        surface.draw_line((50.0, 800.0), (545.0, 800.0), 0.5, Color::RULE);

        let bytes = surface.finish().unwrap();
        let layout: LayoutDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(layout.pages.len(), 2);
        assert_eq!(layout.pages[0].ops.len(), 2);
        assert!(layout.pages[0].texts().any(|t| t == "Executive Summary"));
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut surface = RecordingSurface::new(PageGeometry::a4());
        surface.start_page();
        surface.select_page(7);
        surface.draw_text(0.0, 0.0, "x", &TextStyle::body());
        assert_eq!(surface.pages()[0].ops.len(), 1);
    }
}
