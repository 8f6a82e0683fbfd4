// document-synthesis-service/src/layout/mod.rs

//! Page geometry, drawing primitives and the surface abstraction shared by the
//! PDF writer and the layout recorder.
//!
//! Coordinates are points with the origin at the top-left corner of the page
//! and `y` growing downwards.

pub mod pagination;
pub mod text;

use serde::{Deserialize, Serialize};

use crate::charts::RasterImage;
use crate::error::Result;

pub use pagination::{PageChrome, PageCursor, PaginationController, PaginationState, Placement};
pub use text::{line_height, text_width, wrap_text};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin_top: 56.0,
            margin_bottom: 56.0,
            margin_left: 50.0,
            margin_right: 50.0,
        }
    }

    pub fn content_top(&self) -> f64 {
        self.margin_top
    }

    pub fn content_bottom(&self) -> f64 {
        self.height - self.margin_bottom
    }

    pub fn content_left(&self) -> f64 {
        self.margin_left
    }

    pub fn content_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn content_height(&self) -> f64 {
        self.content_bottom() - self.content_top()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const BLACK: Color = Color(0, 0, 0);
    pub const TEXT: Color = Color(33, 37, 41);
    pub const MUTED: Color = Color(108, 117, 125);
    pub const BRAND: Color = Color(30, 110, 80);
    pub const RULE: Color = Color(206, 212, 218);
    pub const TABLE_HEADER: Color = Color(232, 242, 236);
    pub const STRIPE: Color = Color(247, 248, 249);
    pub const PLACEHOLDER: Color = Color(241, 243, 245);
    pub const WATERMARK: Color = Color(220, 220, 220);

    pub fn unit(&self) -> (f32, f32, f32) {
        (
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Font {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: Font,
    pub size: f64,
    pub color: Color,
}

impl TextStyle {
    pub const fn new(font: Font, size: f64, color: Color) -> Self {
        Self { font, size, color }
    }

    pub const fn body() -> Self {
        Self::new(Font::Regular, 10.0, Color::TEXT)
    }

    pub const fn bold(size: f64) -> Self {
        Self::new(Font::Bold, size, Color::TEXT)
    }

    pub const fn small() -> Self {
        Self::new(Font::Regular, 8.0, Color::MUTED)
    }

    pub fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }
}

/// A paged drawing target.
///
/// `draw_*` calls land on the current page. `select_page` moves the current
/// page backwards for the final stamping pass over a finished document.
pub trait Surface: Send {
    fn geometry(&self) -> &PageGeometry;

    fn start_page(&mut self);

    fn page_count(&self) -> usize;

    fn select_page(&mut self, index: usize);

    /// `y` is the top of the line box.
    fn draw_text(&mut self, x: f64, y: f64, text: &str, style: &TextStyle);

    /// Text rotated counter-clockwise by `angle_deg` around its baseline start.
    fn draw_rotated_text(&mut self, x: f64, y: f64, angle_deg: f64, text: &str, style: &TextStyle);

    fn draw_rect(&mut self, rect: Rect, fill: Color);

    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color);

    fn draw_image(&mut self, rect: Rect, image: &RasterImage);

    /// Serializes the document. Further drawing after this is unspecified.
    fn finish(&mut self) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_content_area_sits_inside_margins() {
        let page = PageGeometry::a4();
        assert!((page.content_height() - (841.89 - 112.0)).abs() < 1e-9);
        assert!((page.content_width() - (595.28 - 100.0)).abs() < 1e-9);
        assert_eq!(page.content_left(), 50.0);
    }

    #[test]
    fn color_channels_scale_to_unit_range() {
        let (r, g, b) = Color(255, 0, 51).unit();
        assert_eq!((r, g, b), (1.0, 0.0, 0.2));
    }
}
