// document-synthesis-service/src/layout/pagination.rs

//! Page-break control.
//!
//! The controller owns the only [`PageCursor`] of a document. Every block asks
//! it for room before drawing; when a block does not fit, the controller closes
//! the page (footer rule), opens the next one and draws the running header.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Color, Font, PageGeometry, Surface, TextStyle};

const HEADER_OFFSET: f64 = 30.0;
const HEADER_RULE_OFFSET: f64 = 14.0;
const FOOTER_RULE_OFFSET: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageCursor {
    /// Zero-based page index.
    pub page: usize,
    pub y: f64,
    pub top: f64,
    pub bottom: f64,
}

impl PageCursor {
    pub fn remaining(&self) -> f64 {
        self.bottom - self.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Flowing,
    NewPage,
}

/// One granted reservation, kept so the content-bottom invariant can be checked
/// after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub page: usize,
    pub y: f64,
    pub height: f64,
}

/// Running header text drawn on every page after the first.
#[derive(Debug, Clone, Default)]
pub struct PageChrome {
    pub header: String,
}

pub struct PaginationController {
    geometry: PageGeometry,
    chrome: PageChrome,
    cursor: PageCursor,
    state: PaginationState,
    placements: Vec<Placement>,
}

impl PaginationController {
    pub fn new(geometry: PageGeometry, chrome: PageChrome) -> Self {
        Self {
            cursor: PageCursor {
                page: 0,
                y: geometry.content_top(),
                top: geometry.content_top(),
                bottom: geometry.content_bottom(),
            },
            geometry,
            chrome,
            state: PaginationState::Flowing,
            placements: Vec::new(),
        }
    }

    /// Opens the first page. The first page never carries the running header.
    pub fn begin(&mut self, surface: &mut dyn Surface) {
        surface.start_page();
        self.cursor.page = surface.page_count().saturating_sub(1);
        self.cursor.y = self.cursor.top;
        self.state = PaginationState::Flowing;
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Grants `height` points at the current position, breaking the page first
    /// when the block would cross the content bottom. Returns the block's top.
    pub fn reserve(&mut self, surface: &mut dyn Surface, height: f64) -> f64 {
        self.reserve_keep_with(surface, height, 0.0)
    }

    /// Like [`reserve`](Self::reserve), but only keeps the page if `height`
    /// plus the following `keep_with_next` points fit. Advances by `height`.
    pub fn reserve_keep_with(
        &mut self,
        surface: &mut dyn Surface,
        height: f64,
        keep_with_next: f64,
    ) -> f64 {
        let height = height.max(0.0);
        if height > self.geometry.content_height() {
            warn!(
                height = height,
                content_height = self.geometry.content_height(),
                "Block taller than the content area"
            );
        }

        let needed = (height + keep_with_next.max(0.0)).min(self.geometry.content_height());
        let at_page_top = (self.cursor.y - self.cursor.top).abs() < f64::EPSILON;
        if self.cursor.y + needed > self.cursor.bottom && !at_page_top {
            self.state = PaginationState::NewPage;
            self.break_page(surface);
        }

        let y = self.cursor.y;
        self.placements.push(Placement { page: self.cursor.page, y, height });
        self.cursor.y += height;
        y
    }

    /// Forces a page break unless the current page is still empty.
    pub fn new_page(&mut self, surface: &mut dyn Surface) {
        if (self.cursor.y - self.cursor.top).abs() < f64::EPSILON {
            return;
        }
        self.state = PaginationState::NewPage;
        self.break_page(surface);
    }

    /// Vertical whitespace; never breaks the page by itself.
    pub fn advance(&mut self, height: f64) {
        if (self.cursor.y - self.cursor.top).abs() < f64::EPSILON {
            return;
        }
        self.cursor.y = (self.cursor.y + height).min(self.cursor.bottom);
    }

    /// Closes the last page.
    pub fn finish(&mut self, surface: &mut dyn Surface) {
        self.draw_footer(surface);
    }

    fn break_page(&mut self, surface: &mut dyn Surface) {
        debug!(page = self.cursor.page, y = self.cursor.y, "Page break");
        self.draw_footer(surface);
        surface.start_page();
        self.cursor.page = surface.page_count().saturating_sub(1);
        self.cursor.y = self.cursor.top;
        self.draw_header(surface);
        self.state = PaginationState::Flowing;
    }

    fn draw_header(&self, surface: &mut dyn Surface) {
        if self.chrome.header.is_empty() {
            return;
        }
        let style = TextStyle::new(Font::Regular, 8.0, Color::MUTED);
        let left = self.geometry.content_left();
        let right = left + self.geometry.content_width();
        let text = super::text::fit_text(&self.chrome.header, &style, self.geometry.content_width());
        surface.draw_text(left, self.geometry.margin_top - HEADER_OFFSET, &text, &style);
        let rule_y = self.geometry.margin_top - HEADER_RULE_OFFSET;
        surface.draw_line((left, rule_y), (right, rule_y), 0.5, Color::RULE);
    }

    fn draw_footer(&self, surface: &mut dyn Surface) {
        let left = self.geometry.content_left();
        let right = left + self.geometry.content_width();
        let rule_y = self.geometry.content_bottom() + FOOTER_RULE_OFFSET;
        surface.draw_line((left, rule_y), (right, rule_y), 0.5, Color::RULE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderers::RecordingSurface;

    fn controller() -> (PaginationController, RecordingSurface) {
        let geometry = PageGeometry::a4();
        let chrome = PageChrome { header: "Feasibility Study".to_string() };
        (PaginationController::new(geometry, chrome), RecordingSurface::new(geometry))
    }

    #[test]
    fn blocks_never_cross_the_content_bottom() {
        let (mut pager, mut surface) = controller();
        pager.begin(&mut surface);
        for i in 0..200 {
            pager.reserve(&mut surface, 7.0 + (i % 13) as f64 * 3.0);
        }
        pager.finish(&mut surface);

        let bottom = PageGeometry::a4().content_bottom();
        assert!(surface.page_count() > 1);
        for placement in pager.placements() {
            assert!(placement.y + placement.height <= bottom + 1e-9, "{placement:?}");
        }
    }

    #[test]
    fn break_draws_footer_then_header_on_the_new_page() {
        let (mut pager, mut surface) = controller();
        pager.begin(&mut surface);
        let first = pager.reserve(&mut surface, 700.0);
        assert_eq!(first, 56.0);
        let second = pager.reserve(&mut surface, 100.0);
        assert_eq!(second, 56.0);
        assert_eq!(pager.cursor().page, 1);
        assert_eq!(pager.state(), PaginationState::Flowing);

        assert!(!surface.page_has_text(0, "Feasibility Study"));
        assert!(surface.page_has_text(1, "Feasibility Study"));
    }

    #[test]
    fn keep_with_next_moves_the_header_along() {
        let (mut pager, mut surface) = controller();
        pager.begin(&mut surface);
        pager.reserve(&mut surface, 690.0);
        // 20pt header fits, but header plus one 14pt line does not.
        let y = pager.reserve_keep_with(&mut surface, 20.0, 30.0);
        assert_eq!(pager.cursor().page, 1);
        assert_eq!(y, 56.0);
        assert_eq!(pager.cursor().y, 76.0);
    }

    #[test]
    fn empty_page_is_not_broken_again() {
        let (mut pager, mut surface) = controller();
        pager.begin(&mut surface);
        pager.new_page(&mut surface);
        assert_eq!(surface.page_count(), 1);

        let full = pager.geometry().content_height();
        pager.reserve(&mut surface, full);
        assert_eq!(surface.page_count(), 1);
        let placement = pager.placements()[0];
        assert!(placement.y + placement.height <= pager.geometry().content_bottom() + 1e-9);
    }

    // The controller cannot split a block. One taller than the content area
    // is placed at the top of a fresh page and overruns it; the assembler
    // wraps or caps every block so this never happens in a document.
    #[test]
    fn oversized_block_is_placed_at_the_page_top() {
        let (mut pager, mut surface) = controller();
        pager.begin(&mut surface);
        pager.reserve(&mut surface, 20.0);
        let y = pager.reserve(&mut surface, 10_000.0);
        assert_eq!(surface.page_count(), 2);
        assert_eq!(y, pager.geometry().content_top());
        assert!(y + 10_000.0 > pager.geometry().content_bottom());
    }

    #[test]
    fn spacing_is_clamped_to_the_page() {
        let (mut pager, mut surface) = controller();
        pager.begin(&mut surface);
        pager.advance(50.0);
        assert_eq!(pager.cursor().y, 56.0);
        pager.reserve(&mut surface, 10.0);
        pager.advance(5_000.0);
        assert_eq!(pager.cursor().remaining(), 0.0);
    }
}
