// document-synthesis-service/src/renderers/mod.rs

mod cjk;
mod pdf;
mod recording;

pub use cjk::CjkFont;
pub use pdf::PdfSurface;
pub use recording::{DrawOp, LayoutDocument, RecordedPage, RecordingSurface};

use crate::layout::{PageGeometry, Surface};
use crate::models::DocumentFormat;

pub fn create_surface(
    format: DocumentFormat,
    geometry: PageGeometry,
    title: &str,
    cjk_font: &CjkFont,
) -> Box<dyn Surface> {
    match format {
        DocumentFormat::Pdf => Box::new(PdfSurface::with_cjk_font(geometry, title, cjk_font.clone())),
        DocumentFormat::Layout => Box::new(RecordingSurface::new(geometry)),
    }
}
