// document-synthesis-service/src/charts/bars.rs

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::RasterImage;
use crate::error::{DocumentError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarPoint {
    pub label: String,
    pub value: f64,
}

impl BarPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self { label: label.into(), value }
    }
}

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GRID: Rgba<u8> = Rgba([225, 228, 232, 255]);
const AXIS: Rgba<u8> = Rgba([90, 96, 104, 255]);
const NEGATIVE: Rgba<u8> = Rgba([196, 64, 52, 255]);
const PALETTE: [Rgba<u8>; 4] = [
    Rgba([30, 110, 80, 255]),
    Rgba([46, 134, 193, 255]),
    Rgba([120, 144, 156, 255]),
    Rgba([224, 160, 40, 255]),
];

/// Plain bar chart with a zero baseline; labels are left to the caption.
pub(super) fn draw(series: &[BarPoint], width: u32, aspect_ratio: f64) -> Result<RasterImage> {
    if series.is_empty() || series.iter().any(|p| !p.value.is_finite()) {
        return Err(DocumentError::ChartCaptureUnavailable(
            "bar series is empty or not finite".to_string(),
        ));
    }
    let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.2 { aspect_ratio } else { 16.0 / 9.0 };
    let height = ((f64::from(width) / aspect).round() as u32).max(80);

    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);
    let pad = (width / 20).max(8);
    let plot_left = pad;
    let plot_right = width - pad;
    let plot_top = pad;
    let plot_bottom = height - pad;
    let plot_height = f64::from(plot_bottom - plot_top);

    let max = series.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    let min = series.iter().map(|p| p.value).fold(0.0_f64, f64::min);
    let span = if (max - min).abs() < f64::EPSILON { 1.0 } else { max - min };
    let to_y = |value: f64| -> u32 {
        let offset = (max - value) / span * plot_height;
        plot_top + offset.round().clamp(0.0, plot_height) as u32
    };

    for step in 0..=4 {
        let y = plot_top + (plot_height * f64::from(step) / 4.0).round() as u32;
        fill(&mut img, plot_left, y, plot_right, y + 1, GRID);
    }

    let slot = f64::from(plot_right - plot_left) / series.len() as f64;
    let bar_width = (slot * 0.6).max(1.0);
    let baseline = to_y(0.0);
    let multi_color = series.iter().all(|p| p.value >= 0.0);

    for (i, point) in series.iter().enumerate() {
        let x0 = plot_left + (slot * i as f64 + (slot - bar_width) / 2.0).round() as u32;
        let x1 = x0 + bar_width.round() as u32;
        let y = to_y(point.value);
        let color = if point.value < 0.0 {
            NEGATIVE
        } else if multi_color {
            PALETTE[i % PALETTE.len()]
        } else {
            PALETTE[0]
        };
        fill(&mut img, x0, y.min(baseline), x1, y.max(baseline) + 1, color);
    }

    fill(&mut img, plot_left, baseline, plot_right, baseline + 2, AXIS);
    fill(&mut img, plot_left, plot_top, plot_left + 2, plot_bottom, AXIS);

    Ok(RasterImage::new(img))
}

fn fill(img: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    let x1 = x1.min(img.width());
    let y1 = y1.min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}
