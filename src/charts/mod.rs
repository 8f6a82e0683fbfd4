// document-synthesis-service/src/charts/mod.rs

//! Chart capture: turns client-side chart captures or plain series data into
//! raster images ready for embedding. Every capture of one document runs
//! concurrently and the whole batch is awaited before layout starts.

mod bars;

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use futures::future::join_all;
use image::imageops::FilterType;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DocumentError, Result};

pub use bars::BarPoint;

fn default_aspect_ratio() -> f64 {
    16.0 / 9.0
}

/// A chart as handed over by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartHandle {
    pub id: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f64,
    #[serde(default, deserialize_with = "null_as_missing")]
    pub source: ChartSource,
}

fn null_as_missing<'de, D>(deserializer: D) -> std::result::Result<ChartSource, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<ChartSource>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSource {
    /// `data:image/png;base64,...` exported from a canvas.
    DataUrl {
        #[serde(rename = "dataUrl")]
        data_url: String,
    },
    Bars { series: Vec<BarPoint> },
    #[default]
    Missing,
}

impl ChartHandle {
    pub fn bars(id: &str, caption: String, series: Vec<BarPoint>) -> Self {
        Self {
            id: id.to_string(),
            caption,
            aspect_ratio: default_aspect_ratio(),
            source: ChartSource::Bars { series },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(image::load_from_memory(bytes)?.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.pixels.height() == 0 {
            return 1.0;
        }
        f64::from(self.pixels.width()) / f64::from(self.pixels.height())
    }

    /// RGB samples composited over white, row-major.
    pub fn rgb_over_white(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.as_raw().len() / 4 * 3);
        for pixel in self.pixels.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = u16::from(a);
            for channel in [r, g, b] {
                let blended = (u16::from(channel) * alpha + 255 * (255 - alpha)) / 255;
                out.push(blended as u8);
            }
        }
        out
    }

    pub fn fit_width(self, max_width: u32) -> Self {
        if max_width == 0 || self.width() <= max_width {
            return self;
        }
        let height = ((f64::from(self.height()) * f64::from(max_width)) / f64::from(self.width()))
            .round()
            .max(1.0) as u32;
        debug!(
            from_width = self.width(),
            to_width = max_width,
            to_height = height,
            "Downscaling chart image"
        );
        Self::new(image::imageops::resize(&self.pixels, max_width, height, FilterType::Triangle))
    }
}

/// A resolved chart; `image` is `None` when capture failed.
#[derive(Debug, Clone)]
pub struct ChartAsset {
    pub id: String,
    pub caption: String,
    pub aspect_ratio: f64,
    pub image: Option<RasterImage>,
}

#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, handle: &ChartHandle) -> Result<RasterImage>;
}

pub struct DefaultChartRenderer {
    max_width_px: u32,
}

impl DefaultChartRenderer {
    pub fn new(max_width_px: u32) -> Self {
        Self { max_width_px }
    }
}

#[async_trait]
impl ChartRenderer for DefaultChartRenderer {
    async fn render(&self, handle: &ChartHandle) -> Result<RasterImage> {
        let image = match &handle.source {
            ChartSource::DataUrl { data_url } => decode_data_url(data_url)?,
            ChartSource::Bars { series } => {
                let width = self.max_width_px.clamp(320, 1600);
                bars::draw(series, width, handle.aspect_ratio)?
            }
            ChartSource::Missing => {
                return Err(DocumentError::ChartCaptureUnavailable(handle.id.clone()))
            }
        };
        Ok(image.fit_width(self.max_width_px))
    }
}

fn decode_data_url(data_url: &str) -> Result<RasterImage> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| DocumentError::InvalidData("chart data URL has no payload".to_string()))?;
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(DocumentError::InvalidData(format!(
            "unsupported chart data URL header: {header}"
        )));
    }
    let bytes = general_purpose::STANDARD.decode(payload.trim())?;
    RasterImage::decode(&bytes)
}

/// Generator defaults with caller-supplied handles replacing those of the
/// same id; handles with new ids are appended in request order.
pub fn merge_handles(defaults: Vec<ChartHandle>, overrides: &[ChartHandle]) -> Vec<ChartHandle> {
    let mut merged = defaults;
    for handle in overrides {
        match merged.iter_mut().find(|h| h.id == handle.id) {
            Some(existing) => {
                let caption = if handle.caption.is_empty() {
                    std::mem::take(&mut existing.caption)
                } else {
                    handle.caption.clone()
                };
                *existing = ChartHandle { caption, ..handle.clone() };
            }
            None => merged.push(handle.clone()),
        }
    }
    merged
}

/// Captures every handle concurrently, each bounded by `timeout`.
pub async fn capture_all(
    renderer: &dyn ChartRenderer,
    handles: &[ChartHandle],
    timeout: Duration,
) -> Vec<ChartAsset> {
    let captures = handles.iter().map(|handle| async move {
        let image = match tokio::time::timeout(timeout, renderer.render(handle)).await {
            Ok(Ok(image)) => Some(image),
            Ok(Err(e)) => {
                warn!(chart_id = %handle.id, error = %e, "Chart capture failed, using placeholder");
                None
            }
            Err(_) => {
                warn!(
                    chart_id = %handle.id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Chart capture timed out, using placeholder"
                );
                None
            }
        };
        ChartAsset {
            id: handle.id.clone(),
            caption: handle.caption.clone(),
            aspect_ratio: image
                .as_ref()
                .map(RasterImage::aspect_ratio)
                .unwrap_or(handle.aspect_ratio),
            image,
        }
    });

    let assets = join_all(captures).await;
    info!(
        requested = handles.len(),
        captured = assets.iter().filter(|a| a.image.is_some()).count(),
        "Chart capture finished"
    );
    assets
}
