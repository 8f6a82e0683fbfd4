// document-synthesis-service/src/config.rs

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::layout::PageGeometry;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub layout: LayoutConfig,
    pub localization: LocalizationConfig,
    pub charts: ChartConfig,
    pub branding: BrandingConfig,
    pub qr: QrConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub log_level: String,
}

/// Page size and margins, in PDF points.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    pub page_width: f64,
    pub page_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    /// TrueType file embedded for CJK text; the predefined STSong-Light font when unset.
    pub cjk_font_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalizationConfig {
    pub default_language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    pub capture_timeout_secs: u64,
    pub max_width_px: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandingConfig {
    pub company_name: String,
    pub website: String,
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QrConfig {
    /// Handlebars template; `{{url}}` receives the percent-encoded target.
    pub service_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            // Load from config file if it exists
            .add_source(File::with_name("config").required(false))
            // Override with environment variables (e.g., SERVICE__LAYOUT__MARGIN_TOP)
            .add_source(Environment::with_prefix("SERVICE").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Defaults only, no file or environment sources.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        ConfigLoader::builder()
            .set_default("service.name", "document-synthesis-service")?
            .set_default("service.log_level", "info")?
            // A4
            .set_default("layout.page_width", 595.28)?
            .set_default("layout.page_height", 841.89)?
            .set_default("layout.margin_top", 56.0)?
            .set_default("layout.margin_bottom", 56.0)?
            .set_default("layout.margin_left", 50.0)?
            .set_default("layout.margin_right", 50.0)?
            .set_default("localization.default_language", "en")?
            .set_default("charts.capture_timeout_secs", 10)?
            .set_default("charts.max_width_px", 1200)?
            .set_default("branding.company_name", "Industrial Recycling Group")?
            .set_default("branding.website", "www.industrialrecycling.example")?
            .set_default(
                "qr.service_url",
                "https://api.qrserver.com/v1/create-qr-code/?size=240x240&data={{url}}",
            )?
            .set_default("output.dir", "./output")
    }

    pub fn page_geometry(&self) -> PageGeometry {
        PageGeometry {
            width: self.layout.page_width,
            height: self.layout.page_height,
            margin_top: self.layout.margin_top,
            margin_bottom: self.layout.margin_bottom,
            margin_left: self.layout.margin_left,
            margin_right: self.layout.margin_right,
        }
    }
}
