// document-synthesis-service/src/assets.rs

//! Logo and QR code loading. Both are optional decorations: every failure is
//! logged and the document is laid out without the image.

use std::time::Duration;

use async_trait::async_trait;
use handlebars::Handlebars;
use serde_json::json;
use tracing::{debug, warn};

use crate::charts::RasterImage;
use crate::error::{DocumentError, Result};

#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Fetches raw bytes from an `http(s)://` URL or a local path.
    async fn load(&self, location: &str) -> Result<Vec<u8>>;
}

pub struct HttpAssetLoader {
    client: reqwest::Client,
}

impl HttpAssetLoader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn load(&self, location: &str) -> Result<Vec<u8>> {
        if location.starts_with("http://") || location.starts_with("https://") {
            debug!(url = %location, "Fetching remote asset");
            let response = self.client.get(location).send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        } else {
            Ok(tokio::fs::read(location).await?)
        }
    }
}

/// Images a document may carry besides its charts.
#[derive(Debug, Clone, Default)]
pub struct DocumentAssets {
    pub logo: Option<RasterImage>,
    pub qr: Option<RasterImage>,
}

/// Fills the QR service template with the percent-encoded target URL.
pub fn qr_image_url(template: &str, target: &str) -> Result<String> {
    if target.trim().is_empty() {
        return Err(DocumentError::MissingField("options.qrTargetUrl".to_string()));
    }
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    let encoded = urlencoding::encode(target.trim());
    Ok(handlebars.render_template(template, &json!({ "url": encoded }))?)
}

/// Loads and decodes an image, or `None` with a warning.
pub async fn load_image(loader: &dyn AssetLoader, location: &str, purpose: &str) -> Option<RasterImage> {
    let decoded = match loader.load(location).await {
        Ok(bytes) => RasterImage::decode(&bytes),
        Err(e) => Err(e),
    };
    match decoded {
        Ok(image) => Some(image),
        Err(e) => {
            warn!(asset = %purpose, location = %location, error = %e, "Image unavailable, continuing without it");
            None
        }
    }
}

/// Loads the optional logo and QR image concurrently.
pub async fn load_document_assets(
    loader: &dyn AssetLoader,
    logo_path: Option<&str>,
    qr_url: Option<&str>,
) -> DocumentAssets {
    let logo = async {
        match logo_path {
            Some(path) => load_image(loader, path, "logo").await,
            None => None,
        }
    };
    let qr = async {
        match qr_url {
            Some(url) => load_image(loader, url, "qr_code").await,
            None => None,
        }
    };
    let (logo, qr) = futures::join!(logo, qr);
    DocumentAssets { logo, qr }
}
