// src/services/response_normalizer.rs
use base64::{Engine as _, engine::general_purpose};
use log::{debug, warn};
use serde_json::Value;

use crate::errors::FluxError;
use crate::services::{ImageFetcher, ImageProcessor};

/// One entry of the API's `data` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDescriptor {
    ByReference { url: String },
    ByValue { b64_json: String },
    /// Neither shape; dropped without error.
    Unrecognized,
}

impl ImageDescriptor {
    pub fn from_value(value: &Value) -> Self {
        if let Some(url) = value.get("url").and_then(Value::as_str) {
            return ImageDescriptor::ByReference {
                url: url.to_string(),
            };
        }
        if let Some(b64_json) = value.get("b64_json").and_then(Value::as_str) {
            return ImageDescriptor::ByValue {
                b64_json: b64_json.to_string(),
            };
        }
        ImageDescriptor::Unrecognized
    }
}

#[derive(Debug, Default)]
pub struct NormalizedImages {
    /// PNG bytes, in the order the API returned them.
    pub images: Vec<Vec<u8>>,
    pub failures: Vec<FluxError>,
    pub dropped: usize,
}

pub struct ResponseNormalizer<'a> {
    fetcher: &'a dyn ImageFetcher,
    processor: &'a ImageProcessor,
}

impl<'a> ResponseNormalizer<'a> {
    pub fn new(fetcher: &'a dyn ImageFetcher, processor: &'a ImageProcessor) -> Self {
        Self { fetcher, processor }
    }

    /// Resolves every descriptor independently; one bad image never fails the batch.
    pub async fn normalize(&self, descriptors: Vec<ImageDescriptor>) -> NormalizedImages {
        let mut out = NormalizedImages::default();

        for (position, descriptor) in descriptors.into_iter().enumerate() {
            let resolved = match descriptor {
                ImageDescriptor::ByReference { url } => self.resolve_reference(&url).await,
                ImageDescriptor::ByValue { b64_json } => self.resolve_inline(&b64_json),
                ImageDescriptor::Unrecognized => {
                    debug!("Dropping unrecognized result descriptor at position {}", position);
                    out.dropped += 1;
                    continue;
                }
            };

            match resolved {
                Ok(png) => out.images.push(png),
                Err(e) => {
                    warn!("Result image {} skipped: {}", position + 1, e);
                    out.failures.push(e);
                }
            }
        }

        out
    }

    async fn resolve_reference(&self, url: &str) -> Result<Vec<u8>, FluxError> {
        let bytes = self.fetcher.fetch(url).await?;
        self.decode(&bytes)
    }

    fn resolve_inline(&self, b64_json: &str) -> Result<Vec<u8>, FluxError> {
        let bytes = general_purpose::STANDARD
            .decode(b64_json)
            .map_err(|e| FluxError::ResultDecode(format!("invalid base64: {}", e)))?;
        self.decode(&bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, FluxError> {
        self.processor
            .to_png(bytes)
            .map_err(|e| FluxError::ResultDecode(e.to_string()))
    }
}
