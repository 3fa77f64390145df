// src/services/generation_client.rs
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;

use crate::errors::FluxError;
use crate::models::GenerationRequest;
use crate::services::ImageDescriptor;

/// The remote images endpoint.
#[async_trait]
pub trait ImageGenerationApi: Send + Sync {
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerationRequest,
    ) -> Result<Vec<ImageDescriptor>, FluxError>;
}

/// Downloads by-reference result images.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FluxError>;
}

pub struct GenerationClient {
    base_url: String,
    client: Client,
}

impl GenerationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/images/generations", self.base_url)
    }
}

#[async_trait]
impl ImageGenerationApi for GenerationClient {
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerationRequest,
    ) -> Result<Vec<ImageDescriptor>, FluxError> {
        info!(
            "Requesting {} image(s) from {} ({} steps)",
            request.n, request.model, request.steps
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| FluxError::Generation(format!("Image generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FluxError::Generation(format!(
                "Image generation error ({}): {}",
                status, error_text
            )));
        }

        let result: Value = response.json().await.map_err(|e| {
            FluxError::Generation(format!("Failed to parse generation response: {}", e))
        })?;

        parse_descriptors(&result)
    }
}

#[async_trait]
impl ImageFetcher for GenerationClient {
    async fn fetch(&self, url: &str) -> Result<Bytes, FluxError> {
        debug!("Fetching result image from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FluxError::ResultFetch(format!("{}: {}", url, e)))?;

        response
            .bytes()
            .await
            .map_err(|e| FluxError::ResultFetch(format!("{}: {}", url, e)))
    }
}

pub(crate) fn parse_descriptors(body: &Value) -> Result<Vec<ImageDescriptor>, FluxError> {
    let data = body["data"]
        .as_array()
        .ok_or_else(|| FluxError::Generation("No data array in generation response".to_string()))?;

    Ok(data.iter().map(ImageDescriptor::from_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mixed_data_array() {
        let body = json!({
            "created": 1700000000,
            "data": [
                {"url": "https://cdn.test/a.png"},
                {"b64_json": "iVBORw0KGgo="},
                {}
            ]
        });

        let descriptors = parse_descriptors(&body).unwrap();

        assert_eq!(descriptors.len(), 3);
        assert!(matches!(descriptors[0], ImageDescriptor::ByReference { .. }));
        assert!(matches!(descriptors[1], ImageDescriptor::ByValue { .. }));
        assert_eq!(descriptors[2], ImageDescriptor::Unrecognized);
    }

    #[test]
    fn missing_data_array_is_generation_error() {
        let body = json!({"error": {"message": "quota exceeded"}});
        assert!(matches!(
            parse_descriptors(&body),
            Err(FluxError::Generation(_))
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GenerationClient::new("https://api.navy/v1/");
        assert_eq!(client.endpoint(), "https://api.navy/v1/images/generations");
    }
}
