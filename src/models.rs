// src/models.rs
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FluxError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub default: u32,
    pub min: u32,
    pub max: u32,
    /// Strictly ascending, every value inside `[min, max]`.
    pub recommended: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    /// First entry is the default style.
    pub styles: Vec<String>,
    /// First entry is the default quality.
    pub qualities: Vec<String>,
    pub steps: StepConfig,
}

impl ModelSpec {
    pub fn default_style(&self) -> &str {
        &self.styles[0]
    }

    pub fn default_quality(&self) -> &str {
        &self.qualities[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    TextToImage,
    ImageToImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1024x1792")]
    Portrait,
    #[serde(rename = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1536")]
    PortraitClassic,
    #[serde(rename = "1536x1024")]
    LandscapeClassic,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Portrait => "1024x1792",
            ImageSize::Landscape => "1792x1024",
            ImageSize::PortraitClassic => "1024x1536",
            ImageSize::LandscapeClassic => "1536x1024",
        }
    }
}

/// How the user picked the step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StepSelection {
    Recommended { index: usize },
    Custom { steps: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    UltraFast,
    Fast,
    Balanced,
    HighQuality,
    Ultimate,
}

/// Label attached to a recommended step value relative to the model default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepHint {
    Fast,
    Default,
    HighQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedOption {
    pub index: usize,
    pub steps: u32,
    pub hint: StepHint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSteps {
    pub steps: u32,
    pub tier: SpeedTier,
}

/// Where an image-to-image source comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum SourceImage {
    /// The reference image most recently uploaded to the session.
    Upload,
    /// A history entry, by its 1-based display ordinal.
    History { ordinal: usize },
}

fn default_image_count() -> u8 {
    1
}

fn default_guidance_scale() -> f32 {
    7.5
}

fn default_seed() -> i64 {
    -1
}

fn default_strength() -> f32 {
    0.7
}

fn default_selection() -> StepSelection {
    StepSelection::Recommended { index: 0 }
}

/// Everything the user submits for one generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationInput {
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    pub mode: GenerationMode,
    #[serde(default = "default_selection")]
    pub step_selection: StepSelection,
    #[serde(default = "default_image_count")]
    pub n: u8,
    #[serde(default)]
    pub size: ImageSize,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default)]
    pub source: Option<SourceImage>,
    #[serde(default = "default_strength")]
    pub strength: f32,
}

/// Body sent to the generation API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub n: u8,
    pub size: ImageSize,
    pub quality: String,
    pub style: String,
    pub steps: u32,
    pub guidance_scale: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Base64 PNG of the source image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

impl GenerationRequest {
    pub fn mode(&self) -> GenerationMode {
        if self.image.is_some() {
            GenerationMode::ImageToImage
        } else {
            GenerationMode::TextToImage
        }
    }
}

/// Parameters recorded alongside each history image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub style: String,
    pub quality: String,
    pub size: ImageSize,
    pub steps: u32,
    pub guidance_scale: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

impl From<&GenerationRequest> for GenerationParams {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            negative_prompt: request.negative_prompt.clone(),
            style: request.style.clone(),
            quality: request.quality.clone(),
            size: request.size,
            steps: request.steps,
            guidance_scale: request.guidance_scale,
            seed: request.seed,
            strength: request.strength,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub created_at: DateTime<Local>,
    pub params: GenerationParams,
    pub mode: GenerationMode,
    /// Base64-encoded PNG.
    pub image_data: String,
}

impl HistoryRecord {
    pub fn new(
        params: GenerationParams,
        mode: GenerationMode,
        png: &[u8],
        created_at: DateTime<Local>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            params,
            mode,
            image_data: general_purpose::STANDARD.encode(png),
        }
    }

    pub fn timestamp(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn image_bytes(&self) -> Result<Vec<u8>, FluxError> {
        general_purpose::STANDARD
            .decode(&self.image_data)
            .map_err(|e| FluxError::Serialization(format!("Corrupt history image: {}", e)))
    }
}

/// Images of the most recent successful generation, kept for batch export.
#[derive(Debug, Clone)]
pub struct GeneratedBatch {
    pub steps: u32,
    pub created_at: DateTime<Local>,
    pub images: Vec<Vec<u8>>,
}
