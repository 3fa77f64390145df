// src/services/request_builder.rs
use base64::{Engine as _, engine::general_purpose};

use crate::errors::FluxError;
use crate::models::{GenerationInput, GenerationMode, GenerationRequest, ModelSpec, ResolvedSteps};
use crate::services::ImageProcessor;

pub const MAX_IMAGES: u8 = 5;
pub const GUIDANCE_RANGE: (f32, f32) = (1.0, 20.0);
pub const SEED_UNSET: i64 = -1;
pub const SEED_MAX: i64 = i32::MAX as i64;

fn ensure_submittable(api_key: Option<&str>, prompt: &str) -> Result<(), FluxError> {
    if api_key.map_or(true, |key| key.trim().is_empty()) {
        return Err(FluxError::MissingCredential);
    }
    if prompt.trim().is_empty() {
        return Err(FluxError::EmptyPrompt);
    }
    Ok(())
}

pub struct RequestBuilder<'a> {
    processor: &'a ImageProcessor,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(processor: &'a ImageProcessor) -> Self {
        Self { processor }
    }

    /// Assembles the API body. `source` is the raw reference image for
    /// image-to-image mode, from an upload or a history entry.
    pub fn build(
        &self,
        input: &GenerationInput,
        spec: &ModelSpec,
        resolved: &ResolvedSteps,
        api_key: Option<&str>,
        source: Option<&[u8]>,
    ) -> Result<GenerationRequest, FluxError> {
        ensure_submittable(api_key, &input.prompt)?;

        if input.mode == GenerationMode::ImageToImage && source.is_none() {
            return Err(FluxError::MissingSourceImage);
        }

        if input.n == 0 || input.n > MAX_IMAGES {
            return Err(FluxError::InvalidParameter(format!(
                "image count must be between 1 and {}, got {}",
                MAX_IMAGES, input.n
            )));
        }

        let (min_guidance, max_guidance) = GUIDANCE_RANGE;
        if !(min_guidance..=max_guidance).contains(&input.guidance_scale) {
            return Err(FluxError::InvalidParameter(format!(
                "guidance scale must be between {} and {}, got {}",
                min_guidance, max_guidance, input.guidance_scale
            )));
        }

        if input.seed != SEED_UNSET && !(0..=SEED_MAX).contains(&input.seed) {
            return Err(FluxError::InvalidParameter(format!(
                "seed must be -1 or between 0 and {}, got {}",
                SEED_MAX, input.seed
            )));
        }

        let style = pick_tag(
            &spec.styles,
            input.style.as_deref().unwrap_or(spec.default_style()),
            "style",
            &spec.id,
        )?;
        let quality = pick_tag(
            &spec.qualities,
            input.quality.as_deref().unwrap_or(spec.default_quality()),
            "quality",
            &spec.id,
        )?;

        let (image, strength) = match (input.mode, source) {
            (GenerationMode::ImageToImage, Some(raw)) => {
                if !(input.strength > 0.0 && input.strength <= 1.0) {
                    return Err(FluxError::InvalidParameter(format!(
                        "strength must be in (0, 1], got {}",
                        input.strength
                    )));
                }
                let png = self.processor.to_png(raw)?;
                (
                    Some(general_purpose::STANDARD.encode(png)),
                    Some(input.strength),
                )
            }
            _ => (None, None),
        };

        let negative_prompt = input
            .negative_prompt
            .as_ref()
            .filter(|text| !text.is_empty())
            .cloned();

        Ok(GenerationRequest {
            model: spec.id.clone(),
            prompt: input.prompt.clone(),
            negative_prompt,
            n: input.n,
            size: input.size,
            quality,
            style,
            steps: resolved.steps,
            guidance_scale: input.guidance_scale,
            seed: (input.seed != SEED_UNSET).then_some(input.seed),
            image,
            strength,
        })
    }
}

fn pick_tag(allowed: &[String], tag: &str, kind: &str, model_id: &str) -> Result<String, FluxError> {
    if allowed.iter().any(|a| a == tag) {
        Ok(tag.to_string())
    } else {
        Err(FluxError::InvalidParameter(format!(
            "{} '{}' is not offered by {}",
            kind, tag, model_id
        )))
    }
}
