// src/services/parameter_resolver.rs
use crate::errors::FluxError;
use crate::models::{
    ModelSpec, RecommendedOption, ResolvedSteps, SpeedTier, StepConfig, StepHint, StepSelection,
};

/// Rough per-step cost used for the duration estimate. Not measured.
const SECONDS_PER_STEP: f64 = 0.5;

pub fn resolve_steps(spec: &ModelSpec, selection: StepSelection) -> Result<ResolvedSteps, FluxError> {
    let config = &spec.steps;

    let steps = match selection {
        StepSelection::Recommended { index } => {
            *config
                .recommended
                .get(index)
                .ok_or(FluxError::IndexOutOfRange {
                    index,
                    len: config.recommended.len(),
                })?
        }
        // Custom values behave like a bounded slider: clamp, never reject.
        StepSelection::Custom { steps } => {
            steps.clamp(i64::from(config.min), i64::from(config.max)) as u32
        }
    };

    Ok(ResolvedSteps {
        steps,
        tier: classify(config, steps),
    })
}

pub fn classify(config: &StepConfig, steps: u32) -> SpeedTier {
    let default = f64::from(config.default);
    let value = f64::from(steps);

    if value <= default / 2.0 {
        SpeedTier::UltraFast
    } else if value < default {
        SpeedTier::Fast
    } else if steps == config.default {
        SpeedTier::Balanced
    } else if value <= default * 1.5 {
        SpeedTier::HighQuality
    } else {
        SpeedTier::Ultimate
    }
}

pub fn estimated_seconds(steps: u32, n_images: u8) -> f64 {
    f64::from(steps) * SECONDS_PER_STEP * f64::from(n_images)
}

pub fn format_estimate(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("about {:.0} seconds", seconds)
    } else {
        format!("about {:.1} minutes", seconds / 60.0)
    }
}

pub fn recommended_options(spec: &ModelSpec) -> Vec<RecommendedOption> {
    let default = spec.steps.default;

    spec.steps
        .recommended
        .iter()
        .enumerate()
        .map(|(index, &steps)| RecommendedOption {
            index,
            steps,
            hint: if steps == default {
                StepHint::Default
            } else if steps < default {
                StepHint::Fast
            } else {
                StepHint::HighQuality
            },
        })
        .collect()
}
