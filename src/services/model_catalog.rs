// src/services/model_catalog.rs
use crate::errors::FluxError;
use crate::models::{ModelSpec, StepConfig};

const SHARED_STYLES: [&str; 5] = ["anime", "monochrome", "watercolor", "sketch", "oil_painting"];

/// Registry of the models the generation API serves, in display order.
pub struct ModelCatalog {
    models: Vec<ModelSpec>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// The FLUX models exposed by the generation endpoint.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();

        catalog.register(spec(
            "flux.1-schnell",
            &["vivid", "natural", "fantasy"],
            &["standard", "hd"],
            (4, 1, 8),
            &[1, 2, 4, 8],
        ));
        catalog.register(spec(
            "flux.1.1-por",
            &["cinematic", "photographic"],
            &["standard", "hd", "ultra_hd"],
            (20, 10, 50),
            &[10, 15, 20, 25, 30],
        ));
        catalog.register(spec(
            "flux.latest",
            &["modern", "retro"],
            &["standard", "hd", "ultra_hd"],
            (20, 10, 50),
            &[15, 20, 25, 30, 40],
        ));
        catalog.register(spec(
            "flux.1-krea-dev",
            &["style1", "style2", "style3"],
            &["standard", "hd"],
            (25, 10, 50),
            &[15, 20, 25, 30],
        ));
        catalog.register(spec(
            "flux.1-kontext-pro",
            &["styleA", "styleB"],
            &["standard", "hd", "ultra_hd"],
            (28, 15, 50),
            &[20, 25, 28, 35, 40],
        ));
        catalog.register(spec(
            "flux.1-kontext-max",
            &["styleX", "styleY"],
            &["standard", "hd", "ultra_hd"],
            (30, 20, 50),
            &[25, 28, 30, 35, 40],
        ));

        catalog
    }

    /// Adds a model. Panics on an inconsistent spec: catalogs are built once
    /// at startup, so a bad entry is a programming error.
    pub fn register(&mut self, spec: ModelSpec) {
        let steps = &spec.steps;
        assert!(
            steps.min <= steps.default && steps.default <= steps.max,
            "{}: default steps {} outside [{}, {}]",
            spec.id,
            steps.default,
            steps.min,
            steps.max
        );
        assert!(
            steps.recommended.windows(2).all(|w| w[0] < w[1]),
            "{}: recommended steps must be strictly ascending",
            spec.id
        );
        assert!(
            steps
                .recommended
                .iter()
                .all(|s| (steps.min..=steps.max).contains(s)),
            "{}: recommended steps must lie in [{}, {}]",
            spec.id,
            steps.min,
            steps.max
        );
        assert!(!steps.recommended.is_empty(), "{}: no recommended steps", spec.id);
        assert!(!spec.styles.is_empty(), "{}: no styles", spec.id);
        assert!(!spec.qualities.is_empty(), "{}: no qualities", spec.id);
        assert!(
            self.models.iter().all(|m| m.id != spec.id),
            "{}: registered twice",
            spec.id
        );

        self.models.push(spec);
    }

    pub fn spec_for(&self, model_id: &str) -> Result<&ModelSpec, FluxError> {
        self.models
            .iter()
            .find(|m| m.id == model_id)
            .ok_or_else(|| FluxError::UnknownModel(model_id.to_string()))
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn default_model(&self) -> Option<&ModelSpec> {
        self.models.first()
    }
}

fn spec(
    id: &str,
    own_styles: &[&str],
    qualities: &[&str],
    (default, min, max): (u32, u32, u32),
    recommended: &[u32],
) -> ModelSpec {
    ModelSpec {
        id: id.to_string(),
        styles: own_styles
            .iter()
            .chain(SHARED_STYLES.iter())
            .map(|s| s.to_string())
            .collect(),
        qualities: qualities.iter().map(|q| q.to_string()).collect(),
        steps: StepConfig {
            default,
            min,
            max,
            recommended: recommended.to_vec(),
        },
    }
}
