// src/services/session.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use log::{info, warn};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::errors::FluxError;
use crate::models::{
    GeneratedBatch, GenerationInput, GenerationMode, GenerationParams, HistoryRecord,
    ResolvedSteps, SourceImage,
};
use crate::services::parameter_resolver::{estimated_seconds, resolve_steps};
use crate::services::{
    HistoryStore, ImageFetcher, ImageGenerationApi, ImageProcessor, ModelCatalog, RequestBuilder,
    ResponseNormalizer,
};

/// Shared collaborators a session needs to run a generation.
pub struct GenerationContext<'a> {
    pub catalog: &'a ModelCatalog,
    pub api: &'a dyn ImageGenerationApi,
    pub fetcher: &'a dyn ImageFetcher,
    pub processor: &'a ImageProcessor,
    /// Used when the submission carries no key of its own.
    pub default_api_key: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub resolved: ResolvedSteps,
    pub estimated_seconds: f64,
    pub records: Vec<HistoryRecord>,
    pub failed: usize,
    pub dropped: usize,
}

/// State of one interactive session: its history, the pending reference
/// upload and the last batch for archive export.
pub struct GenerationSession {
    id: Uuid,
    history: HistoryStore,
    pending_upload: Option<Vec<u8>>,
    last_batch: Option<GeneratedBatch>,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: HistoryStore::new(),
            pending_upload: None,
            last_batch: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn last_batch(&self) -> Option<&GeneratedBatch> {
        self.last_batch.as_ref()
    }

    pub fn set_upload(&mut self, data: Vec<u8>) {
        self.pending_upload = Some(data);
    }

    /// Drops every record and the batch they came from.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.last_batch = None;
        info!("Session {} history cleared", self.id);
    }

    /// Runs one submission end to end. History is only touched once the
    /// remote call returned at least one usable image.
    pub async fn generate(
        &mut self,
        ctx: &GenerationContext<'_>,
        input: GenerationInput,
    ) -> Result<GenerationOutcome, FluxError> {
        let spec = ctx.catalog.spec_for(&input.model)?;
        let resolved = resolve_steps(spec, input.step_selection)?;

        let api_key = input
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .or(ctx.default_api_key)
            .ok_or(FluxError::MissingCredential)?;

        let source = match input.mode {
            GenerationMode::ImageToImage => self.source_bytes(input.source)?,
            GenerationMode::TextToImage => None,
        };

        let request = RequestBuilder::new(ctx.processor).build(
            &input,
            spec,
            &resolved,
            Some(api_key),
            source.as_deref(),
        )?;
        let estimate = estimated_seconds(resolved.steps, request.n);

        info!(
            "Session {}: generating {} {} image(s) with {} at {} steps ({:?}, ~{:.0}s)",
            self.id,
            request.n,
            request.size.as_str(),
            request.model,
            resolved.steps,
            resolved.tier,
            estimate
        );

        let descriptors = ctx.api.generate(api_key, &request).await?;
        let normalized = ResponseNormalizer::new(ctx.fetcher, ctx.processor)
            .normalize(descriptors)
            .await;

        if normalized.images.is_empty() {
            warn!(
                "Session {}: no usable images ({} failed, {} unrecognized)",
                self.id,
                normalized.failures.len(),
                normalized.dropped
            );
            return Err(FluxError::Generation(
                "the API returned no usable images".to_string(),
            ));
        }

        let created_at = Local::now();
        let params = GenerationParams::from(&request);
        let mode = request.mode();

        let records: Vec<HistoryRecord> = normalized
            .images
            .iter()
            .map(|png| HistoryRecord::new(params.clone(), mode, png, created_at))
            .collect();
        for record in &records {
            self.history.append(record.clone());
        }

        self.last_batch = Some(GeneratedBatch {
            steps: resolved.steps,
            created_at,
            images: normalized.images,
        });

        info!(
            "Session {}: stored {} image(s), history now holds {}",
            self.id,
            records.len(),
            self.history.len()
        );

        Ok(GenerationOutcome {
            resolved,
            estimated_seconds: estimate,
            records,
            failed: normalized.failures.len(),
            dropped: normalized.dropped,
        })
    }

    fn source_bytes(&self, source: Option<SourceImage>) -> Result<Option<Vec<u8>>, FluxError> {
        match source {
            Some(SourceImage::History { ordinal }) => {
                Ok(Some(self.history.select(ordinal)?.image_bytes()?))
            }
            Some(SourceImage::Upload) | None => Ok(self.pending_upload.clone()),
        }
    }
}

/// Isolated sessions keyed by id. Each session is locked for the whole of a
/// generation so its history has a single writer.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<GenerationSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let session = GenerationSession::new();
        let id = session.id();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::new(Mutex::new(session)));
        info!("Created session {} ({} active)", id, sessions.len());
        id
    }

    pub async fn get(&self, id: &Uuid) -> Result<Arc<Mutex<GenerationSession>>, FluxError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(FluxError::SessionNotFound(*id))
    }

    /// Ends a session, releasing its history and upload.
    pub async fn remove(&self, id: &Uuid) -> Result<(), FluxError> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(id)
            .ok_or(FluxError::SessionNotFound(*id))?;
        info!("Ended session {} ({} active)", id, sessions.len());
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::GenerationRequest;
    use crate::services::ImageDescriptor;
    use crate::services::image_processor::fixtures;
    use async_trait::async_trait;
    use base64::{Engine as _, engine::general_purpose};
    use bytes::Bytes;

    /// Returns a fixed response and remembers the last request it saw.
    pub struct FakeApi {
        pub response: Result<Vec<ImageDescriptor>, String>,
        pub last_request: std::sync::Mutex<Option<GenerationRequest>>,
    }

    impl FakeApi {
        pub fn returning(descriptors: Vec<ImageDescriptor>) -> Self {
            Self {
                response: Ok(descriptors),
                last_request: std::sync::Mutex::new(None),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                response: Err(message.to_string()),
                last_request: std::sync::Mutex::new(None),
            }
        }

        pub fn inline_pngs(count: usize) -> Self {
            Self::returning(
                (0..count)
                    .map(|i| ImageDescriptor::ByValue {
                        b64_json: general_purpose::STANDARD.encode(fixtures::png(i as u32 + 1, 1)),
                    })
                    .collect(),
            )
        }

        pub fn last_request(&self) -> Option<GenerationRequest> {
            self.last_request.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageGenerationApi for FakeApi {
        async fn generate(
            &self,
            _api_key: &str,
            request: &GenerationRequest,
        ) -> Result<Vec<ImageDescriptor>, FluxError> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            self.response.clone().map_err(FluxError::Generation)
        }
    }

    pub struct NoFetch;

    #[async_trait]
    impl ImageFetcher for NoFetch {
        async fn fetch(&self, url: &str) -> Result<Bytes, FluxError> {
            Err(FluxError::ResultFetch(format!("{} unreachable", url)))
        }
    }
}
