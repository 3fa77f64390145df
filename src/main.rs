// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::Settings;
use crate::handlers::{
    clear_history, create_session, download_archive, download_image, end_session, generate,
    get_history, get_model, list_models, resolve_steps, upload_image,
};
use crate::services::{
    ExportService, GenerationClient, GenerationContext, ImageFetcher, ImageGenerationApi,
    ImageProcessor, ModelCatalog, SessionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    catalog: Arc<ModelCatalog>,
    sessions: Arc<SessionRegistry>,
    api: Arc<dyn ImageGenerationApi>,
    fetcher: Arc<dyn ImageFetcher>,
    image_processor: Arc<ImageProcessor>,
    export_service: Arc<ExportService>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        api: Arc<dyn ImageGenerationApi>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            catalog: Arc::new(ModelCatalog::builtin()),
            sessions: Arc::new(SessionRegistry::new()),
            api,
            fetcher,
            image_processor: Arc::new(ImageProcessor::new()),
            export_service: Arc::new(ExportService::new()),
        }
    }

    pub fn context(&self) -> GenerationContext<'_> {
        GenerationContext {
            catalog: &self.catalog,
            api: self.api.as_ref(),
            fetcher: self.fetcher.as_ref(),
            processor: &self.image_processor,
            default_api_key: self.settings.api_key.as_deref(),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/models", web::get().to(list_models))
            .route("/models/{model_id}", web::get().to(get_model))
            .route("/models/{model_id}/steps", web::post().to(resolve_steps))
            .route("/sessions", web::post().to(create_session))
            .route("/sessions/{session_id}", web::delete().to(end_session))
            .route("/sessions/{session_id}/upload", web::post().to(upload_image))
            .route("/sessions/{session_id}/generate", web::post().to(generate))
            .route("/sessions/{session_id}/history", web::get().to(get_history))
            .route("/sessions/{session_id}/history", web::delete().to(clear_history))
            .route(
                "/sessions/{session_id}/history/{ordinal}/image",
                web::get().to(download_image),
            )
            .route("/sessions/{session_id}/archive", web::get().to(download_archive)),
    )
    .route("/health", web::get().to(health_check));
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting flux-studio service...");

    let settings = Settings::from_env().context("Failed to load settings")?;
    let client = Arc::new(GenerationClient::new(settings.base_url.clone()));
    let bind_addr = settings.bind_addr.clone();

    info!("Forwarding generations to {}", settings.base_url);
    if settings.api_key.is_none() {
        info!("No FLUX_API_KEY set; every submission must carry its own key");
    }

    let app_state = AppState::new(settings, client.clone(), client);

    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server stopped unexpectedly")
}

async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "flux-studio",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": data.sessions.len().await
    }))
}
