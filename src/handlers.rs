// src/handlers.rs
use crate::{
    AppState,
    errors::FluxError,
    models::*,
    services::parameter_resolver::{self, format_estimate, recommended_options},
    services::export_service::ExportFile,
};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures_util::TryStreamExt;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_RECENT_COUNT: usize = 6;

#[derive(Debug, Deserialize)]
pub struct StepsBody {
    pub selection: StepSelection,
    #[serde(default)]
    pub n: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HistoryItem<'a> {
    ordinal: usize,
    timestamp: String,
    #[serde(flatten)]
    record: &'a HistoryRecord,
}

pub async fn list_models(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "models": data.catalog.models(),
        "default": data.catalog.default_model().map(|m| m.id.as_str()),
    }))
}

pub async fn get_model(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let spec = data.catalog.spec_for(&path)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "model": spec,
        "recommended": recommended_options(spec),
    })))
}

pub async fn resolve_steps(
    path: web::Path<String>,
    data: web::Data<AppState>,
    body: web::Json<StepsBody>,
) -> Result<HttpResponse, Error> {
    let spec = data.catalog.spec_for(&path)?;
    let resolved = parameter_resolver::resolve_steps(spec, body.selection)?;
    let seconds = parameter_resolver::estimated_seconds(resolved.steps, body.n.unwrap_or(1));

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "model": spec.id,
        "steps": resolved.steps,
        "tier": resolved.tier,
        "estimated_seconds": seconds,
        "estimate": format_estimate(seconds),
    })))
}

pub async fn create_session(data: web::Data<AppState>) -> HttpResponse {
    let session_id = data.sessions.create().await;
    HttpResponse::Created().json(serde_json::json!({ "session_id": session_id }))
}

pub async fn end_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.sessions.remove(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn upload_image(
    path: web::Path<Uuid>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let session = data.sessions.get(&session_id).await?;
    let limit = data.settings.max_upload_bytes;

    let mut image_data = None;
    while let Some(mut field) = payload.try_next().await? {
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(FluxError::InvalidParameter(format!(
                    "upload exceeds {} bytes",
                    limit
                ))
                .into());
            }
            bytes.extend_from_slice(&chunk);
        }
        // Only the first file part is used as the reference image.
        if image_data.is_none() && !bytes.is_empty() {
            image_data = Some(bytes);
        }
    }

    let image_data = image_data
        .ok_or_else(|| FluxError::InvalidParameter("No image in upload".to_string()))?;
    let (width, height) = data.image_processor.validate_image(&image_data)?;
    let size = image_data.len();

    session.lock().await.set_upload(image_data);
    info!(
        "Session {}: reference image uploaded ({}x{}, {} bytes)",
        session_id, width, height, size
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "session_id": session_id,
        "width": width,
        "height": height,
        "size": size
    })))
}

pub async fn generate(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<GenerationInput>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path).await?;

    // Held for the whole generation: one submission at a time per session.
    let mut session = session.lock().await;
    let outcome = session
        .generate(&data.context(), body.into_inner())
        .await
        .inspect_err(|e| {
            if !e.is_validation() {
                warn!("Session {}: generation failed: {}", session.id(), e);
            }
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "steps": outcome.resolved.steps,
        "tier": outcome.resolved.tier,
        "estimated_seconds": outcome.estimated_seconds,
        "estimate": format_estimate(outcome.estimated_seconds),
        "images": outcome.records,
        "failed": outcome.failed,
        "dropped": outcome.dropped,
        "archive_available": outcome.records.len() > 1,
        "history_len": session.history().len(),
    })))
}

pub async fn get_history(
    path: web::Path<Uuid>,
    query: web::Query<HistoryQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path).await?;
    let session = session.lock().await;
    let history = session.history();

    let total = history.len();
    let items: Vec<HistoryItem> = history
        .recent_window(query.limit.unwrap_or(DEFAULT_RECENT_COUNT))?
        .into_iter()
        .enumerate()
        .map(|(i, record)| HistoryItem {
            ordinal: total - i,
            timestamp: record.timestamp(),
            record,
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total": total,
        "options": history.options(),
        "items": items,
    })))
}

pub async fn clear_history(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path).await?;
    let mut session = session.lock().await;
    let cleared = session.history().len();
    session.clear_history();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "cleared": cleared })))
}

pub async fn download_image(
    path: web::Path<(Uuid, usize)>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (session_id, ordinal) = path.into_inner();
    let session = data.sessions.get(&session_id).await?;
    let session = session.lock().await;

    let record = session.history().select(ordinal)?;
    let file = data.export_service.export_record(record)?;

    Ok(attachment(file))
}

pub async fn download_archive(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path).await?;
    let session = session.lock().await;

    let batch = session
        .last_batch()
        .filter(|batch| batch.images.len() > 1)
        .ok_or_else(|| {
            FluxError::InvalidParameter(
                "no multi-image batch to archive; download single images from history".to_string(),
            )
        })?;
    let file = data.export_service.export_batch(batch)?;

    Ok(attachment(file))
}

fn attachment(file: ExportFile) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(file.content_type)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", file.filename),
        ))
        .body(file.data)
}
