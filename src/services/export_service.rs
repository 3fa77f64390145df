// src/services/export_service.rs
use std::io::{Cursor, Write};

use chrono::{DateTime, Local};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::FluxError;
use crate::models::{GeneratedBatch, HistoryRecord};

/// A downloadable file.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

pub fn single_image_filename(steps: u32, timestamp: &str) -> String {
    format!(
        "flux_image_{}steps_{}.png",
        steps,
        timestamp.replace(':', "-").replace(' ', "_")
    )
}

pub fn archive_entry_name(ordinal: usize, steps: u32) -> String {
    format!("generated_image_{}_{}steps.png", ordinal, steps)
}

pub fn archive_filename(steps: u32, generated_at: &DateTime<Local>) -> String {
    format!(
        "flux_images_{}steps_{}.zip",
        steps,
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

pub struct ExportService;

impl ExportService {
    pub fn new() -> Self {
        Self
    }

    pub fn export_record(&self, record: &HistoryRecord) -> Result<ExportFile, FluxError> {
        Ok(ExportFile {
            filename: single_image_filename(record.params.steps, &record.timestamp()),
            content_type: "image/png",
            data: record.image_bytes()?,
        })
    }

    pub fn export_batch(&self, batch: &GeneratedBatch) -> Result<ExportFile, FluxError> {
        Ok(ExportFile {
            filename: archive_filename(batch.steps, &batch.created_at),
            content_type: "application/zip",
            data: self.build_archive(&batch.images, batch.steps)?,
        })
    }

    pub fn build_archive(&self, images: &[Vec<u8>], steps: u32) -> Result<Vec<u8>, FluxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (i, png) in images.iter().enumerate() {
            writer
                .start_file(archive_entry_name(i + 1, steps), options)
                .map_err(|e| FluxError::Archive(format!("Failed to start entry: {}", e)))?;
            writer
                .write_all(png)
                .map_err(|e| FluxError::Archive(format!("Failed to write entry: {}", e)))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| FluxError::Archive(format!("Failed to finish archive: {}", e)))?;

        Ok(cursor.into_inner())
    }
}
