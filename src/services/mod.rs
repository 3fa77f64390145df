// src/services/mod.rs
pub mod export_service;
pub mod generation_client;
pub mod history_store;
pub mod image_processor;
pub mod model_catalog;
pub mod parameter_resolver;
pub mod request_builder;
pub mod response_normalizer;
pub mod session;

pub use export_service::ExportService;
pub use generation_client::{GenerationClient, ImageFetcher, ImageGenerationApi};
pub use history_store::HistoryStore;
pub use image_processor::ImageProcessor;
pub use model_catalog::ModelCatalog;
pub use request_builder::RequestBuilder;
pub use response_normalizer::{ImageDescriptor, ResponseNormalizer};
pub use session::{GenerationContext, SessionRegistry};
