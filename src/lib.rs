pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CompressionConfig;
use crate::services::compressor::PdfCompressor;
use crate::services::pipeline::CompressionService;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::compress::compress_pdf,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::CompressResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "compression", description = "PDF compression endpoints"),
        (name = "system", description = "Health and metadata endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CompressionService>,
    pub compressor: Arc<dyn PdfCompressor>,
    pub config: CompressionConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/compress",
            post(api::handlers::compress::compress_pdf).layer(
                axum::extract::DefaultBodyLimit::max(
                    state.config.max_file_size + 10 * 1024 * 1024, // Add 10MB buffer for multipart overhead
                ),
            ),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .with_state(state)
}
