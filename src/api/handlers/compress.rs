use axum::{Json, extract::Multipart, extract::State};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::api::error::AppError;
use crate::models::{CompressResponse, UploadedDocument};
use crate::services::compressor::{CompressOptions, QualityPreset};
use crate::utils::validation::validate_file_size;

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

#[utoipa::path(
    post,
    path = "/compress",
    request_body(content = Vec<u8>, description = "PDF document in the `pdf` field, optional `preset` field (screen/ebook/printer/prepress/default)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Compressed document", body = CompressResponse),
        (status = 400, description = "Not a PDF or malformed request"),
        (status = 413, description = "Upload exceeds the size limit"),
        (status = 422, description = "The compression tool failed"),
        (status = 503, description = "Compression tool not installed")
    ),
    tag = "compression"
)]
pub async fn compress_pdf(
    State(state): State<crate::AppState>,
    mut multipart: Multipart,
) -> Result<Json<CompressResponse>, AppError> {
    // Capture errors in a block result so the remaining multipart stream can
    // still be consumed on early failure.
    let result: Result<Json<CompressResponse>, AppError> = async {
        let mut document: Option<UploadedDocument> = None;
        let mut preset_override: Option<QualityPreset> = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "pdf" {
                let file_name = field.file_name().unwrap_or("unnamed.pdf").to_string();
                let media_type = field.content_type().map(|s| s.to_string());
                let content = field.bytes().await.map_err(multipart_error)?;

                validate_file_size(content.len(), state.config.max_file_size)
                    .map_err(|e| AppError::PayloadTooLarge(e.to_string()))?;

                document = Some(UploadedDocument {
                    file_name,
                    media_type,
                    content: content.to_vec(),
                });
            } else if name == "preset" {
                let text = field.text().await.unwrap_or_default();
                if !text.is_empty() {
                    preset_override = Some(QualityPreset::parse(&text).ok_or_else(|| {
                        AppError::BadRequest(format!("Unknown quality preset '{}'", text))
                    })?);
                }
            }
        }

        let document =
            document.ok_or(AppError::BadRequest("No file provided".to_string()))?;

        let options = CompressOptions {
            preset: preset_override.unwrap_or(state.config.quality_preset),
        };

        let compressed = state.pipeline.compress_document(&document, &options).await?;

        Ok(Json(CompressResponse {
            file_name: compressed.file_name,
            original_size: compressed.original_size,
            compressed_size: compressed.compressed_size,
            reduction_percent: compressed.reduction_percent,
            compressed_file_base64: BASE64.encode(&compressed.content),
        }))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Consume the remaining multipart stream to avoid a TCP reset
            // ("Network error" in browsers) when rejecting early
            tracing::warn!("Compression request failed: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}
