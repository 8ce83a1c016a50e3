use std::sync::Arc;

use tracing::info;

use crate::config::CompressionConfig;
use crate::models::{CompressedDocument, UploadedDocument};
use crate::services::compressor::{CompressOptions, PdfCompressor};
use crate::services::error::CompressError;
use crate::services::staging::StagingArea;

/// The staged-file subprocess pipeline: stage → run tool → harvest result.
///
/// The staged pair lives on the stack of `compress_document`, so both
/// temporary files are removed when the function returns, whichever way it
/// returns.
pub struct CompressionService {
    staging: StagingArea,
    compressor: Arc<dyn PdfCompressor>,
}

impl CompressionService {
    pub fn new(config: &CompressionConfig, compressor: Arc<dyn PdfCompressor>) -> Self {
        Self {
            staging: StagingArea::new(config.staging_dir.clone()),
            compressor,
        }
    }

    pub async fn compress_document(
        &self,
        document: &UploadedDocument,
        options: &CompressOptions,
    ) -> Result<CompressedDocument, CompressError> {
        let staged = self.staging.stage(document).await?;

        self.compressor
            .compress(staged.input_path(), staged.output_path(), options)
            .await?;

        let content = self.staging.read_result(&staged).await?;

        let original_size = document.size();
        let compressed_size = content.len() as u64;
        let reduction = reduction_percent(original_size, compressed_size);
        info!(
            "Compressed '{}': {} -> {} bytes ({}%)",
            document.file_name, original_size, compressed_size, reduction
        );

        Ok(CompressedDocument {
            file_name: document.file_name.clone(),
            original_size,
            compressed_size,
            reduction_percent: reduction,
            content,
        })
    }
}

/// `round(100 * (original - compressed) / original)`, `0` for an empty
/// original. Negative when the tool grew the file.
pub fn reduction_percent(original_size: u64, compressed_size: u64) -> i64 {
    if original_size == 0 {
        return 0;
    }
    let saved = original_size as f64 - compressed_size as f64;
    (100.0 * saved / original_size as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;

    use super::*;
    use crate::services::compressor::{PassthroughCompressor, QualityPreset};

    /// Simulates a tool that runs and fails.
    struct FailingCompressor;

    #[async_trait]
    impl PdfCompressor for FailingCompressor {
        async fn compress(
            &self,
            _input: &Path,
            _output: &Path,
            _options: &CompressOptions,
        ) -> Result<(), CompressError> {
            Err(CompressError::ToolExecution("error: corrupt xref".to_string()))
        }

        async fn health_check(&self) -> bool {
            false
        }
    }

    /// Simulates a tool that exits 0 without writing any output.
    struct SilentCompressor;

    #[async_trait]
    impl PdfCompressor for SilentCompressor {
        async fn compress(
            &self,
            _input: &Path,
            _output: &Path,
            _options: &CompressOptions,
        ) -> Result<(), CompressError> {
            Ok(())
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn service_in(
        dir: &Path,
        compressor: Arc<dyn PdfCompressor>,
    ) -> CompressionService {
        let config = CompressionConfig {
            staging_dir: dir.to_path_buf(),
            ..CompressionConfig::development()
        };
        CompressionService::new(&config, compressor)
    }

    fn pdf_document(content: &[u8]) -> UploadedDocument {
        UploadedDocument {
            file_name: "doc.pdf".to_string(),
            media_type: Some("application/pdf".to_string()),
            content: content.to_vec(),
        }
    }

    fn options() -> CompressOptions {
        CompressOptions {
            preset: QualityPreset::default(),
        }
    }

    fn dir_entry_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_successful_run_reports_measured_sizes_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), Arc::new(PassthroughCompressor));

        let result = service
            .compress_document(&pdf_document(b"%PDF-1.4 payload"), &options())
            .await
            .unwrap();

        assert_eq!(result.file_name, "doc.pdf");
        assert_eq!(result.original_size, 16);
        assert_eq!(result.compressed_size, 16);
        assert_eq!(result.reduction_percent, 0);
        assert_eq!(result.content, b"%PDF-1.4 payload");
        assert_eq!(dir_entry_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_tool_failure_propagates_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), Arc::new(FailingCompressor));

        let err = service
            .compress_document(&pdf_document(b"%PDF-1.4"), &options())
            .await
            .unwrap_err();
        match err {
            CompressError::ToolExecution(msg) => assert!(msg.contains("corrupt xref")),
            other => panic!("expected ToolExecution, got {:?}", other),
        }
        assert_eq!(dir_entry_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_output_is_result_missing_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), Arc::new(SilentCompressor));

        let err = service
            .compress_document(&pdf_document(b"%PDF-1.4"), &options())
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::ResultMissing));
        assert_eq!(dir_entry_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_invalid_media_type_creates_no_files() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path(), Arc::new(PassthroughCompressor));

        let doc = UploadedDocument {
            file_name: "doc.txt".to_string(),
            media_type: Some("text/plain".to_string()),
            content: b"plain text".to_vec(),
        };
        assert!(matches!(
            service.compress_document(&doc, &options()).await.unwrap_err(),
            CompressError::InvalidInput
        ));
        assert_eq!(dir_entry_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_concurrent_runs_with_identical_names_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let service = Arc::new(service_in(tmp.path(), Arc::new(PassthroughCompressor)));

        let doc = pdf_document(b"%PDF-1.4 shared name");
        let opts = options();
        let (a, b) = tokio::join!(
            service.compress_document(&doc, &opts),
            service.compress_document(&doc, &opts),
        );
        assert_eq!(a.unwrap().content, b"%PDF-1.4 shared name");
        assert_eq!(b.unwrap().content, b"%PDF-1.4 shared name");
        assert_eq!(dir_entry_count(tmp.path()), 0);
    }

    #[test]
    fn test_reduction_percent() {
        assert_eq!(reduction_percent(1000, 250), 75);
        assert_eq!(reduction_percent(0, 0), 0);
        assert_eq!(reduction_percent(0, 100), 0);
        assert_eq!(reduction_percent(3, 1), 67);
        // Ghostscript can grow small files
        assert_eq!(reduction_percent(100, 150), -50);
    }
}
