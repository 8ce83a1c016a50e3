use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::models::UploadedDocument;
use crate::services::error::CompressError;
use crate::utils::validation::sanitize_filename;

/// Filename prefix for the output path of a staged pair.
const OUTPUT_PREFIX: &str = "compressed-";

/// A staged input/output path pair, owned by exactly one pipeline invocation.
///
/// Dropping the pair removes both files. This is the cleanup guarantee: the
/// guard runs on success, on every failure return, and on unwind, so call
/// sites cannot forget it.
#[derive(Debug)]
pub struct StagedPair {
    input_path: PathBuf,
    output_path: PathBuf,
}

impl StagedPair {
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl Drop for StagedPair {
    fn drop(&mut self) {
        for path in [&self.input_path, &self.output_path] {
            if let Err(e) = std::fs::remove_file(path) {
                // The output file legitimately does not exist when the tool
                // failed; anything else is worth a warning but must not
                // override the pipeline outcome.
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove staged file {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Allocates unique staged path pairs inside a single directory and
/// materializes uploads to disk for the external tool.
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Validates the upload and writes it to a fresh input path.
    ///
    /// The media-type check happens before any filesystem work, so a rejected
    /// upload creates zero files. The stem combines a millisecond timestamp,
    /// a v4 UUID and the sanitized original name, which keeps concurrent
    /// requests with identical filenames collision-free.
    pub async fn stage(&self, document: &UploadedDocument) -> Result<StagedPair, CompressError> {
        if document.media_type.as_deref() != Some(mime::APPLICATION_PDF.as_ref()) {
            return Err(CompressError::InvalidInput);
        }

        let stem = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            sanitize_filename(&document.file_name)
        );
        let pair = StagedPair {
            input_path: self.dir.join(&stem),
            output_path: self.dir.join(format!("{OUTPUT_PREFIX}{stem}")),
        };

        // On write failure the pair is dropped here, which also removes any
        // partially written input file.
        tokio::fs::write(pair.input_path(), &document.content)
            .await
            .map_err(CompressError::StagingIo)?;

        tracing::debug!(
            "Staged {} bytes for {}",
            document.content.len(),
            document.file_name
        );
        Ok(pair)
    }

    /// Reads back the tool's output file.
    ///
    /// A missing or empty output file means the tool did not actually produce
    /// a result, regardless of what its exit status claimed.
    pub async fn read_result(&self, pair: &StagedPair) -> Result<Vec<u8>, CompressError> {
        match tokio::fs::read(pair.output_path()).await {
            Ok(bytes) if bytes.is_empty() => Err(CompressError::ResultMissing),
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CompressError::ResultMissing)
            }
            Err(e) => Err(CompressError::StagingIo(e)),
        }
    }
}
