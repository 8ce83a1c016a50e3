use std::env;
use std::path::PathBuf;

use crate::services::compressor::QualityPreset;

/// Runtime configuration for the compression pipeline
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Maximum upload size in bytes (default: 50 MB)
    pub max_file_size: usize,

    /// Compression backend: "ghostscript" or "passthrough" (default: "ghostscript")
    pub compressor_kind: String,

    /// Ghostscript binary to invoke (default: "gs")
    pub gs_binary: String,

    /// Quality preset passed as -dPDFSETTINGS (default: ebook)
    pub quality_preset: QualityPreset,

    /// Wall-clock limit for one tool invocation in seconds (default: 120)
    pub tool_timeout_secs: u64,

    /// Directory for staged input/output pairs (default: system temp dir)
    pub staging_dir: PathBuf,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024, // 50 MB
            compressor_kind: "ghostscript".to_string(),
            gs_binary: "gs".to_string(),
            quality_preset: QualityPreset::default(),
            tool_timeout_secs: 120,
            staging_dir: env::temp_dir(),
        }
    }
}

impl CompressionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            compressor_kind: env::var("PDF_COMPRESSOR").unwrap_or(default.compressor_kind),

            gs_binary: env::var("GS_BINARY").unwrap_or(default.gs_binary),

            quality_preset: env::var("GS_QUALITY_PRESET")
                .ok()
                .and_then(|v| {
                    let preset = QualityPreset::parse(&v);
                    if preset.is_none() {
                        tracing::warn!("Unknown GS_QUALITY_PRESET '{}', using default", v);
                    }
                    preset
                })
                .unwrap_or(default.quality_preset),

            tool_timeout_secs: env::var("TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.tool_timeout_secs),

            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),
        }
    }

    /// Create config for development (no external tool required)
    pub fn development() -> Self {
        Self {
            compressor_kind: "passthrough".to_string(),
            ..Self::default()
        }
    }
}
