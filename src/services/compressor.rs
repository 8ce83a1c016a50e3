use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::CompressionConfig;
use crate::services::error::CompressError;

/// Ghostscript quality preset (`-dPDFSETTINGS`).
///
/// Only these fixed values ever reach the command line; user input is parsed
/// into the enum and rejected otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityPreset {
    /// Low resolution, smallest output.
    Screen,
    /// Medium resolution, the default profile.
    #[default]
    Ebook,
    /// High quality printing.
    Printer,
    /// Color-preserving press quality.
    Prepress,
    /// Ghostscript's own defaults.
    Standard,
}

impl QualityPreset {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "screen" => Some(Self::Screen),
            "ebook" => Some(Self::Ebook),
            "printer" => Some(Self::Printer),
            "prepress" => Some(Self::Prepress),
            "default" => Some(Self::Standard),
            _ => None,
        }
    }

    pub fn as_gs_setting(&self) -> &'static str {
        match self {
            Self::Screen => "/screen",
            Self::Ebook => "/ebook",
            Self::Printer => "/printer",
            Self::Prepress => "/prepress",
            Self::Standard => "/default",
        }
    }
}

impl std::fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_gs_setting().trim_start_matches('/'))
    }
}

/// Per-invocation options for a compression run.
#[derive(Debug, Clone, Copy)]
pub struct CompressOptions {
    pub preset: QualityPreset,
}

/// Capability seam for the external tool: transform the file at `input` into
/// a smaller file at `output`, report success or a classified failure.
#[async_trait]
pub trait PdfCompressor: Send + Sync {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        options: &CompressOptions,
    ) -> Result<(), CompressError>;

    /// Check whether the backend is available/healthy
    async fn health_check(&self) -> bool;
}

/// Compressor backed by the Ghostscript `pdfwrite` device.
pub struct GhostscriptCompressor {
    binary: String,
    timeout: Duration,
}

impl GhostscriptCompressor {
    pub fn new(binary: String, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    pub fn from_config(config: &CompressionConfig) -> Self {
        Self::new(
            config.gs_binary.clone(),
            Duration::from_secs(config.tool_timeout_secs),
        )
    }

    fn classify_spawn_error(e: std::io::Error) -> CompressError {
        if e.kind() == std::io::ErrorKind::NotFound {
            CompressError::ToolNotFound
        } else {
            CompressError::ToolExecution(e.to_string())
        }
    }
}

#[async_trait]
impl PdfCompressor for GhostscriptCompressor {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        options: &CompressOptions,
    ) -> Result<(), CompressError> {
        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output);

        // Fixed-shape argument list; the only variable parts are the two
        // staged paths and the allow-listed preset. No shell is involved.
        let child = Command::new(&self.binary)
            .arg("-sDEVICE=pdfwrite")
            .arg("-dCompatibilityLevel=1.4")
            .arg(format!("-dPDFSETTINGS={}", options.preset.as_gs_setting()))
            .arg("-dNOPAUSE")
            .arg("-dQUIET")
            .arg("-dBATCH")
            .arg(output_arg)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(Self::classify_spawn_error)?;

        // If the timeout fires (or the request is aborted and this future is
        // dropped), the owned child is dropped and kill_on_drop terminates it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        let tool_output = match result {
            Ok(Ok(tool_output)) => tool_output,
            Ok(Err(e)) => return Err(CompressError::ToolExecution(e.to_string())),
            Err(_) => {
                warn!(
                    "Ghostscript timed out after {}s, killing child process",
                    self.timeout.as_secs()
                );
                return Err(CompressError::ToolExecution(format!(
                    "timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        if tool_output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&tool_output.stderr);
        let diagnostic = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&tool_output.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        if diagnostic.is_empty() {
            Err(CompressError::ToolExecution(format!(
                "ghostscript exited with {}",
                tool_output.status
            )))
        } else {
            Err(CompressError::ToolExecution(diagnostic))
        }
    }

    async fn health_check(&self) -> bool {
        let probe = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(Duration::from_secs(5), probe).await {
            Ok(Ok(status)) => status.success(),
            _ => false,
        }
    }
}

/// Copies the input file unchanged. Development/test stand-in, the pipeline
/// around it behaves exactly as with the real tool.
pub struct PassthroughCompressor;

#[async_trait]
impl PdfCompressor for PassthroughCompressor {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        _options: &CompressOptions,
    ) -> Result<(), CompressError> {
        warn!("PassthroughCompressor: copying without compression (development mode)");
        tokio::fs::copy(input, output)
            .await
            .map_err(|e| CompressError::ToolExecution(e.to_string()))?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Factory function to create the configured compressor backend
pub fn create_compressor(kind: &str, config: &CompressionConfig) -> Arc<dyn PdfCompressor> {
    match kind.to_lowercase().as_str() {
        "ghostscript" | "gs" => Arc::new(GhostscriptCompressor::from_config(config)),
        "passthrough" | "none" | "disabled" => Arc::new(PassthroughCompressor),
        _ => {
            warn!("Unknown compressor kind '{}', using ghostscript", kind);
            Arc::new(GhostscriptCompressor::from_config(config))
        }
    }
}

/// Create the compressor and warm it up with a health probe at startup.
pub async fn setup_compressor(config: &CompressionConfig) -> Arc<dyn PdfCompressor> {
    let compressor = create_compressor(&config.compressor_kind, config);

    if compressor.health_check().await {
        info!("🗜️  Compression backend available");
    } else {
        warn!(
            "⚠️  Compression backend unreachable! Requests will fail until '{}' is installed.",
            config.gs_binary
        );
    }

    compressor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CompressOptions {
        CompressOptions {
            preset: QualityPreset::default(),
        }
    }

    #[cfg(unix)]
    fn write_fake_tool(dir: &Path, script: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-gs");
        std::fs::write(&path, script).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_preset_parse_allow_list() {
        assert_eq!(QualityPreset::parse("ebook"), Some(QualityPreset::Ebook));
        assert_eq!(QualityPreset::parse("SCREEN"), Some(QualityPreset::Screen));
        assert_eq!(
            QualityPreset::parse("default"),
            Some(QualityPreset::Standard)
        );
        assert_eq!(QualityPreset::parse("/ebook"), None);
        assert_eq!(QualityPreset::parse("-dQUIET"), None);
    }

    #[test]
    fn test_preset_gs_settings() {
        assert_eq!(QualityPreset::Ebook.as_gs_setting(), "/ebook");
        assert_eq!(QualityPreset::Standard.as_gs_setting(), "/default");
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();

        let compressor = GhostscriptCompressor::new(
            "/nonexistent/gs-missing".to_string(),
            Duration::from_secs(5),
        );
        let err = compressor
            .compress(&input, &tmp.path().join("out.pdf"), &options())
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::ToolNotFound));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr_diagnostic() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = write_fake_tool(
            tmp.path(),
            "#!/bin/sh\necho 'error: corrupt xref' >&2\nexit 1\n",
        );

        let compressor =
            GhostscriptCompressor::new(tool.to_str().unwrap().to_string(), Duration::from_secs(5));
        let err = compressor
            .compress(
                &tmp.path().join("in.pdf"),
                &tmp.path().join("out.pdf"),
                &options(),
            )
            .await
            .unwrap_err();
        match err {
            CompressError::ToolExecution(msg) => assert!(msg.contains("error: corrupt xref")),
            other => panic!("expected ToolExecution, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = write_fake_tool(tmp.path(), "#!/bin/sh\nexit 0\n");

        let compressor =
            GhostscriptCompressor::new(tool.to_str().unwrap().to_string(), Duration::from_secs(5));
        compressor
            .compress(
                &tmp.path().join("in.pdf"),
                &tmp.path().join("out.pdf"),
                &options(),
            )
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_tool_is_killed_and_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = write_fake_tool(tmp.path(), "#!/bin/sh\nsleep 30\n");

        let compressor = GhostscriptCompressor::new(
            tool.to_str().unwrap().to_string(),
            Duration::from_millis(200),
        );
        let err = compressor
            .compress(
                &tmp.path().join("in.pdf"),
                &tmp.path().join("out.pdf"),
                &options(),
            )
            .await
            .unwrap_err();
        match err {
            CompressError::ToolExecution(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected ToolExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_passthrough_copies_input() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.pdf");
        let output = tmp.path().join("out.pdf");
        std::fs::write(&input, b"%PDF-1.4 content").unwrap();

        PassthroughCompressor
            .compress(&input, &output, &options())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"%PDF-1.4 content");
        assert!(PassthroughCompressor.health_check().await);
    }

    #[tokio::test]
    async fn test_create_compressor_kinds() {
        let config = CompressionConfig::development();
        assert!(create_compressor("passthrough", &config).health_check().await);
        assert!(create_compressor("disabled", &config).health_check().await);
    }
}
