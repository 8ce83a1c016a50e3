use thiserror::Error;

/// Failure taxonomy for the compression pipeline.
///
/// Every variant renders as a fixed, user-safe message. Only `ToolExecution`
/// carries diagnostic text from the external tool; no variant exposes
/// filesystem paths.
#[derive(Error, Debug)]
pub enum CompressError {
    /// The declared media type was not `application/pdf`. No file was staged.
    #[error("Please upload a valid PDF file.")]
    InvalidInput,

    /// Writing or reading a staged file failed (disk full, permissions).
    #[error("Failed to store the uploaded file for processing")]
    StagingIo(#[source] std::io::Error),

    /// The compression binary could not be located or executed.
    #[error("Ghostscript is not installed on the server or is not in the system PATH.")]
    ToolNotFound,

    /// The tool ran but exited non-zero, crashed, or timed out.
    #[error("PDF compression failed: {0}")]
    ToolExecution(String),

    /// The tool reported success but left no usable output file behind.
    #[error("Compression finished but produced no output file")]
    ResultMissing,
}
