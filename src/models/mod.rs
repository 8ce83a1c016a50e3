use serde::Serialize;
use utoipa::ToSchema;

/// An in-memory upload, as received from the multipart request.
/// Discarded once it has been staged to disk.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Original filename as declared by the client.
    pub file_name: String,
    /// Declared media type from the multipart part, if any.
    pub media_type: Option<String>,
    /// Raw byte content.
    pub content: Vec<u8>,
}

impl UploadedDocument {
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Outcome of a successful pipeline run, before response encoding.
#[derive(Debug)]
pub struct CompressedDocument {
    pub file_name: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub reduction_percent: i64,
    pub content: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompressResponse {
    pub file_name: String,
    /// Size of the uploaded document in bytes.
    pub original_size: u64,
    /// Size of the compressed document in bytes.
    pub compressed_size: u64,
    /// `round(100 * (original - compressed) / original)`; negative when the
    /// tool grew the file.
    pub reduction_percent: i64,
    /// Compressed document content, base64 encoded.
    pub compressed_file_base64: String,
}
