use anyhow::{Result, anyhow};
use std::path::Path;

/// Maximum length (in bytes) of the sanitized filename fragment used when
/// building staged paths. The unique stem prefix already guarantees
/// collision resistance, so the fragment only needs to stay readable.
const MAX_FRAGMENT_LEN: usize = 100;

/// Sanitizes an uploaded filename for use as a path fragment inside the
/// staging directory. Strips any path components, replaces separators,
/// reserved characters and control characters, and caps the length.
pub fn sanitize_filename(filename: &str) -> String {
    // Get only the filename component (remove any path)
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt in uploaded filename: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > MAX_FRAGMENT_LEN {
        let mut end = MAX_FRAGMENT_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    if sanitized.is_empty() {
        "upload.pdf".to_string()
    } else {
        sanitized
    }
}

/// Validates file size against maximum limit
pub fn validate_file_size(size: usize, max_size: usize) -> Result<()> {
    if size > max_size {
        return Err(anyhow!(
            "File size {} bytes exceeds maximum allowed {} bytes ({} MB)",
            size,
            max_size,
            max_size / 1024 / 1024
        ));
    }
    Ok(())
}
