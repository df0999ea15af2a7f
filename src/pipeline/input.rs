//! Upload receiver: validate the multipart upload and buffer it to disk.
//!
//! The extension is checked from the multipart headers before the body is
//! read, so a rejected upload never touches the filesystem. Accepted bodies
//! are written to a uniquely named temp file (random `tempfile` name, so
//! concurrent requests cannot collide) which is registered with the request's
//! [`Scratch`] before the first byte is written.

use crate::error::{ApiError, UNSUPPORTED_FILE_MESSAGE};
use crate::scratch::Scratch;
use axum::extract::Multipart;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Name of the multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "file";

const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// What kind of document was uploaded, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    /// Classify an upload by its filename (ASCII case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, ApiError> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Ok(FileKind::Pdf)
        } else if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            Ok(FileKind::Image)
        } else {
            Err(ApiError::InvalidInput(UNSUPPORTED_FILE_MESSAGE.to_string()))
        }
    }

    pub fn is_image(self) -> bool {
        self == FileKind::Image
    }

    /// Tag used in JSON summaries: `"pdf"` or `"image"`.
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Image => "image",
        }
    }
}

/// An accepted upload, buffered to a temporary file.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Filename as sent by the client.
    pub filename: String,
    pub kind: FileKind,
    /// Temp file holding the body. Owned by the request's scratch registry.
    pub path: PathBuf,
    pub size: usize,
}

/// Read the `file` field of a multipart body into a temp file under `temp_dir`.
///
/// Other fields are drained and ignored.
pub async fn receive_upload(
    mut multipart: Multipart,
    temp_dir: &Path,
    scratch: &Scratch,
) -> Result<UploadedDocument, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            field.bytes().await?;
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let kind = FileKind::from_filename(&filename)?;

        let data = field.bytes().await?;

        let path = write_temp_upload(temp_dir, &filename, &data, scratch).await?;
        info!(
            "Received upload '{}' ({}, {} bytes)",
            filename,
            kind.as_str(),
            data.len()
        );

        return Ok(UploadedDocument {
            filename,
            kind,
            path,
            size: data.len(),
        });
    }

    Err(ApiError::InvalidInput("No file uploaded".to_string()))
}

async fn write_temp_upload(
    temp_dir: &Path,
    filename: &str,
    data: &[u8],
    scratch: &Scratch,
) -> Result<PathBuf, ApiError> {
    let suffix = extension_suffix(filename);
    let named = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(temp_dir)
        .map_err(|e| ApiError::io("Failed to create temporary file", e))?;

    // Lifetime is managed by `scratch` from here on, not by tempfile.
    let (file, path) = named
        .keep()
        .map_err(|e| ApiError::io("Failed to create temporary file", e.error))?;
    scratch.register(&path);

    let mut file = tokio::fs::File::from_std(file);
    file.write_all(data)
        .await
        .map_err(|e| ApiError::io("Failed to write temporary file", e))?;
    file.flush()
        .await
        .map_err(|e| ApiError::io("Failed to write temporary file", e))?;

    debug!("Buffered upload to {}", path.display());
    Ok(path)
}

/// Lower-cased `.ext` of a filename, or an empty string.
fn extension_suffix(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Derive the markdown filename for an upload: last path component, extension
/// replaced by `.md`.
///
/// Directory parts are dropped so a crafted name cannot escape the output
/// directory.
pub fn output_filename(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let stem = match base.rfind('.') {
        Some(i) => &base[..i],
        None => base,
    };
    if stem.trim().is_empty() {
        "document.md".to_string()
    } else {
        format!("{stem}.md")
    }
}
