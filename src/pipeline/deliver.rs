//! Output delivery: hand the assembled markdown back to the client.
//!
//! Two deployment modes, see [`OutputMode`]:
//!
//! * **Download**: the markdown is written to a fresh `.md` temp file and the
//!   response body streams that file. The body owns the file's `TempPath`, so
//!   the file disappears once the body has been sent or dropped.
//! * **Summary**: the markdown is written to `<output_dir>/<base>.md`
//!   (directories created as needed, existing files overwritten) and a JSON
//!   summary is returned.

use crate::config::{OutputMode, ServerConfig};
use crate::error::ApiError;
use crate::pipeline::input::{output_filename, FileKind, UploadedDocument};
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::Stream;
use serde::Serialize;
use std::io::SeekFrom;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tempfile::TempPath;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// MIME type of download responses.
pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

/// JSON body returned in [`OutputMode::Summary`].
#[derive(Debug, Clone, Serialize)]
pub struct ParseSummary {
    pub message: String,
    /// Where the markdown was written, as given by the output directory.
    pub saved_path: String,
    pub total_pages: usize,
    pub original_filename: String,
    /// `"pdf"` or `"image"`.
    pub file_type: FileKind,
}

/// Build the success response for `upload` according to the configured mode.
pub async fn deliver(
    markdown: String,
    total_pages: usize,
    upload: &UploadedDocument,
    config: &ServerConfig,
) -> Result<Response, ApiError> {
    let filename = output_filename(&upload.filename);
    match config.output_mode {
        OutputMode::Download => download_response(&markdown, &filename, &config.temp_dir).await,
        OutputMode::Summary => {
            let summary = save_summary(
                &markdown,
                &filename,
                total_pages,
                upload,
                &config.output_dir,
            )
            .await?;
            Ok((StatusCode::OK, Json(summary)).into_response())
        }
    }
}

// ── Download mode ───────────────────────────────────────────────────────────

/// Write `markdown` to a temp file and return a response streaming it as an
/// attachment named `filename`.
pub async fn download_response(
    markdown: &str,
    filename: &str,
    temp_dir: &Path,
) -> Result<Response, ApiError> {
    let named = tempfile::Builder::new()
        .prefix("result-")
        .suffix(".md")
        .tempfile_in(temp_dir)
        .map_err(|e| ApiError::io("Failed to create output file", e))?;
    let (file, temp_path) = named.into_parts();

    let mut file = tokio::fs::File::from_std(file);
    file.write_all(markdown.as_bytes())
        .await
        .map_err(|e| ApiError::io("Failed to write output file", e))?;
    file.flush()
        .await
        .map_err(|e| ApiError::io("Failed to write output file", e))?;
    file.seek(SeekFrom::Start(0))
        .await
        .map_err(|e| ApiError::io("Failed to rewind output file", e))?;
    debug!("Staged download at {}", temp_path.display());

    let body = Body::from_stream(TempFileStream {
        inner: ReaderStream::new(file),
        _path: temp_path,
    });

    let disposition = HeaderValue::from_str(&content_disposition(filename))
        .map_err(|e| ApiError::Internal(format!("Invalid Content-Disposition: {e}")))?;

    info!("Returning {} ({} bytes) as download", filename, markdown.len());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, markdown.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(body)
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {e}")))
}

/// Streams a temp file; the file is deleted when the stream is dropped.
struct TempFileStream {
    inner: ReaderStream<tokio::fs::File>,
    _path: TempPath,
}

impl Stream for TempFileStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// `filename*` carrying the exact UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    if fallback == filename {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            percent_encode(filename)
        )
    }
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

// ── Summary mode ────────────────────────────────────────────────────────────

/// Persist `markdown` as `<output_dir>/<filename>`, replacing any previous
/// file of that name.
pub async fn save_summary(
    markdown: &str,
    filename: &str,
    total_pages: usize,
    upload: &UploadedDocument,
    output_dir: &Path,
) -> Result<ParseSummary, ApiError> {
    tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
        ApiError::io(
            format!("Failed to create output directory '{}'", output_dir.display()),
            e,
        )
    })?;

    let saved_path = output_dir.join(filename);
    tokio::fs::write(&saved_path, markdown).await.map_err(|e| {
        ApiError::io(format!("Failed to write '{}'", saved_path.display()), e)
    })?;
    info!(
        "Saved {} pages of '{}' to {}",
        total_pages,
        upload.filename,
        saved_path.display()
    );

    Ok(ParseSummary {
        message: format!("Successfully parsed {}", upload.filename),
        saved_path: saved_path.display().to_string(),
        total_pages,
        original_filename: upload.filename.clone(),
        file_type: upload.kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn upload(name: &str, kind: FileKind) -> UploadedDocument {
        UploadedDocument {
            filename: name.to_string(),
            kind,
            path: PathBuf::from("/unused"),
            size: 0,
        }
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn download_streams_and_removes_file() {
        let temp = tempfile::tempdir().unwrap();
        let response = download_response("# hi\n", "report.md", temp.path())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            MARKDOWN_CONTENT_TYPE
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.md\""
        );
        assert_eq!(entries(temp.path()), 1);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"# hi\n");
        assert_eq!(entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn dropped_download_removes_file() {
        let temp = tempfile::tempdir().unwrap();
        let response = download_response("x", "a.md", temp.path()).await.unwrap();
        drop(response);
        assert_eq!(entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn summary_creates_directory_and_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("nested").join("output");
        let doc = upload("scan.png", FileKind::Image);

        let first = save_summary("one", "scan.md", 1, &doc, &out).await.unwrap();
        let second = save_summary("two", "scan.md", 2, &doc, &out).await.unwrap();

        assert_eq!(first.saved_path, second.saved_path);
        assert_eq!(std::fs::read_to_string(out.join("scan.md")).unwrap(), "two");
        assert_eq!(second.total_pages, 2);

        let json = serde_json::to_value(&second).unwrap();
        assert_eq!(json["file_type"], "image");
        assert_eq!(json["original_filename"], "scan.png");
    }

    #[tokio::test]
    async fn deliver_uses_configured_mode() {
        let root = tempfile::tempdir().unwrap();
        let config = ServerConfig::builder()
            .output_mode(OutputMode::Summary)
            .output_dir(root.path())
            .build();
        let doc = upload("paper.PDF", FileKind::Pdf);

        let response = deliver("md".into(), 3, &doc, &config).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(root.path().join("paper.md").exists());
    }

    #[test]
    fn disposition_for_non_ascii_name() {
        assert_eq!(
            content_disposition("résumé.md"),
            "attachment; filename=\"r_sum_.md\"; filename*=UTF-8''r%C3%A9sum%C3%A9.md"
        );
        assert_eq!(
            content_disposition("a\"b.md"),
            "attachment; filename=\"a_b.md\"; filename*=UTF-8''a%22b.md"
        );
    }
}
