//! Error types for the pdf2md-api service.
//!
//! Two error types reflect two layers:
//!
//! * [`ApiError`]: a request failed. Every variant maps to an HTTP
//!   status and is rendered as `{"error": "<message>"}` so clients see the
//!   same shape whatever stage failed.
//!
//! * [`ParseError`]: the vision parser failed. The handler never inspects
//!   it; it is wrapped as [`ApiError::Extraction`] and its message is passed
//!   through unchanged.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

/// Message returned for uploads whose extension is not accepted.
pub const UNSUPPORTED_FILE_MESSAGE: &str = "File must be a PDF or image (jpg, jpeg, png)";

/// All errors a `/parse` request can end with.
#[derive(Debug, Error)]
pub enum ApiError {
    // ── Client errors ─────────────────────────────────────────────────────
    /// The upload was rejected before any resource was allocated.
    #[error("{0}")]
    InvalidInput(String),

    /// The multipart body could not be read. Carries axum's status, so an
    /// oversized body is 413 rather than 400.
    #[error("Failed to read upload: {message}")]
    Multipart { status: StatusCode, message: String },

    // ── Server errors ─────────────────────────────────────────────────────
    /// Image → PDF normalisation failed (corrupt or unsupported image).
    #[error("Failed to convert image to PDF: {detail}")]
    Conversion { detail: String },

    /// The document parser failed; message is the parser's own.
    #[error(transparent)]
    Extraction(#[from] ParseError),

    /// A temporary or output file could not be created, written or read.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ApiError::Io {
            context: context.into(),
            source,
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart { status, .. } => *status,
            ApiError::Conversion { .. }
            | ApiError::Extraction(_)
            | ApiError::Io { .. }
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Failures of the vision parser.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The LLM provider could not be created (unknown name, missing API key …).
    #[error("LLM provider '{provider}' is not configured: {detail}")]
    ProviderNotConfigured { provider: String, detail: String },

    /// No pdfium library could be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumUnavailable(String),

    /// pdfium could not open the document.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A rendered page could not be PNG-encoded.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodingFailed { page: usize, detail: String },

    /// The LLM API call for a page failed. Not retried.
    #[error("{message}")]
    LlmApiError { page: usize, message: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
