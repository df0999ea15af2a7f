//! # pdf2md-api
//!
//! HTTP service that converts uploaded PDFs and images to Markdown using
//! Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Text-layer extractors fail on scans, photos of documents and complex
//! layouts. This service rasterises every page and lets a VLM read it as a
//! human would, returning one Markdown document per upload.
//!
//! ## Request Pipeline
//!
//! ```text
//! POST /parse (multipart "file")
//!  │
//!  ├─ 1. Input      validate extension, buffer to a temp file
//!  ├─ 2. Normalize  image → single-page PDF (PDFs pass through)
//!  ├─ 3. Parse      pdfium render → PNG → VLM, one call per page
//!  ├─ 4. Assemble   "## Page n" sections separated by rules
//!  └─ 5. Deliver    markdown attachment, or saved file + JSON summary
//! ```
//!
//! Temp files are tracked by a per-request [`Scratch`] and removed whatever
//! the outcome, including client disconnects.
//!
//! ## Embedding the router
//!
//! ```rust,no_run
//! use pdf2md_api::{AppState, ParserConfig, ServerConfig, VisionParser};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The default provider reads GEMINI_API_KEY on every parse.
//!     let parser = VisionParser::new(ParserConfig::default());
//!     let state = AppState::new(Arc::new(parser), ServerConfig::default());
//!     pdf2md_api::serve(state).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-api` binary (clap + anyhow + dotenvy + tracing-subscriber) |
//!
//! pdfium is loaded at parse time from `PDFIUM_LIB_PATH`, or from the system
//! library search path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod scratch;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ImageMode, OutputMode, ParserConfig, ParserConfigBuilder, ServerConfig, ServerConfigBuilder,
};
pub use error::{ApiError, ParseError};
pub use parser::{extract, DocumentParser, VisionParser};
pub use pipeline::assemble::assemble;
pub use pipeline::deliver::ParseSummary;
pub use scratch::Scratch;
pub use server::{build_router, serve, AppState};
