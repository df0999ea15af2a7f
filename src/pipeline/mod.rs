//! Pipeline stages for upload-to-Markdown conversion.
//!
//! Each submodule implements one step, so each is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ [render ──▶ encode ──▶ llm ──▶ postprocess] ──▶ assemble ──▶ deliver
//! (upload)  (image→PDF)    └──────────── crate::parser ─────────────┘    (## Page n)  (response)
//! ```
//!
//! 1. [`input`]     validate the multipart upload and buffer it to a temp file
//! 2. [`normalize`] wrap images in a single-page PDF; runs in `spawn_blocking`
//! 3. [`render`]    rasterise every page with pdfium; runs in `spawn_blocking`
//! 4. [`encode`]    PNG-encode each page for the multimodal request body
//! 5. [`llm`]       one VLM call per page; the only stage with network I/O
//! 6. [`postprocess`] deterministic cleanup of VLM quirks
//! 7. [`assemble`]  join pages under `## Page n` headings
//! 8. [`deliver`]   stream an attachment or persist and summarise

pub mod assemble;
pub mod deliver;
pub mod encode;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod postprocess;
pub mod render;
