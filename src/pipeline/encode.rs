//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! VLM APIs accept images embedded in the JSON request body. PNG is chosen
//! over JPEG because it is lossless; text crispness matters far more than file
//! size for OCR accuracy.
//!
//! [`ImageMode`] decides how the bytes travel: as a `data:` URL (the form
//! Gemini's OpenAI-compatible endpoint and most proxies accept) or as raw
//! base64 with a separate MIME type.

use crate::config::ImageMode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

const PNG_MIME: &str = "image/png";

/// Encode a rasterised page as a PNG attachment for the VLM request.
///
/// `detail: "high"` is set in both modes: OpenAI-style tiling otherwise
/// collapses the page to a single low-resolution tile and fine print is lost.
pub fn encode_page(img: &DynamicImage, mode: ImageMode) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64 ({:?})", b64.len(), mode);

    let inline = ImageData::new(b64, PNG_MIME);
    let data = match mode {
        ImageMode::Base64 => inline,
        ImageMode::Url => ImageData::from_url(inline.to_data_uri()),
    };
    Ok(data.with_detail("high"))
}
