//! Format normalisation: turn an uploaded image into a single-page PDF.
//!
//! The vision parser only understands PDFs, so images are wrapped in a
//! one-page document whose page is exactly the image. JPEG data is embedded
//! verbatim (`/DCTDecode`), so no generation loss is introduced; RGB PNG
//! samples are embedded flate-compressed. Images in any other colour type
//! (grayscale, alpha, 16-bit …) are first re-encoded to an RGB JPEG next to the
//! upload; that intermediate file lives only for the duration of the
//! conversion.
//!
//! Decoding and PDF assembly are CPU-bound and run on the blocking pool.

use crate::error::ApiError;
use crate::pipeline::input::FileKind;
use crate::scratch::{remove_quietly, Scratch};
use image::metadata::Orientation;
use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbImage};
use lopdf::{dictionary, Document, Object, Stream};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to the upload path for the synthesized PDF.
pub const PDF_SUFFIX: &str = ".pdf";

/// Suffix appended to the upload path for the intermediate RGB JPEG.
pub const RGB_SUFFIX: &str = "_rgb.jpg";

/// Resolution assumed for images without usable density information.
const DEFAULT_DPI: f32 = 96.0;

/// The document handed to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub path: PathBuf,
    /// `true` when `path` is a new file synthesized from an image.
    pub converted: bool,
}

/// Normalise an upload to PDF.
///
/// PDFs pass through untouched. Images are converted to `<path>.pdf`, which is
/// registered with `scratch` before it is written.
pub async fn normalize(
    path: &Path,
    kind: FileKind,
    scratch: &Scratch,
) -> Result<NormalizedDocument, ApiError> {
    if !kind.is_image() {
        return Ok(NormalizedDocument {
            path: path.to_path_buf(),
            converted: false,
        });
    }

    let pdf_path = with_suffix(path, PDF_SUFFIX);
    scratch.register(&pdf_path);

    let src = path.to_path_buf();
    let dst = pdf_path.clone();
    let guard = scratch.clone();
    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        image_to_pdf(&src, &dst)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Normalisation task panicked: {e}")))??;

    Ok(NormalizedDocument {
        path: pdf_path,
        converted: true,
    })
}

/// Blocking image → PDF conversion.
pub fn image_to_pdf(src: &Path, dst: &Path) -> Result<(), ApiError> {
    let reader = ImageReader::open(src)
        .map_err(|e| ApiError::io(format!("Failed to open image '{}'", src.display()), e))?
        .with_guessed_format()
        .map_err(|e| ApiError::io(format!("Failed to read image '{}'", src.display()), e))?;
    let format = reader.format();

    let mut decoder = reader.into_decoder().map_err(conversion_error)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let img = DynamicImage::from_decoder(decoder).map_err(conversion_error)?;
    let (width, height) = (img.width(), img.height());
    debug!(
        "Decoded {} ({}x{}, {:?}, {:?})",
        src.display(),
        width,
        height,
        img.color(),
        orientation
    );

    // Dropped at the end of this function, whatever the outcome.
    let intermediate = Scratch::new();

    // Only three-component baseline data can be embedded as DeviceRGB; CMYK
    // and YCCK JPEGs are decoded to RGB by `image` and re-embedded as samples.
    let verbatim_jpeg = if img.color() == ColorType::Rgb8 && format == Some(ImageFormat::Jpeg) {
        let data = std::fs::read(src)
            .map_err(|e| ApiError::io(format!("Failed to read image '{}'", src.display()), e))?;
        (jpeg_components(&data) == Some(3)).then_some(data)
    } else {
        None
    };

    let samples = match verbatim_jpeg {
        Some(jpeg) => PageSamples::Jpeg(jpeg),
        None if img.color() == ColorType::Rgb8 => PageSamples::Rgb(img.into_rgb8()),
        None => {
            let rgb_path = with_suffix(src, RGB_SUFFIX);
            intermediate.register(&rgb_path);
            DynamicImage::ImageRgb8(img.to_rgb8())
                .save_with_format(&rgb_path, ImageFormat::Jpeg)
                .map_err(conversion_error)?;
            debug!("Re-encoded {:?} image to RGB at {}", img.color(), rgb_path.display());
            let jpeg = std::fs::read(&rgb_path)
                .map_err(|e| ApiError::io("Failed to read intermediate RGB image", e))?;
            PageSamples::Jpeg(jpeg)
        }
    };

    let bytes = build_pdf(width, height, samples, page_rotation(orientation)).map_err(|e| {
        ApiError::Conversion {
            detail: format!("PDF assembly failed: {e}"),
        }
    })?;

    if let Err(e) = std::fs::write(dst, &bytes) {
        remove_quietly(dst);
        return Err(ApiError::io(
            format!("Failed to write PDF '{}'", dst.display()),
            e,
        ));
    }

    drop(intermediate);
    info!(
        "Converted image {} → {} ({} bytes)",
        src.display(),
        dst.display(),
        bytes.len()
    );
    Ok(())
}

/// Pixel data for the single page image.
enum PageSamples {
    /// Baseline JPEG stream, embedded as-is.
    Jpeg(Vec<u8>),
    /// 8-bit RGB samples, flate-compressed on embedding.
    Rgb(RgbImage),
}

/// Assemble a one-page PDF showing the image at [`DEFAULT_DPI`].
fn build_pdf(
    width: u32,
    height: u32,
    samples: PageSamples,
    rotate: Option<i64>,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    let image_stream = match samples {
        PageSamples::Jpeg(data) => {
            image_dict.set("Filter", "DCTDecode");
            Stream::new(image_dict, data).with_compression(false)
        }
        PageSamples::Rgb(rgb) => {
            let mut stream = Stream::new(image_dict, rgb.into_raw());
            stream.compress()?;
            stream.with_compression(false)
        }
    };
    let image_id = doc.add_object(image_stream);

    let page_w = width as f32 * 72.0 / DEFAULT_DPI;
    let page_h = height as f32 * 72.0 / DEFAULT_DPI;
    let content = format!("q\n{page_w:.4} 0 0 {page_h:.4} 0 0 cm\n/Im0 Do\nQ\n");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    let mut page = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    };
    if let Some(degrees) = rotate {
        page.set("Rotate", degrees);
    }
    let page_id = doc.add_object(page);

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}

/// Page `/Rotate` for an EXIF orientation. Mirrored orientations have no PDF
/// equivalent and are ignored.
fn page_rotation(orientation: Orientation) -> Option<i64> {
    match orientation {
        Orientation::Rotate90 => Some(90),
        Orientation::Rotate180 => Some(180),
        Orientation::Rotate270 => Some(270),
        _ => None,
    }
}

/// Component count from the first frame header of a JPEG stream.
fn jpeg_components(data: &[u8]) -> Option<u8> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut i = 2;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        if marker == 0xFF {
            i += 1;
            continue;
        }
        // SOFn, excluding DHT (C4), JPG (C8) and DAC (CC).
        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            return data.get(i + 9).copied();
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + len;
    }
    None
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

fn conversion_error(e: image::ImageError) -> ApiError {
    ApiError::Conversion {
        detail: e.to_string(),
    }
}
