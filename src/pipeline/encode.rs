//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! Vision APIs accept images as base64 data embedded in the JSON request
//! body. PNG keeps fabric texture and printed labels free of JPEG artefacts.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a product image as a base64 PNG ready for the vision API.
///
/// `detail: "high"` lets GPT-4-class models tile the image instead of
/// reading a single 512 px overview, which loses small print on swing tags.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} image → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// True when both sides reach `min_px`.
pub fn is_large_enough(img: &DynamicImage, min_px: u32) -> bool {
    img.width() >= min_px && img.height() >= min_px
}
