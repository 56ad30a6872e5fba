use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;

use crate::camera::RawFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StillFormat {
    Jpeg,
    Png,
}

impl StillFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            StillFormat::Jpeg => "jpg",
            StillFormat::Png => "png",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            StillFormat::Jpeg => "image/jpeg",
            StillFormat::Png => "image/png",
        }
    }
}

/// One captured still: encoded bytes, format tag and the challenge label
/// active at capture time. Immutable once created; the byte buffer is shared
/// so the gallery and a detached dispatch task never copy it.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    bytes: Arc<Vec<u8>>,
    format: StillFormat,
    label: String,
}

impl EncodedFrame {
    pub fn new(bytes: Vec<u8>, format: StillFormat, label: impl Into<String>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            format,
            label: label.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> StillFormat {
        self.format
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Rasterize one raw video frame into a still image.
///
/// The mirror transform must match the live preview: a mirrored preview with
/// an un-mirrored capture is a defect. Runs on the caller's thread; the
/// capture loop wraps it in `spawn_blocking`.
pub fn encode_frame(
    raw: &RawFrame,
    format: StillFormat,
    jpeg_quality: u8,
    mirror: bool,
    label: &str,
) -> Result<EncodedFrame> {
    let buffer = RgbaImage::from_raw(raw.width, raw.height, raw.pixels.clone())
        .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", raw.width, raw.height))?;

    let mut img = DynamicImage::ImageRgba8(buffer);
    if mirror {
        img = img.fliph();
    }

    let mut out = Cursor::new(Vec::new());
    match format {
        StillFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut out, jpeg_quality);
            rgb.write_with_encoder(encoder)
                .context("jpeg encode failed")?;
        }
        StillFormat::Png => {
            img.write_to(&mut out, ImageFormat::Png)
                .context("png encode failed")?;
        }
    }

    Ok(EncodedFrame::new(out.into_inner(), format, label))
}
