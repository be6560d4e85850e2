//! Validation of the image payloads served by the device.
//!
//! Payloads are decoded with the `image` crate. The one exception is a
//! bitmap from an RGB565 sensor: the device puts raw 16-bit pixels behind a
//! 24-bit header, which no decoder accepts, so only its header is checked.

use anyhow::{bail, ensure, Context, Result};
use camdemo_core::bitmap::BITMAP_HEADER_SIZE;
use camdemo_core::RouteKind;
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat};
use serde::Serialize;

fn decode(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage> {
    image::load_from_memory_with_format(bytes, format)
        .with_context(|| format!("invalid {:?} image ({} bytes)", format, bytes.len()))
}

/// Decode a `P5` graymap with 8-bit samples.
pub fn parse_pgm(bytes: &[u8]) -> Result<GrayImage> {
    ensure!(bytes.starts_with(b"P5"), "not a binary PGM (missing P5 magic)");

    match decode(bytes, ImageFormat::Pnm)? {
        DynamicImage::ImageLuma8(image) => Ok(image),
        other => bail!("PGM decoded as {:?}, expected 8-bit gray", other.color()),
    }
}

/// Fields of the 54-byte BMP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapInfo {
    pub file_size: u32,
    pub pixel_offset: u32,
    pub width: i32,
    pub height: i32,
    pub bits_per_pixel: u16,
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

pub fn parse_bitmap_header(bytes: &[u8]) -> Result<BitmapInfo> {
    ensure!(
        bytes.len() >= BITMAP_HEADER_SIZE,
        "BMP shorter than its header ({} bytes)",
        bytes.len()
    );
    ensure!(&bytes[0..2] == b"BM", "missing BM magic");

    Ok(BitmapInfo {
        file_size: le_u32(bytes, 2),
        pixel_offset: le_u32(bytes, 10),
        width: le_u32(bytes, 18) as i32,
        height: le_u32(bytes, 22) as i32,
        bits_per_pixel: u16::from_le_bytes([bytes[28], bytes[29]]),
    })
}

/// Size of a 16-bit pixel body for the header's dimensions.
fn raw16_len(info: &BitmapInfo) -> Option<usize> {
    let width = usize::try_from(info.width.unsigned_abs()).ok()?;
    let height = usize::try_from(info.height.unsigned_abs()).ok()?;
    width.checked_mul(height)?.checked_mul(2)
}

/// What a downloaded frame turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub bytes: usize,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    fn decoded(bytes: &[u8], image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            bytes: bytes.len(),
            width,
            height,
        }
    }
}

fn validate_bitmap(bytes: &[u8]) -> Result<ImageInfo> {
    let info = parse_bitmap_header(bytes)?;
    ensure!(
        info.pixel_offset as usize == BITMAP_HEADER_SIZE,
        "unexpected BMP pixel offset {}",
        info.pixel_offset
    );

    if info.file_size as usize == bytes.len() {
        let image = decode(bytes, ImageFormat::Bmp)?;
        return Ok(ImageInfo::decoded(bytes, &image));
    }

    let body = raw16_len(&info).context("BMP dimensions overflow")?;
    ensure!(
        BITMAP_HEADER_SIZE.checked_add(body) == Some(bytes.len()),
        "BMP declares {} bytes but carries {}",
        info.file_size,
        bytes.len()
    );
    log::warn!("BMP carries 16-bit pixels behind a 24-bit header, not decoded");

    Ok(ImageInfo {
        bytes: bytes.len(),
        width: info.width.unsigned_abs(),
        height: info.height.unsigned_abs(),
    })
}

/// Check a payload against the format its route promises.
pub fn validate(kind: RouteKind, bytes: &[u8]) -> Result<ImageInfo> {
    match kind {
        RouteKind::Pgm => {
            let image = parse_pgm(bytes)?;
            Ok(ImageInfo {
                bytes: bytes.len(),
                width: image.width(),
                height: image.height(),
            })
        }
        RouteKind::Bmp | RouteKind::BmpStream => validate_bitmap(bytes),
        RouteKind::Jpg | RouteKind::JpgStream => {
            let image = decode(bytes, ImageFormat::Jpeg)?;
            Ok(ImageInfo::decoded(bytes, &image))
        }
    }
}

pub fn extension(kind: RouteKind) -> &'static str {
    match kind {
        RouteKind::Pgm => "pgm",
        RouteKind::Bmp | RouteKind::BmpStream => "bmp",
        RouteKind::Jpg | RouteKind::JpgStream => "jpg",
    }
}
