//! 24-bit uncompressed BMP header.

/// Size of the serialized header: 14-byte file header plus 40-byte
/// BITMAPINFOHEADER.
pub const BITMAP_HEADER_SIZE: usize = 54;

const DIB_HEADER_SIZE: u32 = 40;
const BITS_PER_PIXEL: u16 = 24;
const BYTES_PER_PIXEL: u32 = 3;
/// 72 DPI.
const PIXELS_PER_METER: u32 = 2835;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub file_size: u32,
    pub pixel_offset: u32,
    pub width: i32,
    pub height: i32,
    pub bits_per_pixel: u16,
    pub image_size: u32,
}

impl BitmapHeader {
    /// Header for a `width` x `height` RGB image stored bottom-up.
    /// Dimensions and sizes saturate at the field maximum.
    pub fn new(width: usize, height: usize) -> Self {
        let image_size = saturate_u32(width)
            .saturating_mul(saturate_u32(height))
            .saturating_mul(BYTES_PER_PIXEL);

        Self {
            file_size: image_size.saturating_add(BITMAP_HEADER_SIZE as u32),
            pixel_offset: BITMAP_HEADER_SIZE as u32,
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
            bits_per_pixel: BITS_PER_PIXEL,
            image_size,
        }
    }

    pub fn to_bytes(&self) -> [u8; BITMAP_HEADER_SIZE] {
        let mut out = [0u8; BITMAP_HEADER_SIZE];

        out[0..2].copy_from_slice(b"BM");
        out[2..6].copy_from_slice(&self.file_size.to_le_bytes());
        // 6..10 reserved
        out[10..14].copy_from_slice(&self.pixel_offset.to_le_bytes());
        out[14..18].copy_from_slice(&DIB_HEADER_SIZE.to_le_bytes());
        out[18..22].copy_from_slice(&self.width.to_le_bytes());
        out[22..26].copy_from_slice(&self.height.to_le_bytes());
        out[26..28].copy_from_slice(&1u16.to_le_bytes());
        out[28..30].copy_from_slice(&self.bits_per_pixel.to_le_bytes());
        // 30..34 compression = BI_RGB
        out[34..38].copy_from_slice(&self.image_size.to_le_bytes());
        out[38..42].copy_from_slice(&PIXELS_PER_METER.to_le_bytes());
        out[42..46].copy_from_slice(&PIXELS_PER_METER.to_le_bytes());
        // 46..54 palette size and important colors

        out
    }
}

fn saturate_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
