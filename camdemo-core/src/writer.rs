use crate::camera::Frame;

/// Number of grayscale samples expanded per write.
pub const STAGING_SAMPLES: usize = 512;

/// Staging buffer size in bytes (three channels per sample).
pub const STAGING_LEN: usize = STAGING_SAMPLES * 3;

/// One in-flight HTTP response.
///
/// `begin` must be called once before any body write; `end` finishes the
/// response. A multipart body opens with `open_multipart`, then each part
/// is framed with `begin_multipart` / `end_multipart`.
pub trait Response {
    type Error: core::fmt::Debug;

    /// Start the response. `content_length` is `None` when the total size
    /// is unknown (streams).
    fn begin(
        &mut self,
        status: u16,
        content_type: &str,
        content_length: Option<usize>,
    ) -> Result<(), Self::Error>;

    /// Add a header after `begin`, before the first body byte.
    fn set_header(&mut self, name: &str, value: &str) -> Result<(), Self::Error>;

    fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error>;

    /// Write the delimiter that precedes the first part.
    fn open_multipart(&mut self, boundary: &str) -> Result<(), Self::Error>;

    fn begin_multipart(
        &mut self,
        content_type: &str,
        content_length: usize,
    ) -> Result<(), Self::Error>;

    fn end_multipart(&mut self, boundary: &str) -> Result<(), Self::Error>;

    fn end(&mut self) -> Result<(), Self::Error>;
}

/// Write the frame bytes verbatim (RGB565 as opaque bytes, JPEG).
pub fn write_frame<R, F>(response: &mut R, frame: &F) -> Result<(), R::Error>
where
    R: Response + ?Sized,
    F: Frame + ?Sized,
{
    response.write(frame.data())
}

/// Write a grayscale frame as 24-bit RGB, every sample repeated three times.
///
/// Goes through a fixed staging buffer so peak memory does not scale with
/// the frame size. Stops at the first failed write.
pub fn write_gray_frame<R, F>(response: &mut R, frame: &F) -> Result<(), R::Error>
where
    R: Response + ?Sized,
    F: Frame + ?Sized,
{
    let mut staging = [0u8; STAGING_LEN];

    for samples in frame.data().chunks(STAGING_SAMPLES) {
        let len = expand_gray(samples, &mut staging);
        response.write(&staging[..len])?;
    }

    Ok(())
}

/// Expand grayscale samples into RGB triples, returning the bytes written.
///
/// `out` must hold at least `3 * samples.len()` bytes.
pub fn expand_gray(samples: &[u8], out: &mut [u8]) -> usize {
    let len = samples.len() * 3;
    for (rgb, &sample) in out[..len].chunks_exact_mut(3).zip(samples) {
        rgb.fill(sample);
    }
    len
}

/// Body size of a frame once written in the BMP format for `sensor`.
pub fn bmp_body_len<F: Frame + ?Sized>(frame: &F, sensor: crate::PixelFormat) -> usize {
    if sensor == crate::PixelFormat::Grayscale {
        frame.len() * 3
    } else {
        frame.len()
    }
}
