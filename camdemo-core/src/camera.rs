/// Pixel layout of the frames a sensor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PixelFormat {
    Grayscale,
    Rgb565,
    Jpeg,
    /// Anything the demo does not serve (YUV422, RGB888, raw).
    Other,
}

impl PixelFormat {
    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Grayscale => "grayscale",
            PixelFormat::Rgb565 => "rgb565",
            PixelFormat::Jpeg => "jpeg",
            PixelFormat::Other => "other",
        }
    }
}

/// One captured image borrowed from the camera driver.
///
/// Dropping the frame hands the buffer back to the driver, so every
/// acquired frame is released exactly once.
pub trait Frame {
    fn data(&self) -> &[u8];

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn format(&self) -> PixelFormat;

    fn len(&self) -> usize {
        self.data().len()
    }

    fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

/// Source of frames (the camera driver).
pub trait Camera {
    type Frame<'a>: Frame
    where
        Self: 'a;

    /// Grab the next frame, `None` when the capture failed.
    fn acquire(&self) -> Option<Self::Frame<'_>>;

    /// Pixel format the sensor is currently configured for.
    fn sensor_format(&self) -> PixelFormat;
}
