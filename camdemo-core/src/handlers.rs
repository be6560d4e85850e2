//! Per-route request handlers.
//!
//! Every handler follows the same pattern: acquire a frame, optionally
//! write a header, write the body, end the response, release the frame.
//! Frames are released by dropping them; a handler never holds more than
//! one frame at a time.

use core::fmt;

use log::{debug, error};

use crate::bitmap::{BitmapHeader, BITMAP_HEADER_SIZE};
use crate::camera::{Camera, Frame, PixelFormat};
use crate::pgm::pgm_header;
use crate::routes::{
    RouteKind, BMP_CONTENT_TYPE, BMP_PART_CONTENT_TYPE, JPEG_CONTENT_TYPE,
    JPEG_PART_CONTENT_TYPE, PGM_CONTENT_TYPE, STREAM_BOUNDARY, STREAM_CONTENT_TYPE,
};
use crate::writer::{bmp_body_len, write_frame, write_gray_frame, Response};

#[derive(Debug, PartialEq, Eq)]
pub enum HandlerError<E> {
    /// The camera returned no frame. For single-shot routes the response
    /// was never started.
    Capture,
    Response(E),
}

impl<E> From<E> for HandlerError<E> {
    fn from(err: E) -> Self {
        HandlerError::Response(err)
    }
}

impl<E: fmt::Debug> fmt::Display for HandlerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Capture => write!(f, "camera capture failed"),
            HandlerError::Response(err) => write!(f, "response write failed: {:?}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for HandlerError<E> {}

/// How a multipart stream ended.
#[derive(Debug, PartialEq, Eq)]
pub struct StreamOutcome<E> {
    /// Parts fully written before the stream stopped.
    pub parts: usize,
    pub stopped_by: HandlerError<E>,
}

fn acquire<C: Camera, E>(camera: &C) -> Result<C::Frame<'_>, HandlerError<E>> {
    camera.acquire().ok_or_else(|| {
        error!("Camera capture failed");
        HandlerError::Capture
    })
}

/// Finish a single-shot response and hand the frame back, in that order.
/// The first error wins.
fn finish<R, F>(response: &mut R, frame: F, sent: Result<(), R::Error>) -> Result<(), HandlerError<R::Error>>
where
    R: Response + ?Sized,
    F: Frame,
{
    let ended = response.end();
    drop(frame);
    sent.and(ended).map_err(HandlerError::Response)
}

/// `GET /pgm`: the raw grayscale frame behind a `P5` header.
pub fn handle_pgm<C, R>(camera: &C, response: &mut R) -> Result<(), HandlerError<R::Error>>
where
    C: Camera,
    R: Response + ?Sized,
{
    let frame = acquire(camera)?;
    let header = pgm_header(frame.width(), frame.height());

    let sent = (|| -> Result<(), R::Error> {
        response.begin(200, PGM_CONTENT_TYPE, Some(header.len() + frame.len()))?;
        response.set_header("Content-Disposition", "inline; filename=capture.pgm")?;
        response.write(header.as_bytes())?;
        write_frame(response, &frame)
    })();

    finish(response, frame, sent)
}

/// `GET /bmp`: a 24-bit bitmap. Grayscale frames are expanded to RGB,
/// anything else is sent as captured.
pub fn handle_bmp<C, R>(camera: &C, response: &mut R) -> Result<(), HandlerError<R::Error>>
where
    C: Camera,
    R: Response + ?Sized,
{
    let frame = acquire(camera)?;
    let sensor = camera.sensor_format();
    let header = BitmapHeader::new(frame.width(), frame.height()).to_bytes();
    let len = BITMAP_HEADER_SIZE + bmp_body_len(&frame, sensor);

    let sent = (|| -> Result<(), R::Error> {
        response.begin(200, BMP_CONTENT_TYPE, Some(len))?;
        response.set_header("Content-Disposition", "inline; filename=capture.bmp")?;
        response.write(&header)?;
        write_bmp_body(response, &frame, sensor)
    })();

    finish(response, frame, sent)
}

/// `GET /jpg`: the JPEG frame as captured.
pub fn handle_jpg<C, R>(camera: &C, response: &mut R) -> Result<(), HandlerError<R::Error>>
where
    C: Camera,
    R: Response + ?Sized,
{
    let frame = acquire(camera)?;

    let sent = (|| -> Result<(), R::Error> {
        response.begin(200, JPEG_CONTENT_TYPE, Some(frame.len()))?;
        response.set_header("Content-Disposition", "inline; filename=capture.jpg")?;
        write_frame(response, &frame)
    })();

    finish(response, frame, sent)
}

fn write_bmp_body<R, F>(response: &mut R, frame: &F, sensor: PixelFormat) -> Result<(), R::Error>
where
    R: Response + ?Sized,
    F: Frame,
{
    // Expansion follows the sensor setting, whatever the frame reports
    if frame.format() != sensor {
        debug!(
            "Frame reports {} but the sensor is set to {}",
            frame.format().name(),
            sensor.name()
        );
    }

    if sensor == PixelFormat::Grayscale {
        write_gray_frame(response, frame)
    } else {
        write_frame(response, frame)
    }
}

/// Part layout of a multipart stream.
#[derive(Debug, Clone, Copy)]
enum StreamPart {
    Bmp(PixelFormat),
    Jpg,
}

impl StreamPart {
    fn name(&self) -> &'static str {
        match self {
            StreamPart::Bmp(_) => "BMP",
            StreamPart::Jpg => "JPEG",
        }
    }

    /// Write one complete part (begin, payload, end) for `frame`.
    fn emit<R, F>(&self, response: &mut R, frame: &F) -> Result<(), R::Error>
    where
        R: Response + ?Sized,
        F: Frame,
    {
        match *self {
            StreamPart::Bmp(sensor) => {
                let header = BitmapHeader::new(frame.width(), frame.height()).to_bytes();
                let len = BITMAP_HEADER_SIZE + bmp_body_len(frame, sensor);

                response.begin_multipart(BMP_PART_CONTENT_TYPE, len)?;
                response.write(&header)?;
                write_bmp_body(response, frame, sensor)?;
            }
            StreamPart::Jpg => {
                response.begin_multipart(JPEG_PART_CONTENT_TYPE, frame.len())?;
                write_frame(response, frame)?;
            }
        }
        response.end_multipart(STREAM_BOUNDARY)
    }
}

/// Drive a multipart stream until a capture or write fails.
///
/// The body opens with a delimiter so the first part is not taken for a
/// preamble. The frame of each iteration is dropped before the next
/// acquisition.
fn run_stream<C, R>(
    camera: &C,
    response: &mut R,
    part: StreamPart,
) -> Result<StreamOutcome<R::Error>, HandlerError<R::Error>>
where
    C: Camera,
    R: Response + ?Sized,
{
    response.begin(200, STREAM_CONTENT_TYPE, None)?;
    response.open_multipart(STREAM_BOUNDARY)?;

    let mut parts = 0;
    let stopped_by = loop {
        let frame = match acquire(camera) {
            Ok(frame) => frame,
            Err(err) => break err,
        };

        let sent = part.emit(response, &frame);
        drop(frame);

        if let Err(err) = sent {
            break HandlerError::Response(err);
        }
        parts += 1;
    };

    debug!("{} stream stopped after {} parts: {}", part.name(), parts, stopped_by);

    if let Err(err) = response.end() {
        debug!("{} stream end failed: {:?}", part.name(), err);
    }

    Ok(StreamOutcome { parts, stopped_by })
}

/// `GET /bmp_stream`: a multipart stream of bitmaps, one fresh frame per part.
pub fn stream_bmp<C, R>(
    camera: &C,
    response: &mut R,
) -> Result<StreamOutcome<R::Error>, HandlerError<R::Error>>
where
    C: Camera,
    R: Response + ?Sized,
{
    run_stream(camera, response, StreamPart::Bmp(camera.sensor_format()))
}

/// `GET /jpg_stream`: a multipart stream of JPEG frames.
pub fn stream_jpg<C, R>(
    camera: &C,
    response: &mut R,
) -> Result<StreamOutcome<R::Error>, HandlerError<R::Error>>
where
    C: Camera,
    R: Response + ?Sized,
{
    run_stream(camera, response, StreamPart::Jpg)
}

/// Run the handler registered for `kind`.
///
/// Streams only fail here when the response could not be opened; their
/// normal end (client gone, capture failure) is reported as `Ok`.
pub fn dispatch<C, R>(kind: RouteKind, camera: &C, response: &mut R) -> Result<(), HandlerError<R::Error>>
where
    C: Camera,
    R: Response + ?Sized,
{
    match kind {
        RouteKind::Pgm => handle_pgm(camera, response),
        RouteKind::Bmp => handle_bmp(camera, response),
        RouteKind::Jpg => handle_jpg(camera, response),
        RouteKind::BmpStream => stream_bmp(camera, response).map(|_| ()),
        RouteKind::JpgStream => stream_jpg(camera, response).map(|_| ()),
    }
}
