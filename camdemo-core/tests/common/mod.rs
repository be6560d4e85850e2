#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use camdemo_core::{Camera, Frame, PixelFormat, Response};

/// Everything the handlers did, in order, including frame releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Acquired(usize),
    Released(usize),
    Begin(u16, String, Option<usize>),
    Header(String, String),
    Write(Vec<u8>),
    OpenParts(String),
    BeginPart(String, usize),
    EndPart(String),
    End,
}

pub type Log = Arc<Mutex<Vec<Event>>>;

pub struct MockFrame {
    id: usize,
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
    log: Log,
}

impl Frame for MockFrame {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }
}

impl Drop for MockFrame {
    fn drop(&mut self) {
        self.log.lock().unwrap().push(Event::Released(self.id));
    }
}

/// Camera that hands out queued frames; an empty queue means capture failure.
pub struct MockCamera {
    format: PixelFormat,
    frame_format: Mutex<Option<PixelFormat>>,
    queue: Mutex<VecDeque<Option<(usize, usize, Vec<u8>)>>>,
    next_id: Mutex<usize>,
    log: Log,
}

impl MockCamera {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            frame_format: Mutex::new(None),
            queue: Mutex::new(VecDeque::new()),
            next_id: Mutex::new(0),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_frame(&self, width: usize, height: usize, data: Vec<u8>) {
        self.queue.lock().unwrap().push_back(Some((width, height, data)));
    }

    /// Make frames report `format` instead of the sensor format.
    pub fn set_frame_format(&self, format: PixelFormat) {
        *self.frame_format.lock().unwrap() = Some(format);
    }

    pub fn push_failure(&self) {
        self.queue.lock().unwrap().push_back(None);
    }

    pub fn log(&self) -> Log {
        self.log.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl Camera for MockCamera {
    type Frame<'a> = MockFrame where Self: 'a;

    fn acquire(&self) -> Option<MockFrame> {
        let (width, height, data) = self.queue.lock().unwrap().pop_front().flatten()?;

        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;

        self.log.lock().unwrap().push(Event::Acquired(id));
        Some(MockFrame {
            id,
            width,
            height,
            format: self.frame_format.lock().unwrap().unwrap_or(self.format),
            data,
            log: self.log.clone(),
        })
    }

    fn sensor_format(&self) -> PixelFormat {
        self.format
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailed;

/// Response that records calls into the shared log and can fail the n-th
/// body write (0-based, counting `write` calls only).
pub struct RecordingResponse {
    log: Log,
    writes: usize,
    fail_write_at: Option<usize>,
}

impl RecordingResponse {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            writes: 0,
            fail_write_at: None,
        }
    }

    pub fn failing_at(log: Log, write: usize) -> Self {
        Self {
            fail_write_at: Some(write),
            ..Self::new(log)
        }
    }

    fn push(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

impl Response for RecordingResponse {
    type Error = WriteFailed;

    fn begin(
        &mut self,
        status: u16,
        content_type: &str,
        content_length: Option<usize>,
    ) -> Result<(), WriteFailed> {
        self.push(Event::Begin(status, content_type.to_string(), content_length));
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), WriteFailed> {
        self.push(Event::Header(name.to_string(), value.to_string()));
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), WriteFailed> {
        let index = self.writes;
        self.writes += 1;
        if self.fail_write_at == Some(index) {
            return Err(WriteFailed);
        }
        self.push(Event::Write(chunk.to_vec()));
        Ok(())
    }

    fn open_multipart(&mut self, boundary: &str) -> Result<(), WriteFailed> {
        self.push(Event::OpenParts(boundary.to_string()));
        Ok(())
    }

    fn begin_multipart(&mut self, content_type: &str, content_length: usize) -> Result<(), WriteFailed> {
        self.push(Event::BeginPart(content_type.to_string(), content_length));
        Ok(())
    }

    fn end_multipart(&mut self, boundary: &str) -> Result<(), WriteFailed> {
        self.push(Event::EndPart(boundary.to_string()));
        Ok(())
    }

    fn end(&mut self) -> Result<(), WriteFailed> {
        self.push(Event::End);
        Ok(())
    }
}

/// Concatenation of every recorded body write.
pub fn body(events: &[Event]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Write(bytes) => Some(bytes.as_slice()),
            _ => None,
        })
        .flatten()
        .copied()
        .collect()
}

/// Deterministic grayscale test pattern.
pub fn gray_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}
