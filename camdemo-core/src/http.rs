//! Minimal blocking HTTP/1.1 server: one connection at a time, one
//! request per connection, GET routes only.

use std::io::{self, BufWriter, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::camera::Camera;
use crate::handlers::{dispatch, HandlerError};
use crate::routes::{routes_for, Route, RouteKind};
use crate::writer::Response;

const REQUEST_BUFFER_LEN: usize = 2048;
const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Start the accept loop on `listener`. Returns only if accepting fails
/// fatally.
pub fn start_server<C: Camera>(listener: TcpListener, camera: &C) -> io::Result<()> {
    let routes = routes_for(camera.sensor_format());
    listener.set_nonblocking(false)?;

    info!("HTTP server listening on {}", listener.local_addr()?);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                // Handle each connection in the same thread (single-threaded server)
                if let Err(e) = handle_client(stream, camera, routes) {
                    error!("Error handling client: {}", e);
                }
            }
            Err(e) => {
                error!("Connection error: {:?}", e);
            }
        }
    }

    Ok(())
}

/// Serve a single request on `stream` using the given route table.
pub fn handle_client<C: Camera>(
    mut stream: TcpStream,
    camera: &C,
    routes: &[Route],
) -> Result<(), HandlerError<io::Error>> {
    stream.set_read_timeout(Some(SOCKET_TIMEOUT))?;
    stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;

    let mut buffer = [0u8; REQUEST_BUFFER_LEN];
    let bytes_read = read_request(&mut stream, &mut buffer)?;

    if bytes_read == 0 {
        return Ok(());
    }

    let Some(request) = HttpRequest::parse(&buffer[..bytes_read]) else {
        warn!("Malformed request");
        return Ok(write_status(&mut stream, 400)?);
    };

    info!("Request: {} {}", request.method, request.path);

    let registered = RouteKind::from_path(request.path)
        .filter(|kind| routes.iter().any(|route| route.kind == *kind));

    match (request.method, registered) {
        ("GET", Some(kind)) => {
            let mut response = HttpResponse::new(BufWriter::new(&stream));
            dispatch(kind, camera, &mut response)
        }
        (_, Some(_)) => Ok(write_status(&mut stream, 405)?),
        (_, None) => Ok(write_status(&mut stream, 404)?),
    }
}

/// Read until the end of the request head or until the buffer is full.
fn read_request(stream: &mut TcpStream, buffer: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buffer.len() {
        let n = stream.read(&mut buffer[total..])?;
        if n == 0 {
            break;
        }
        total += n;
        if buffer[..total].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    Ok(total)
}

fn write_status(stream: &mut TcpStream, status: u16) -> io::Result<()> {
    let body = status_text(status);
    let header = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        status,
        body,
        body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body.as_bytes())?;
    stream.flush()
}

pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Simple HTTP request parser
#[derive(Debug, PartialEq, Eq)]
pub struct HttpRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
}

impl<'a> HttpRequest<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        // Only the request line matters, it must be complete
        let end = data.windows(2).position(|w| w == b"\r\n")?;
        let request_line = std::str::from_utf8(&data[..end]).ok()?;

        let mut parts = request_line.split_whitespace();
        let method = parts.next()?;
        let path = parts.next()?;
        let version = parts.next()?;

        if !version.starts_with("HTTP/1.") {
            return None;
        }

        Some(HttpRequest { method, path })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Status line written, more headers may follow.
    Headers,
    Body,
    Done,
}

/// [`Response`] over any byte sink, framed as HTTP/1.1.
///
/// Responses of unknown length are closed with `Connection: close`; the
/// client sees the end of the body when the socket closes.
pub struct HttpResponse<W: Write> {
    out: W,
    phase: Phase,
}

impl<W: Write> HttpResponse<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            phase: Phase::Idle,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn open_body(&mut self) -> io::Result<()> {
        match self.phase {
            Phase::Headers => {
                self.out.write_all(b"Access-Control-Allow-Origin: *\r\n\r\n")?;
                self.phase = Phase::Body;
                Ok(())
            }
            Phase::Body => Ok(()),
            Phase::Idle => Err(misuse("response not started")),
            Phase::Done => Err(misuse("response already ended")),
        }
    }
}

fn misuse(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

impl<W: Write> Response for HttpResponse<W> {
    type Error = io::Error;

    fn begin(
        &mut self,
        status: u16,
        content_type: &str,
        content_length: Option<usize>,
    ) -> io::Result<()> {
        if self.phase != Phase::Idle {
            return Err(misuse("response already started"));
        }

        write!(
            self.out,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\n",
            status,
            status_text(status),
            content_type
        )?;
        match content_length {
            Some(len) => write!(self.out, "Content-Length: {}\r\nConnection: close\r\n", len)?,
            None => self
                .out
                .write_all(b"Connection: close\r\nCache-Control: no-cache\r\n")?,
        }

        self.phase = Phase::Headers;
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) -> io::Result<()> {
        if self.phase != Phase::Headers {
            return Err(misuse("headers already sent"));
        }
        write!(self.out, "{}: {}\r\n", name, value)
    }

    fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.open_body()?;
        self.out.write_all(chunk)
    }

    fn open_multipart(&mut self, boundary: &str) -> io::Result<()> {
        self.open_body()?;
        write!(self.out, "{}\r\n", boundary)
    }

    fn begin_multipart(&mut self, content_type: &str, content_length: usize) -> io::Result<()> {
        self.open_body()?;
        write!(
            self.out,
            "Content-Type: {}\r\nContent-Length: {}\r\n\r\n",
            content_type, content_length
        )
    }

    fn end_multipart(&mut self, boundary: &str) -> io::Result<()> {
        self.open_body()?;
        write!(self.out, "\r\n{}\r\n", boundary)?;
        // Push every finished part to the client right away
        self.out.flush()
    }

    fn end(&mut self) -> io::Result<()> {
        match self.phase {
            Phase::Idle => return Err(misuse("response not started")),
            Phase::Headers => self.open_body()?,
            Phase::Body => {}
            Phase::Done => return Ok(()),
        }
        self.phase = Phase::Done;
        debug!("Response finished");
        self.out.flush()
    }
}
