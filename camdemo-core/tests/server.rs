mod common;

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use camdemo_core::http::start_server;
use camdemo_core::routes::STREAM_BOUNDARY;
use camdemo_core::{PixelFormat, BITMAP_HEADER_SIZE};
use common::{gray_pattern, Event, MockCamera};

fn spawn_server(camera: Arc<MockCamera>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    thread::spawn(move || start_server(listener, &*camera));

    addr
}

/// Send one request and read until the server closes the connection.
fn request(addr: &str, method: &str, path: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    write!(stream, "{} {} HTTP/1.1\r\nHost: camera\r\n\r\n", method, path).unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).unwrap();
    raw
}

fn split_head(raw: &[u8]) -> (String, &[u8]) {
    let end = raw.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    (String::from_utf8(raw[..end].to_vec()).unwrap(), &raw[end..])
}

#[test]
fn test_serves_grayscale_routes() {
    let camera = Arc::new(MockCamera::new(PixelFormat::Grayscale));
    let addr = spawn_server(camera.clone());

    camera.push_frame(160, 120, gray_pattern(19200));
    let raw = request(&addr, "GET", "/pgm");
    let (head, body) = split_head(&raw);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: image/x-portable-graymap\r\n"));
    assert!(head.contains("Content-Length: 19215\r\n"));
    assert_eq!(body.len(), 19215);
    assert!(body.starts_with(b"P5 160 120 255\n"));

    camera.push_frame(160, 120, gray_pattern(19200));
    let raw = request(&addr, "GET", "/bmp");
    let (head, body) = split_head(&raw);
    assert!(head.contains("Content-Type: image/bmp\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", BITMAP_HEADER_SIZE + 57600)));
    assert_eq!(body.len(), BITMAP_HEADER_SIZE + 57600);
    assert_eq!(&body[..2], b"BM");

    assert_eq!(camera.count(|e| matches!(e, Event::Released(_))), 2);
}

#[test]
fn test_unregistered_and_wrong_method() {
    let camera = Arc::new(MockCamera::new(PixelFormat::Grayscale));
    let addr = spawn_server(camera.clone());

    let raw = request(&addr, "GET", "/jpg");
    assert!(raw.starts_with(b"HTTP/1.1 404 Not Found\r\n"));

    let raw = request(&addr, "POST", "/pgm");
    assert!(raw.starts_with(b"HTTP/1.1 405 Method Not Allowed\r\n"));

    assert!(camera.events().is_empty());
}

#[test]
fn test_capture_failure_closes_without_response() {
    let camera = Arc::new(MockCamera::new(PixelFormat::Jpeg));
    let addr = spawn_server(camera.clone());

    let raw = request(&addr, "GET", "/jpg");
    assert!(raw.is_empty());
}

#[test]
fn test_jpg_stream_over_tcp() {
    let camera = Arc::new(MockCamera::new(PixelFormat::Jpeg));
    let addr = spawn_server(camera.clone());

    for i in 0..2u8 {
        camera.push_frame(320, 240, vec![0xFF, 0xD8, i, 0xFF, 0xD9]);
    }

    let raw = request(&addr, "GET", "/jpg_stream");
    let (head, body) = split_head(&raw);
    assert!(head.contains(
        "Content-Type: multipart/x-mixed-replace; boundary=123456789000000000000987654321\r\n"
    ));
    assert!(!head.contains("Content-Length"));

    // Opening delimiter, so a strict multipart parser keeps the first part
    let mut expected = format!("{}\r\n", STREAM_BOUNDARY).into_bytes();
    for i in 0..2u8 {
        expected.extend_from_slice(b"Content-Type: image/jpg\r\nContent-Length: 5\r\n\r\n");
        expected.extend_from_slice(&[0xFF, 0xD8, i, 0xFF, 0xD9]);
        expected.extend_from_slice(format!("\r\n{}\r\n", STREAM_BOUNDARY).as_bytes());
    }
    assert_eq!(body, expected.as_slice());
    assert_eq!(camera.count(|e| matches!(e, Event::Released(_))), 2);
}
