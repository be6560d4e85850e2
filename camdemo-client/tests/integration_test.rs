use std::io::Cursor;

use anyhow::Result;
use camdemo_client::formats::parse_pgm;
use camdemo_client::CameraClient;
use camdemo_core::pgm::pgm_header;
use camdemo_core::routes::{STREAM_BOUNDARY, STREAM_CONTENT_TYPE};
use camdemo_core::{BitmapHeader, RouteKind};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// QQVGA grayscale frame as served on /pgm
fn pgm_body() -> Vec<u8> {
    let mut body = pgm_header(160, 120).as_bytes().to_vec();
    body.extend((0..19200).map(|i| (i % 256) as u8));
    body
}

/// Small gray JPEG filled with `value`.
fn jpeg_frame(value: u8) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([value])))
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

/// Multipart body the device writes for a sequence of JPEG frames
fn jpeg_stream_body(count: u8) -> Vec<u8> {
    let mut body = format!("{}\r\n", STREAM_BOUNDARY).into_bytes();
    for i in 0..count {
        let jpeg = jpeg_frame(i * 40);
        body.extend_from_slice(
            format!("Content-Type: image/jpg\r\nContent-Length: {}\r\n\r\n", jpeg.len()).as_bytes(),
        );
        body.extend_from_slice(&jpeg);
        body.extend_from_slice(format!("\r\n{}\r\n", STREAM_BOUNDARY).as_bytes());
    }
    body
}

async fn serve(route: &str, content_type: &str, body: Vec<u8>) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
        .mount(&mock_server)
        .await;
    mock_server
}

#[tokio::test]
async fn test_pgm_snapshot() -> Result<()> {
    let mock_server = serve("/pgm", "image/x-portable-graymap", pgm_body()).await;
    let client = CameraClient::new(&mock_server.uri())?;

    let (bytes, info) = client.snapshot(RouteKind::Pgm).await?;
    assert_eq!(bytes.len(), 15 + 19200);
    assert_eq!((info.width, info.height), (160, 120));

    let image = parse_pgm(&bytes)?;
    assert_eq!(image.as_raw()[255], 255);
    Ok(())
}

#[tokio::test]
async fn test_bmp_snapshot() -> Result<()> {
    let mut body = BitmapHeader::new(4, 2).to_bytes().to_vec();
    body.extend_from_slice(&[0x80; 24]);
    let mock_server = serve("/bmp", "image/bmp", body).await;
    let client = CameraClient::new(&mock_server.uri())?;

    let (bytes, info) = client.snapshot(RouteKind::Bmp).await?;
    assert_eq!(bytes.len(), 54 + 24);
    assert_eq!((info.width, info.height), (4, 2));
    Ok(())
}

#[tokio::test]
async fn test_snapshot_rejects_wrong_content_type() -> Result<()> {
    let mock_server = serve("/jpg", "text/html", b"<html></html>".to_vec()).await;
    let client = CameraClient::new(&mock_server.uri())?;

    assert!(client.snapshot(RouteKind::Jpg).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_snapshot_missing_route() -> Result<()> {
    // Nothing mounted: wiremock answers 404
    let mock_server = MockServer::start().await;
    let client = CameraClient::new(&mock_server.uri())?;

    let err = client.snapshot(RouteKind::Pgm).await.unwrap_err();
    assert!(err.to_string().contains("404"));
    Ok(())
}

#[tokio::test]
async fn test_jpeg_stream_frames() -> Result<()> {
    let mock_server = serve("/jpg_stream", STREAM_CONTENT_TYPE, jpeg_stream_body(3)).await;
    let client = CameraClient::new(&mock_server.uri())?;

    let mut received = Vec::new();
    let count = client
        .stream(RouteKind::JpgStream, 2, |index, part, info| {
            assert_eq!(part.content_type.as_deref(), Some("image/jpg"));
            assert_eq!((info.width, info.height), (8, 8));
            received.push((index, part.data));
            Ok(())
        })
        .await?;

    assert_eq!(count, 2);
    assert_eq!(received[0], (0, jpeg_frame(0)));
    assert_eq!(received[1], (1, jpeg_frame(40)));
    Ok(())
}

#[tokio::test]
async fn test_stream_ends_with_connection() -> Result<()> {
    let mock_server = serve("/jpg_stream", STREAM_CONTENT_TYPE, jpeg_stream_body(3)).await;
    let client = CameraClient::new(&mock_server.uri())?;

    let count = client
        .stream(RouteKind::JpgStream, 10, |_, _, _| Ok(()))
        .await?;
    assert_eq!(count, 3);
    Ok(())
}

#[tokio::test]
async fn test_stream_rejects_non_jpeg_parts() -> Result<()> {
    let mut body = format!("{}\r\n", STREAM_BOUNDARY).into_bytes();
    body.extend_from_slice(b"Content-Type: image/jpg\r\nContent-Length: 2\r\n\r\nBM");
    body.extend_from_slice(format!("\r\n{}\r\n", STREAM_BOUNDARY).as_bytes());
    let mock_server = serve("/jpg_stream", STREAM_CONTENT_TYPE, body).await;
    let client = CameraClient::new(&mock_server.uri())?;

    let result = client.stream(RouteKind::JpgStream, 1, |_, _, _| Ok(())).await;
    assert!(result.is_err());
    Ok(())
}
