//! Host-side access to the camera demo's HTTP routes.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use camdemo_core::RouteKind;
use serde::Serialize;

pub mod formats;
pub mod multipart;

use formats::ImageInfo;
use multipart::{boundary_from_content_type, MultipartParser, Part};

/// Result of a capture run, printed with `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureSummary {
    pub route: RouteKind,
    pub frames: Vec<FrameSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameSummary {
    pub index: usize,
    pub path: String,
    #[serde(flatten)]
    pub info: ImageInfo,
}

pub struct CameraClient {
    base_url: String,
    http: reqwest::Client,
}

impl CameraClient {
    /// `base_url` is the device address, e.g. `http://192.168.1.100`.
    pub fn new(base_url: &str) -> Result<Self> {
        // No overall timeout: streams never finish on their own
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, kind: RouteKind) -> String {
        format!("{}{}", self.base_url, kind.path())
    }

    async fn get(&self, kind: RouteKind) -> Result<(reqwest::Response, String)> {
        let url = self.url(kind);
        log::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            bail!("{} returned {}", url, response.status());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.starts_with(kind.content_type()) {
            bail!(
                "{} answered with Content-Type {:?}, expected {:?}",
                url,
                content_type,
                kind.content_type()
            );
        }

        Ok((response, content_type))
    }

    /// Download and validate one image from a single-shot route.
    pub async fn snapshot(&self, kind: RouteKind) -> Result<(Vec<u8>, ImageInfo)> {
        if kind.is_stream() {
            bail!("{} is a stream route", kind.path());
        }

        let (response, _) = self.get(kind).await?;
        let bytes = response.bytes().await.context("reading image body")?.to_vec();
        let info = formats::validate(kind, &bytes)?;

        log::info!("Received {} bytes from {}", bytes.len(), kind.path());
        Ok((bytes, info))
    }

    /// Read up to `max_frames` parts from a stream route, handing each to
    /// `on_frame`. Returns the number of frames delivered; fewer than
    /// requested means the device ended the stream.
    pub async fn stream<F>(&self, kind: RouteKind, max_frames: usize, mut on_frame: F) -> Result<usize>
    where
        F: FnMut(usize, Part, ImageInfo) -> Result<()>,
    {
        if !kind.is_stream() {
            bail!("{} is not a stream route", kind.path());
        }

        let (mut response, content_type) = self.get(kind).await?;
        let boundary = boundary_from_content_type(&content_type)
            .with_context(|| format!("no boundary in {:?}", content_type))?;
        let mut parser = MultipartParser::new(boundary);

        let mut frames = 0;
        while frames < max_frames {
            if let Some(part) = parser.next_part()? {
                let info = formats::validate(kind, &part.data)?;
                on_frame(frames, part, info)?;
                frames += 1;
                continue;
            }

            match response.chunk().await.context("reading stream")? {
                Some(chunk) => parser.push(&chunk),
                None => {
                    log::info!("Stream ended after {} frames", frames);
                    break;
                }
            }
        }

        Ok(frames)
    }
}
