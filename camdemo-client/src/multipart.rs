//! Incremental splitter for `multipart/x-mixed-replace` bodies.
//!
//! Bytes are pushed as they arrive; complete parts are pulled out with
//! [`MultipartParser::next_part`]. Every part must carry a
//! `Content-Length`, which is what the device sends.

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug)]
enum State {
    Headers,
    Body {
        content_type: Option<String>,
        len: usize,
    },
    /// Expecting `\r\n--boundary` after a body.
    Delimiter,
    Closed,
}

#[derive(Debug)]
pub struct MultipartParser {
    /// Delimiter including the leading `--`.
    delimiter: String,
    buf: Vec<u8>,
    state: State,
}

/// Extract the boundary parameter from a multipart content type.
pub fn boundary_from_content_type(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"'))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

impl MultipartParser {
    pub fn new(boundary: &str) -> Self {
        Self {
            delimiter: format!("--{}", boundary),
            buf: Vec::new(),
            state: State::Headers,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete part, `None` if more input is needed or the closing
    /// delimiter was seen.
    pub fn next_part(&mut self) -> Result<Option<Part>> {
        loop {
            match &self.state {
                State::Closed => return Ok(None),
                State::Headers => {
                    let Some(end) = find(&self.buf, b"\r\n\r\n") else {
                        return Ok(None);
                    };
                    let head = std::str::from_utf8(&self.buf[..end])
                        .context("part headers are not UTF-8")?
                        .to_string();
                    self.buf.drain(..end + 4);
                    self.state = self.parse_headers(&head)?;
                }
                State::Body { len, .. } => {
                    let len = *len;
                    if self.buf.len() < len {
                        return Ok(None);
                    }
                    let data: Vec<u8> = self.buf.drain(..len).collect();
                    let State::Body { content_type, .. } =
                        std::mem::replace(&mut self.state, State::Delimiter)
                    else {
                        unreachable!()
                    };
                    return Ok(Some(Part { content_type, data }));
                }
                State::Delimiter => {
                    // \r\n--boundary followed by \r\n or the closing --
                    let need = 2 + self.delimiter.len() + 2;
                    if self.buf.len() < need {
                        return Ok(None);
                    }
                    if &self.buf[..2] != b"\r\n"
                        || &self.buf[2..2 + self.delimiter.len()] != self.delimiter.as_bytes()
                    {
                        bail!("missing boundary after part body");
                    }
                    let tail = &self.buf[need - 2..need];
                    self.state = if tail == b"--" {
                        State::Closed
                    } else {
                        State::Headers
                    };
                    self.buf.drain(..need);
                }
            }
        }
    }

    fn parse_headers(&self, head: &str) -> Result<State> {
        let mut content_type = None;
        let mut len = None;

        for line in head.split("\r\n") {
            // A leading delimiter line is allowed before the first part
            if line.is_empty() || line == self.delimiter {
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                bail!("malformed part header line {:?}", line);
            };
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("content-length") {
                len = Some(value.parse::<usize>().context("bad part Content-Length")?);
            }
        }

        let Some(len) = len else {
            bail!("part without Content-Length");
        };
        Ok(State::Body { content_type, len })
    }
}
