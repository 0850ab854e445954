//! In-memory stand-in for a client connection.
//!
//! While the wrapped handler runs, its output goes into a [`ResponseCapture`]
//! instead of the socket. Nothing reaches the client until the capture is
//! [finished](ResponseCapture::finish) and the eligibility policy has looked at
//! it, so a truncated or oversized answer can be served without ever being
//! stored.

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

/// Write surface of a client connection that keeps everything in memory.
///
/// ```
/// use http::StatusCode;
/// use sabercat::ResponseCapture;
///
/// let mut capture = ResponseCapture::new();
/// capture.write_status(StatusCode::OK);
/// capture.append_header(http::header::CONTENT_LENGTH, "5".parse().unwrap());
/// capture.write(b"hel");
/// capture.write(b"lo");
///
/// let captured = capture.finish();
/// assert_eq!(captured.body().as_ref(), b"hello");
/// ```
#[derive(Debug, Default)]
pub struct ResponseCapture {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    aborted: bool,
}

impl ResponseCapture {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the status code. Only the first call has an effect.
    pub fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Appends a header value, keeping any values already present for `name`.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// Appends body bytes.
    pub fn write(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    /// Marks the backend stream as broken before it finished.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Number of body bytes written so far.
    pub fn written(&self) -> u64 {
        self.body.len() as u64
    }

    /// Freezes the capture.
    ///
    /// A handler that never set a status is treated as having answered `200 OK`.
    pub fn finish(self) -> CapturedResponse {
        CapturedResponse {
            status: self.status.unwrap_or(StatusCode::OK),
            headers: self.headers,
            body: self.body.freeze(),
            aborted: self.aborted,
        }
    }
}

/// Frozen output of a [`ResponseCapture`], not yet judged cacheable.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    aborted: bool,
}

impl CapturedResponse {
    /// Status code set by the backend.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Headers set by the backend.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Body bytes actually written by the backend.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the backend stream failed before completing.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Consumes the capture and returns status, headers and body.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}
