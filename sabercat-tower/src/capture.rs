//! Draining an upstream response into a [`ResponseCapture`].

use std::fmt::Display;
use std::pin::pin;

use bytes::Buf;
use http::Response;
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use sabercat::{CapturedResponse, ResponseCapture};
use tracing::warn;

/// Reads `response` to the end and returns everything it contained.
///
/// Status and headers are copied first, then every data frame is appended
/// in order. Trailers are dropped. If the body stream fails, reading stops,
/// the bytes received so far are kept, and the capture is marked aborted.
pub async fn capture_response<B>(response: Response<B>) -> CapturedResponse
where
    B: HttpBody,
    B::Error: Display,
{
    let (parts, body) = response.into_parts();

    let mut capture = ResponseCapture::new();
    capture.write_status(parts.status);
    for (name, value) in parts.headers.iter() {
        capture.append_header(name.clone(), value.clone());
    }

    let mut body = pin!(body);
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(mut data) = frame.into_data() {
                    while data.has_remaining() {
                        let chunk = data.chunk();
                        let len = chunk.len();
                        capture.write(chunk);
                        data.advance(len);
                    }
                }
            }
            Err(error) => {
                warn!(%error, written = capture.written(), "upstream body stream failed");
                capture.abort();
                break;
            }
        }
    }

    capture.finish()
}
