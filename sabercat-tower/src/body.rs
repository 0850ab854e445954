//! Response body produced by the cache service.

use bytes::{Buf, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Body of a response leaving [`CacheService`](crate::service::CacheService).
///
/// # Variants
///
/// - [`Complete`](CacheBody::Complete): fully materialized bytes, used for
///   cache hits and for freshly captured responses
/// - [`Passthrough`](CacheBody::Passthrough): the wrapped service's body,
///   untouched, used when caching is disabled
#[pin_project(project = CacheBodyProj)]
#[derive(Debug)]
pub enum CacheBody<B> {
    /// Buffered body. The `Option` is taken on the first poll.
    Complete(Option<Bytes>),
    /// Upstream body forwarded as is.
    Passthrough(#[pin] B),
}

impl<B> CacheBody<B> {
    /// Creates a buffered body.
    pub fn complete(bytes: Bytes) -> Self {
        CacheBody::Complete(Some(bytes))
    }
}

impl<B> HttpBody for CacheBody<B>
where
    B: HttpBody,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            CacheBodyProj::Complete(data) => match data.take() {
                Some(bytes) if !bytes.is_empty() => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                _ => Poll::Ready(None),
            },
            CacheBodyProj::Passthrough(body) => match body.poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            CacheBody::Complete(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            CacheBody::Complete(None) => SizeHint::with_exact(0),
            CacheBody::Passthrough(body) => body.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            CacheBody::Complete(Some(bytes)) => bytes.is_empty(),
            CacheBody::Complete(None) => true,
            CacheBody::Passthrough(body) => body.is_end_stream(),
        }
    }
}
