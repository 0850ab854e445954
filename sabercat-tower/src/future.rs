use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::ready;
use http::Response;
use pin_project::pin_project;

use crate::body::CacheBody;

/// Response future of [`CacheService`](crate::service::CacheService).
///
/// Passthrough and hit responses are not boxed; only the miss path, which
/// runs the whole capture-and-validate sequence, is.
#[pin_project(project = CacheServiceFutureProj)]
pub enum CacheServiceFuture<F, B, E> {
    /// Caching disabled: the upstream future, with its body wrapped.
    Passthrough {
        /// Upstream response future.
        #[pin]
        inner: F,
    },
    /// Served from the store.
    Hit {
        /// Taken on the first poll.
        response: Option<Response<CacheBody<B>>>,
    },
    /// Miss: upstream call, capture, eligibility check and optional commit.
    Fill {
        /// The fill sequence.
        inner: BoxFuture<'static, Result<Response<CacheBody<B>>, E>>,
    },
}

impl<F, B, E> CacheServiceFuture<F, B, E> {
    pub(crate) fn passthrough(inner: F) -> Self {
        CacheServiceFuture::Passthrough { inner }
    }

    pub(crate) fn hit(response: Response<CacheBody<B>>) -> Self {
        CacheServiceFuture::Hit {
            response: Some(response),
        }
    }

    pub(crate) fn fill(inner: BoxFuture<'static, Result<Response<CacheBody<B>>, E>>) -> Self {
        CacheServiceFuture::Fill { inner }
    }
}

impl<F, B, E> Future for CacheServiceFuture<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<CacheBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            CacheServiceFutureProj::Passthrough { inner } => {
                let response = ready!(inner.poll(cx))?;
                Poll::Ready(Ok(response.map(CacheBody::Passthrough)))
            }
            CacheServiceFutureProj::Hit { response } => Poll::Ready(Ok(response
                .take()
                .expect("CacheServiceFuture polled after completion"))),
            CacheServiceFutureProj::Fill { inner } => inner.as_mut().poll(cx),
        }
    }
}
