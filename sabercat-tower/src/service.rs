use std::fmt::{self, Debug, Display};

use http::{Request, Response};
use http_body::Body as HttpBody;
use sabercat::metrics;
use sabercat::{CacheKey, CacheStore, EligibilityPolicy};
use tower::Service;
use tracing::{debug, warn};

use crate::body::CacheBody;
use crate::capture::capture_response;
use crate::future::CacheServiceFuture;
use crate::serve::serve;

/// Tower service that answers repeated reads of a path from memory.
///
/// Built by the [`Cache`](crate::Cache) layer. Clones share one store.
pub struct CacheService<S> {
    upstream: S,
    store: Option<CacheStore>,
    policy: EligibilityPolicy,
}

impl<S> CacheService<S> {
    /// Wraps `upstream`. With `store` set to `None` every request passes through.
    pub fn new(upstream: S, store: Option<CacheStore>, policy: EligibilityPolicy) -> Self {
        CacheService {
            upstream,
            store,
            policy,
        }
    }

    /// Shared store, if caching is enabled.
    pub fn store(&self) -> Option<&CacheStore> {
        self.store.as_ref()
    }
}

impl<S> Clone for CacheService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            store: self.store.clone(),
            policy: self.policy,
        }
    }
}

impl<S> Debug for CacheService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("upstream", &std::any::type_name::<S>())
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CacheService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send,
    ReqBody: Send + 'static,
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Display,
{
    type Response = Response<CacheBody<ResBody>>;
    type Error = S::Error;
    type Future = CacheServiceFuture<S::Future, ResBody, S::Error>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.upstream.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let Some(store) = self.store.clone() else {
            return CacheServiceFuture::passthrough(self.upstream.call(req));
        };

        let key = CacheKey::from_uri(req.uri());
        if let Some(cached) = store.get(&key) {
            debug!(key = %key, "cache hit");
            metrics::record_hit();
            let (status, headers, body) = cached.into_parts();
            return CacheServiceFuture::hit(serve(status, headers, body));
        }
        debug!(key = %key, "cache miss");
        metrics::record_miss();

        // The readied service is the one that must be called.
        let clone = self.upstream.clone();
        let mut upstream = std::mem::replace(&mut self.upstream, clone);
        let policy = self.policy;

        CacheServiceFuture::fill(Box::pin(async move {
            let response = upstream.call(req).await?;
            let captured = capture_response(response).await;

            match policy.evaluate(&captured) {
                Ok(entry) => {
                    let bytes = entry.declared_length();
                    match store.put(key.clone(), entry) {
                        Ok(()) => debug!(key = %key, bytes, ttl = ?store.ttl(), "response cached"),
                        Err(error) => warn!(key = %key, %error, "response not cached"),
                    }
                }
                Err(reason) => {
                    debug!(key = %key, %reason, "response not cached");
                    metrics::record_uncacheable(&reason);
                }
            }

            let (status, headers, body) = captured.into_parts();
            Ok(serve(status, headers, body))
        }))
    }
}
