//! Tower middleware for the sabercat response cache.
//!
//! This crate provides [`Cache`], a Tower [`Layer`] that sits in front of a
//! slow or rate-limited HTTP backend and answers repeated reads of the same
//! path from memory for a fixed TTL.
//!
//! # How a request is handled
//!
//! 1. The cache key is the request path. Method, query string and headers
//!    are ignored.
//! 2. **Hit**: the stored status, headers and body are written to the client.
//!    The backend is not called.
//! 3. **Miss**: the backend is called and its whole response is buffered in
//!    memory. It is stored only if the status is exactly `200`, a positive
//!    `Content-Length` is present, the length is within
//!    `max_cacheable_size`, and exactly that many bytes arrived. Whatever
//!    the outcome, the buffered response is what the client receives.
//! 4. Each stored entry is evicted by its own timer once the TTL elapses.
//!
//! A TTL of zero disables all of this; the layer then forwards requests and
//! responses untouched.
//!
//! # Response Headers
//!
//! When caching is enabled, every response (hit or miss) carries:
//!
//! | Header | Value |
//! |--------|-------|
//! | `Expires` | now + [`CLIENT_CACHE_HORIZON`] |
//! | `Cache-Control` | `private,max-age=2592000` |
//! | `Pragma` | `no-cache` |
//!
//! # Quick Start
//!
//! ```
//! use std::convert::Infallible;
//! use std::time::Duration;
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use sabercat_tower::Cache;
//! use tower::{ServiceBuilder, service_fn};
//!
//! let cache = Cache::builder()
//!     .ttl(Duration::from_secs(60))
//!     .build()
//!     .unwrap();
//!
//! let service = ServiceBuilder::new()
//!     .layer(cache)
//!     .service(service_fn(|_req: Request<()>| async {
//!         Ok::<_, Infallible>(
//!             Response::builder()
//!                 .header("content-length", "5")
//!                 .body(Full::new(Bytes::from_static(b"hello")))
//!                 .unwrap(),
//!         )
//!     }));
//! # let _ = service;
//! ```
//!
//! # Feature Flags
//!
//! - `metrics` - forward to `sabercat/metrics`
//!
//! [`Layer`]: tower::Layer

#![warn(missing_docs)]

/// Response body type.
pub mod body;
/// Draining upstream responses into memory.
pub mod capture;
/// Future types for the cache service.
pub mod future;
/// Tower layer and builder.
pub mod layer;
/// Writing snapshots to the client.
pub mod serve;
/// The Tower service implementation that performs caching.
pub mod service;

pub use body::CacheBody;
pub use layer::{Cache, CacheBuilder};
pub use sabercat::{CacheConfig, CacheStore};
pub use serve::CLIENT_CACHE_HORIZON;
pub use service::CacheService;
