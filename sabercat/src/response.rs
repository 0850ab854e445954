//! Immutable snapshot of a validated backend response.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::policy::Uncacheable;

/// A backend answer that passed the eligibility policy.
///
/// The body length always equals the declared length: [`CachedResponse::new`]
/// is the only constructor and it refuses anything else. Once built, the
/// snapshot is never mutated; readers clone it out of the store.
///
/// Cloning is cheap for the body (a reference-counted [`Bytes`] handle) and
/// proportional to the header count for the header map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    declared_length: u64,
}

impl CachedResponse {
    /// Builds a snapshot, checking that `body` holds exactly `declared_length` bytes.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        declared_length: u64,
    ) -> Result<Self, Uncacheable> {
        let actual = body.len() as u64;
        if actual != declared_length {
            return Err(Uncacheable::LengthMismatch {
                declared: declared_length,
                actual,
            });
        }
        Ok(CachedResponse {
            status,
            headers,
            body,
            declared_length,
        })
    }

    /// Status code returned by the backend.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Headers returned by the backend, in the order they were written.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The full response body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Length announced by the backend's `Content-Length` header.
    #[inline]
    pub fn declared_length(&self) -> u64 {
        self.declared_length
    }

    /// Consumes the snapshot and returns status, headers and body.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}
