//! Eligibility policy: which captured responses may be stored.
//!
//! A capture is cacheable only when all of the following hold:
//!
//! - the status is exactly `200 OK` (other 2xx codes do not qualify),
//! - `Content-Length` is present and is a positive integer,
//! - the declared length does not exceed the configured limit,
//! - the body holds exactly the declared number of bytes,
//! - the backend stream did not fail.
//!
//! Failing any of these is not an error for the client. The response is
//! still served; it is just not remembered.

use http::header::CONTENT_LENGTH;
use http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::capture::CapturedResponse;
use crate::response::CachedResponse;

/// Responses up to 20 MiB are cacheable by default.
pub const DEFAULT_MAX_CACHEABLE_SIZE: u64 = 20 * (1 << 20);

/// Reason a captured response was not stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Uncacheable {
    /// Status other than `200 OK`.
    #[error("status {0} is not 200 OK")]
    Status(StatusCode),
    /// No `Content-Length` header.
    #[error("missing Content-Length header")]
    MissingLength,
    /// `Content-Length` is not a positive integer.
    #[error("invalid Content-Length header {0:?}")]
    InvalidLength(String),
    /// Declared length above the configured limit.
    #[error("declared length {declared} exceeds the {limit} byte limit")]
    TooLarge {
        /// Length from `Content-Length`.
        declared: u64,
        /// Configured `max_cacheable_size`.
        limit: u64,
    },
    /// Body size differs from the declared length.
    #[error("captured {actual} bytes but {declared} were declared")]
    LengthMismatch {
        /// Length from `Content-Length`.
        declared: u64,
        /// Bytes actually written.
        actual: u64,
    },
    /// The backend body stream failed.
    #[error("backend body stream was aborted")]
    Aborted,
}

impl Uncacheable {
    /// Short label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Uncacheable::Status(_) => "status",
            Uncacheable::MissingLength => "missing_length",
            Uncacheable::InvalidLength(_) => "invalid_length",
            Uncacheable::TooLarge { .. } => "too_large",
            Uncacheable::LengthMismatch { .. } => "length_mismatch",
            Uncacheable::Aborted => "aborted",
        }
    }
}

/// Decides whether a [`CapturedResponse`] may become a [`CachedResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityPolicy {
    max_cacheable_size: u64,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHEABLE_SIZE)
    }
}

impl EligibilityPolicy {
    /// Creates a policy accepting bodies up to `max_cacheable_size` bytes.
    pub fn new(max_cacheable_size: u64) -> Self {
        EligibilityPolicy { max_cacheable_size }
    }

    /// Largest declared length accepted.
    pub fn max_cacheable_size(&self) -> u64 {
        self.max_cacheable_size
    }

    /// Parses the declared body length from `Content-Length`.
    pub fn declared_length(headers: &HeaderMap) -> Result<u64, Uncacheable> {
        let value = headers
            .get(CONTENT_LENGTH)
            .ok_or(Uncacheable::MissingLength)?;
        let invalid =
            || Uncacheable::InvalidLength(String::from_utf8_lossy(value.as_bytes()).into_owned());
        let length = value
            .to_str()
            .map_err(|_| invalid())?
            .parse::<u64>()
            .map_err(|_| invalid())?;
        if length == 0 {
            return Err(invalid());
        }
        Ok(length)
    }

    /// Checks every condition and builds the snapshot to store.
    ///
    /// Conditions are checked in order; the first failure is returned.
    pub fn evaluate(&self, captured: &CapturedResponse) -> Result<CachedResponse, Uncacheable> {
        if captured.status() != StatusCode::OK {
            return Err(Uncacheable::Status(captured.status()));
        }
        let declared = Self::declared_length(captured.headers())?;
        if declared > self.max_cacheable_size {
            return Err(Uncacheable::TooLarge {
                declared,
                limit: self.max_cacheable_size,
            });
        }
        let response = CachedResponse::new(
            captured.status(),
            captured.headers().clone(),
            captured.body().clone(),
            declared,
        )?;
        if captured.is_aborted() {
            return Err(Uncacheable::Aborted);
        }
        Ok(response)
    }
}
