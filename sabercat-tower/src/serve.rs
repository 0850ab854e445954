//! Writing a snapshot back to the client.
//!
//! Hits and fresh fills go through the same [`serve`] path, so a client
//! cannot tell them apart except by latency.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use http::{HeaderMap, HeaderValue, Response, StatusCode};

use crate::body::CacheBody;

/// How long clients are told they may keep a response.
///
/// Fixed; it does not follow the server-side TTL.
// TODO: consider deriving the horizon from the configured TTL.
pub const CLIENT_CACHE_HORIZON: Duration = Duration::from_secs(2_592_000);

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Builds the client response from captured or cached parts.
pub fn serve<B>(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response<CacheBody<B>> {
    let mut response = Response::new(CacheBody::complete(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    apply_client_cache_headers(response.headers_mut(), Utc::now());
    response
}

/// Sets `Expires`, `Cache-Control` and `Pragma`, replacing any upstream values.
pub fn apply_client_cache_headers(headers: &mut HeaderMap, now: DateTime<Utc>) {
    let horizon = CLIENT_CACHE_HORIZON.as_secs();
    let expires = now + TimeDelta::seconds(horizon as i64);

    if let Ok(value) = HeaderValue::from_str(&expires.format(HTTP_DATE_FORMAT).to_string()) {
        headers.insert(EXPIRES, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("private,max-age={horizon}")) {
        headers.insert(CACHE_CONTROL, value);
    }
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
}
