//! Cache key type.
//!
//! A [`CacheKey`] is the path component of a request URI and nothing else.
//! The method, query string and headers never take part in the key, so two
//! requests for `/img/logo.png?v=1` and `/img/logo.png?v=2` share one entry.
//!
//! ```
//! use sabercat::CacheKey;
//!
//! let uri: http::Uri = "https://example.com/files/a.txt?download=1".parse().unwrap();
//! let key = CacheKey::from_uri(&uri);
//! assert_eq!(key.as_str(), "/files/a.txt");
//! ```
//!
//! [`SmolStr`] keeps short paths inline, so cloning a key into an eviction
//! timer does not allocate for typical blob paths.

use std::fmt;

use http::Uri;
use smol_str::SmolStr;

/// Request path used to index stored responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(SmolStr);

impl CacheKey {
    /// Creates a key from a raw path.
    pub fn new(path: impl AsRef<str>) -> Self {
        CacheKey(SmolStr::new(path))
    }

    /// Creates a key from the path component of `uri`.
    pub fn from_uri(uri: &Uri) -> Self {
        Self::new(uri.path())
    }

    /// Returns the path this key was built from.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&Uri> for CacheKey {
    fn from(uri: &Uri) -> Self {
        Self::from_uri(uri)
    }
}

impl From<&str> for CacheKey {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl<B> From<&http::Request<B>> for CacheKey {
    fn from(request: &http::Request<B>) -> Self {
        Self::from_uri(request.uri())
    }
}
