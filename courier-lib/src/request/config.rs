use std::time::Duration;

use http::{HeaderMap, Method};
use url::Url;

use crate::RequestBody;
use crate::pool::ConnectionPolicy;

/// A fully normalized request, ready to be sent.
///
/// This is what event hooks receive before each physical send and what the
/// redirect engine rewrites from hop to hop.
#[derive(Debug)]
pub struct RequestConfig {
    /// The request method
    pub method: Method,
    /// The absolute URL of this hop, without userinfo
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// The request body
    pub body: RequestBody,
    /// Deadline for the whole redirect chain, if any
    pub timeout: Option<Duration>,
    /// Whether pooled connections may be used
    pub agent: ConnectionPolicy,
}

impl RequestConfig {
    /// Create a bodiless request with no extra headers.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            timeout: None,
            agent: ConnectionPolicy::default(),
        }
    }
}
