//! Following HTTP redirects.
//!
//! After every response the client asks [`decide`] whether to stop or to
//! send a follow-up request. The follow-up is derived from the previous
//! request according to the redirect status code:
//!
//! | Status   | Method                          | Body      |
//! |----------|---------------------------------|-----------|
//! | 303      | `GET`                           | dropped   |
//! | 301, 302 | `GET` if the request was `POST` | dropped   |
//! | 307, 308 | unchanged                       | preserved |
//!
//! Credentials (`Authorization`, `Cookie`, `Referer`) never leave the hop
//! they were sent on. Headers describing a dropped body go with it.

mod history;

use http::header::{AUTHORIZATION, COOKIE, HOST, LOCATION, REFERER, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, Method, StatusCode};

use crate::RequestBody;
use crate::request::RequestConfig;

pub use history::Redirects;

/// Default number of redirects that are followed, 5.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Progress of one redirect chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectState {
    hop_count: usize,
    max_redirects: usize,
}

impl RedirectState {
    /// Start a chain that follows at most `max_redirects` redirects.
    /// With `0`, redirects are not followed at all.
    #[must_use]
    pub const fn new(max_redirects: usize) -> Self {
        Self {
            hop_count: 0,
            max_redirects,
        }
    }

    /// Number of redirects followed so far
    #[must_use]
    pub const fn hop_count(&self) -> usize {
        self.hop_count
    }

    /// Maximum number of redirects to follow
    #[must_use]
    pub const fn max_redirects(&self) -> usize {
        self.max_redirects
    }
}

impl Default for RedirectState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REDIRECTS)
    }
}

/// What to do after a response
#[derive(Debug)]
pub enum Decision {
    /// Return the response to the caller
    Stop,
    /// Send this request next
    Follow(RequestConfig),
}

impl Decision {
    /// Returns `true` if the chain ends here.
    #[must_use]
    pub const fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// Decide whether to follow a response with `status` and `headers` that
/// was received for `request`.
///
/// Stops when the status is not a redirect, when there is no usable
/// `Location` header, when `state` has reached its limit or when the
/// status code is not one of 301, 302, 303, 307 and 308. Otherwise the
/// follow-up request is returned and the hop is counted in `state`.
///
/// Exceeding the redirect limit is not an error: the last redirect response
/// is returned to the caller as is.
///
/// # Examples
///
/// ```
/// use courier_lib::redirect::{Decision, RedirectState, decide};
/// use courier_lib::RequestConfig;
/// use http::{HeaderMap, HeaderValue, Method, StatusCode, header::LOCATION};
/// use url::Url;
///
/// let request = RequestConfig::new(Method::POST, Url::parse("http://example.com/form").unwrap());
/// let mut headers = HeaderMap::new();
/// headers.insert(LOCATION, HeaderValue::from_static("/done"));
///
/// let mut state = RedirectState::new(5);
/// let Decision::Follow(next) = decide(request, StatusCode::SEE_OTHER, &headers, &mut state) else {
///     panic!("303 should be followed");
/// };
/// assert_eq!(next.method, Method::GET);
/// assert_eq!(next.url.as_str(), "http://example.com/done");
/// assert_eq!(state.hop_count(), 1);
/// ```
pub fn decide(
    request: RequestConfig,
    status: StatusCode,
    headers: &HeaderMap,
    state: &mut RedirectState,
) -> Decision {
    if !status.is_redirection() {
        return Decision::Stop;
    }
    if state.hop_count >= state.max_redirects {
        log::debug!(
            "Not following redirect from {}, limit of {} reached",
            request.url,
            state.max_redirects
        );
        return Decision::Stop;
    }

    let drop_body = match status.as_u16() {
        301 | 302 | 303 => true,
        307 | 308 => false,
        _ => return Decision::Stop,
    };

    let Some(location) = headers.get(LOCATION) else {
        return Decision::Stop;
    };
    let next_url = location
        .to_str()
        .ok()
        .and_then(|location| request.url.join(location).ok());
    let mut next_url = match next_url {
        Some(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => {
            log::warn!(
                "Cannot follow redirect from {}: invalid Location header {location:?}",
                request.url
            );
            return Decision::Stop;
        }
    };
    // Credentials in the Location header are not sent either
    let _ = next_url.set_username("");
    let _ = next_url.set_password(None);

    let mut next = request;
    if status == StatusCode::SEE_OTHER || (drop_body && next.method == Method::POST) {
        next.method = Method::GET;
    }

    // `Host` is recomputed for the next origin
    for name in [AUTHORIZATION, COOKIE, REFERER, HOST] {
        next.headers.remove(name);
    }

    if drop_body {
        next.body = RequestBody::Empty;
        remove_body_headers(&mut next.headers);
    } else if next.body.is_consumed() {
        log::warn!("Cannot resend streamed request body to {next_url}, sending no body");
        next.body = RequestBody::Empty;
        remove_body_headers(&mut next.headers);
    }

    log::debug!("Following {status} redirect from {} to {next_url}", next.url);
    next.url = next_url;
    state.hop_count += 1;
    Decision::Follow(next)
}

/// Remove `Content-*` headers and `Transfer-Encoding`.
fn remove_body_headers(headers: &mut HeaderMap) {
    let names: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with("content-"))
        .cloned()
        .collect();
    for name in names {
        headers.remove(name);
    }
    headers.remove(TRANSFER_ENCODING);
}
