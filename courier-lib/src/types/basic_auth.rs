use std::str::FromStr;

use headers::authorization::Credentials;
use headers::{Authorization, authorization::Basic};
use http::HeaderValue;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::{ErrorKind, Result};

/// [`BasicAuthCredentials`] contains a pair of basic auth values consisting of
/// a username and password.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicAuthCredentials {
    /// Basic auth username
    pub username: String,

    /// Basic auth password
    pub password: String,
}

impl FromStr for BasicAuthCredentials {
    type Err = ErrorKind;

    /// Parses `user:pass`. Only the first colon separates the two parts,
    /// so the password may contain colons itself. Without a colon the whole
    /// input is the username and the password is empty. Either part may be
    /// empty.
    fn from_str(credentials: &str) -> Result<Self> {
        let (username, password) = credentials.split_once(':').unwrap_or((credentials, ""));
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl BasicAuthCredentials {
    /// Extract credentials from the userinfo part of `url`, percent-decoding
    /// both components.
    ///
    /// Returns `None` if the URL carries neither a username nor a password.
    #[must_use]
    pub fn from_url(url: &Url) -> Option<Self> {
        if url.username().is_empty() && url.password().is_none() {
            return None;
        }

        let decode = |s: &str| percent_decode_str(s).decode_utf8_lossy().into_owned();
        Some(Self {
            username: decode(url.username()),
            password: url.password().map(decode).unwrap_or_default(),
        })
    }

    /// Returns the credentials as [`Authorization<Basic>`].
    #[must_use]
    pub fn to_authorization(&self) -> Authorization<Basic> {
        Authorization::basic(&self.username, &self.password)
    }

    /// Returns the encoded `Authorization` header value.
    #[must_use]
    pub fn to_header_value(&self) -> HeaderValue {
        self.to_authorization().0.encode()
    }
}
