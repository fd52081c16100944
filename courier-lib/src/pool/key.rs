use std::fmt;

use url::Url;

use crate::{ErrorKind, Result};

/// The `(scheme, host, port)` triple identifying a connection-pool bucket.
///
/// Hosts are normalized to lowercase and ports default to the scheme's
/// well-known port, so `http://Example.com` and `http://example.com:80`
/// share connections.
///
/// # Examples
///
/// ```
/// use courier_lib::pool::Origin;
/// use url::Url;
///
/// let url = Url::parse("https://API.example.com/repos/user/repo").unwrap();
/// let origin = Origin::try_from(&url).unwrap();
/// assert_eq!(origin.to_string(), "https://api.example.com:443");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: Scheme,
    host: String,
    port: u16,
}

/// The schemes the client can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain-text HTTP over TCP
    Http,
    /// HTTP over TLS
    Https,
}

impl Scheme {
    /// The scheme as it appears in a URL
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl Origin {
    /// Create an origin from its parts.
    #[must_use]
    pub fn new(scheme: Scheme, host: &str, port: u16) -> Self {
        Self {
            scheme,
            host: host.to_lowercase(),
            port,
        }
    }

    /// The scheme of this origin
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The lowercase host name or IP address literal
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port, with the scheme default filled in
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns `true` if connections to this origin use TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.scheme, Scheme::Https)
    }

    /// The value of the `Host` header for requests to this origin.
    ///
    /// The port is omitted when it is the scheme's default port.
    #[must_use]
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The host in a form that can be handed to the resolver, without the
    /// brackets around IPv6 literals.
    pub(crate) fn connect_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }
}

impl TryFrom<&Url> for Origin {
    type Error = ErrorKind;

    fn try_from(url: &Url) -> Result<Self> {
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(ErrorKind::InvalidConfig(format!(
                    "Unsupported URL scheme `{other}`"
                )));
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| ErrorKind::InvalidConfig(format!("URL `{url}` is missing a host")))?;
        let port = url.port().unwrap_or_else(|| scheme.default_port());

        Ok(Self::new(scheme, host, port))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}
