//! Issuing requests.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` sends requests and follows redirects. `ClientBuilder` exposes a
//! finer level of granularity for building a `Client`.
//!
//! For convenience, a free function [`get`] is provided for ad-hoc
//! requests.
#![allow(clippy::module_name_repetitions)]

use std::time::Duration;

use http::{HeaderMap, HeaderValue};
use typed_builder::TypedBuilder;
use url::Url;

use crate::hooks::EventHooks;
use crate::pool::{ConnectionPool, PoolStats};
use crate::redirect::{self, DEFAULT_MAX_REDIRECTS, Decision, RedirectState, Redirects};
use crate::request::{RequestBuilder, RequestConfig, RequestOptions};
use crate::transport::{Connector, Deadline, Transport};
use crate::{Response, Result};

/// Default user agent, `courier/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));
/// Default time allowed for the TCP connect and TLS handshake, 10 seconds.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for [`Client`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// Base URL that relative request URLs are resolved against.
    base_url: Option<Url>,
    /// User-agent sent with every request that does not set its own.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,
    /// Maximum number of redirects to follow per request. With `0`, the
    /// first response is returned as is.
    #[builder(default = DEFAULT_MAX_REDIRECTS)]
    max_redirects: usize,
    /// Deadline for a whole request: all redirect hops and reading the final
    /// response body. Can be overridden per request.
    timeout: Option<Duration>,
    /// Time allowed for establishing a single connection.
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    connect_timeout: Duration,
    /// The connection pool to use. Defaults to the process-wide pool shared
    /// by all clients.
    #[builder(default_code = "ConnectionPool::shared()")]
    pool: ConnectionPool,
    /// Headers sent with every request. Request headers of the same name
    /// replace them.
    default_headers: HeaderMap,
}

impl Default for ClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent is not a valid header value.
    /// - The TLS configuration cannot be created.
    pub fn client(self) -> Result<Client> {
        let Self {
            base_url,
            user_agent,
            max_redirects,
            timeout,
            connect_timeout,
            pool,
            default_headers,
        } = self;

        let builder = RequestBuilder {
            base_url,
            user_agent: HeaderValue::from_str(&user_agent)?,
            default_headers,
            timeout,
        };
        let transport = Transport::new(pool, Connector::new(connect_timeout)?);

        Ok(Client {
            builder,
            transport,
            hooks: EventHooks::default(),
            max_redirects,
        })
    }
}

/// Sends requests and follows redirects.
///
/// Clones share the connection pool and the event hooks.
///
/// See [`ClientBuilder`] which contains sane defaults for all configuration
/// options.
#[derive(Debug, Clone)]
pub struct Client {
    /// Turns caller input into requests, with the client defaults applied.
    builder: RequestBuilder,
    /// Sends requests over pooled connections.
    transport: Transport,
    /// Called before every physical send.
    hooks: EventHooks,
    /// Maximum number of redirects to follow per request.
    max_redirects: usize,
}

impl Client {
    /// Send a request with an arbitrary method.
    ///
    /// The method is case-insensitive, `url` may be relative to the client's
    /// base URL.
    ///
    /// # Errors
    ///
    /// - [`crate::ErrorKind::InvalidConfig`] if the request cannot be built
    /// - [`crate::ErrorKind::Connection`] if the server cannot be reached
    /// - [`crate::ErrorKind::Timeout`] if the request deadline passes
    /// - [`crate::ErrorKind::Protocol`] if the server sends malformed HTTP
    pub async fn request(
        &self,
        method: impl AsRef<str>,
        url: impl AsRef<str>,
        options: RequestOptions,
    ) -> Result<Response> {
        let config = self
            .builder
            .build(method.as_ref(), url.as_ref(), options)?;
        self.send(config).await
    }

    /// Send a prepared request and follow its redirects.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn send(&self, mut config: RequestConfig) -> Result<Response> {
        let deadline = config.timeout.map(Deadline::after);
        let mut state = RedirectState::new(self.max_redirects);
        let mut history = Vec::new();

        loop {
            self.hooks.emit(&mut config);

            let body = config.body.take_outgoing()?;
            history.push(config.url.clone());
            let mut response = self.transport.send(&config, body, deadline).await?;

            let status = response.status();
            match redirect::decide(config, status, response.headers(), &mut state) {
                Decision::Stop => {
                    response.set_redirects(Redirects::from(history));
                    return Ok(response);
                }
                Decision::Follow(next) => {
                    // Drain the redirect body so its connection can be reused
                    response.discard().await?;
                    config = next;
                }
            }
        }
    }

    /// Send a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn get(&self, url: impl AsRef<str>, options: RequestOptions) -> Result<Response> {
        self.request("GET", url, options).await
    }

    /// Send a `POST` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn post(&self, url: impl AsRef<str>, options: RequestOptions) -> Result<Response> {
        self.request("POST", url, options).await
    }

    /// Send a `PUT` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn put(&self, url: impl AsRef<str>, options: RequestOptions) -> Result<Response> {
        self.request("PUT", url, options).await
    }

    /// Send a `PATCH` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn patch(&self, url: impl AsRef<str>, options: RequestOptions) -> Result<Response> {
        self.request("PATCH", url, options).await
    }

    /// Send a `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn delete(&self, url: impl AsRef<str>, options: RequestOptions) -> Result<Response> {
        self.request("DELETE", url, options).await
    }

    /// Send a `HEAD` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn head(&self, url: impl AsRef<str>, options: RequestOptions) -> Result<Response> {
        self.request("HEAD", url, options).await
    }

    /// Send an `OPTIONS` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub async fn options(&self, url: impl AsRef<str>, options: RequestOptions) -> Result<Response> {
        self.request("OPTIONS", url, options).await
    }

    /// Run `hook` before every request this client (or a clone of it)
    /// sends, redirect hops included.
    pub fn on<F>(&self, hook: F)
    where
        F: Fn(&mut RequestConfig) + Send + Sync + 'static,
    {
        self.hooks.on(hook);
    }

    /// Run `hook` before the next request only.
    pub fn once<F>(&self, hook: F)
    where
        F: Fn(&mut RequestConfig) + Send + Sync + 'static,
    {
        self.hooks.once(hook);
    }

    /// The hooks called before every request
    #[must_use]
    pub const fn hooks(&self) -> &EventHooks {
        &self.hooks
    }

    /// The connection pool requests are sent through
    #[must_use]
    pub const fn pool(&self) -> &ConnectionPool {
        self.transport.pool()
    }

    /// Connection statistics for the origin of `url`
    ///
    /// Returns empty stats if `url` has no supported origin.
    #[must_use]
    pub fn pool_stats(&self, url: &Url) -> PoolStats {
        crate::pool::Origin::try_from(url)
            .map(|origin| self.pool().stats(&origin))
            .unwrap_or_default()
    }

    /// Maximum number of redirects followed per request
    #[must_use]
    pub const fn max_redirects(&self) -> usize {
        self.max_redirects
    }
}

/// A convenience function to send a single `GET` request with a default
/// client.
///
/// # Errors
///
/// See [`Client::request`].
pub async fn get(url: impl AsRef<str>) -> Result<Response> {
    let client = ClientBuilder::builder().build().client()?;
    client.get(url, RequestOptions::default()).await
}
