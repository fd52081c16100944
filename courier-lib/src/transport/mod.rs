//! Sending requests over pooled HTTP/1.1 connections.
//!
//! The [`Transport`] checks a connection out of the [`ConnectionPool`] (or
//! opens a new one through the [`Connector`]), writes the request and hands
//! back a [`Response`] whose body still owns the connection. The connection
//! goes back to the pool once that body has been read to the end.

mod connect;
mod deadline;

use http::header::{CONNECTION, HOST};
use http::{HeaderValue, Request};
use hyper::body::Incoming;
use hyper::ext::ReasonPhrase;

use crate::pool::{ConnectionPool, Lease, Origin, OriginBucket};
use crate::request::RequestConfig;
use crate::response::{Response, ResponseBody};
use crate::types::OutgoingBody;
use crate::{ErrorKind, Result};

pub(crate) use connect::Connector;
pub(crate) use deadline::{Deadline, within};

/// Dispatches requests over the connection pool.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    pool: ConnectionPool,
    connector: Connector,
}

impl Transport {
    pub(crate) const fn new(pool: ConnectionPool, connector: Connector) -> Self {
        Self { pool, connector }
    }

    pub(crate) const fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Send one request and wait for the response head.
    ///
    /// Connecting, writing the request and reading the response head all
    /// count against `deadline`. The returned body keeps reading under the
    /// same deadline.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Connection`] if the origin cannot be reached or closes
    ///   the connection early
    /// - [`ErrorKind::Timeout`] if the deadline passes
    /// - [`ErrorKind::Protocol`] if the response head is malformed
    pub(crate) async fn send(
        &self,
        config: &RequestConfig,
        body: OutgoingBody,
        deadline: Option<Deadline>,
    ) -> Result<Response> {
        let origin = Origin::try_from(&config.url)?;
        let request = to_http_request(config, &origin, body)?;

        log::trace!("Sending {} {}", config.method, config.url);
        let (mut lease, response) =
            within(deadline, self.exchange(config, &origin, request)).await?;
        lease.record_sent();

        if !config.agent.is_reuse() || wants_close(response.headers()) {
            lease.close_after_use();
        }

        let (parts, incoming) = response.into_parts();
        let status_message = parts
            .extensions
            .get::<ReasonPhrase>()
            .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
            .or_else(|| parts.status.canonical_reason().map(ToString::to_string))
            .unwrap_or_default();

        let body = ResponseBody::new(incoming, lease, origin, deadline);
        Ok(Response::new(
            parts.status,
            status_message,
            parts.headers,
            config.url.clone(),
            body,
        ))
    }

    async fn exchange(
        &self,
        config: &RequestConfig,
        origin: &Origin,
        request: Request<OutgoingBody>,
    ) -> Result<(Lease, http::Response<Incoming>)> {
        let bucket = self.pool.bucket(origin);
        let idle = if config.agent.is_reuse() {
            bucket.checkout_idle().await
        } else {
            None
        };

        let Some(mut lease) = idle else {
            let mut lease = self.open(&bucket).await?;
            let response = lease
                .sender()
                .send_request(request)
                .await
                .map_err(|e| ErrorKind::from_hyper(origin, e))?;
            return Ok((lease, response));
        };

        // A pooled connection may have been closed by the peer after the
        // readiness check. If the request never left, retry on a new one.
        match lease.sender().try_send_request(request).await {
            Ok(response) => Ok((lease, response)),
            Err(mut err) => {
                let Some(request) = err.take_message() else {
                    return Err(ErrorKind::from_hyper(origin, err.into_error()));
                };
                log::debug!("Pooled connection to {origin} was closed, reconnecting");
                drop(lease);

                let mut lease = self.open(&bucket).await?;
                let response = lease
                    .sender()
                    .send_request(request)
                    .await
                    .map_err(|e| ErrorKind::from_hyper(origin, e))?;
                Ok((lease, response))
            }
        }
    }

    async fn open(&self, bucket: &std::sync::Arc<OriginBucket>) -> Result<Lease> {
        let mut sender = self.connector.connect(bucket.origin()).await?;
        sender
            .ready()
            .await
            .map_err(|e| ErrorKind::from_hyper(bucket.origin(), e))?;
        Ok(bucket.lease_fresh(sender))
    }
}

/// Convert the request into the form written to the wire: origin-form
/// request target, `Host` header for this hop.
fn to_http_request(
    config: &RequestConfig,
    origin: &Origin,
    body: OutgoingBody,
) -> Result<Request<OutgoingBody>> {
    let target = match config.url.query() {
        Some(query) => format!("{}?{query}", config.url.path()),
        None => config.url.path().to_string(),
    };

    let mut request = Request::builder()
        .method(config.method.clone())
        .uri(target)
        .body(body)
        .map_err(|e| ErrorKind::InvalidConfig(format!("Cannot build request: {e}")))?;

    let headers = request.headers_mut();
    headers.clone_from(&config.headers);
    if !headers.contains_key(HOST) {
        headers.insert(HOST, HeaderValue::from_str(&origin.host_header())?);
    }
    if !config.agent.is_reuse() {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
    }
    Ok(request)
}

/// Returns `true` if the peer announced it will close the connection.
fn wants_close(headers: &http::HeaderMap) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("close"))
}
