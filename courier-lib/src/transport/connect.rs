use std::sync::Arc;
use std::time::Duration;

use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

use crate::pool::{Origin, Sender};
use crate::{BoxError, ErrorKind, Result};

/// Opens new HTTP/1.1 connections over TCP or TLS.
#[derive(Clone)]
pub(crate) struct Connector {
    tls: TlsConnector,
    connect_timeout: Duration,
}

impl Connector {
    /// Create a connector that trusts the webpki root certificates.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`] if the TLS configuration cannot
    /// be built.
    pub(crate) fn new(connect_timeout: Duration) -> Result<Self> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()
                .map_err(|e| ErrorKind::InvalidConfig(format!("Cannot configure TLS: {e}")))?
                .with_root_certificates(root_store)
                .with_no_client_auth();

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
            connect_timeout,
        })
    }

    /// Open a connection to `origin` and perform the HTTP/1.1 handshake.
    ///
    /// TCP connect and TLS handshake together are bounded by the connect
    /// timeout.
    pub(crate) async fn connect(&self, origin: &Origin) -> Result<Sender> {
        log::trace!("Connecting to {origin}");
        match tokio::time::timeout(self.connect_timeout, self.open(origin)).await {
            Ok(sender) => sender,
            Err(_) => Err(ErrorKind::Timeout(self.connect_timeout)),
        }
    }

    async fn open(&self, origin: &Origin) -> Result<Sender> {
        let tcp = TcpStream::connect((origin.connect_host(), origin.port()))
            .await
            .map_err(|e| connection_error(origin, e))?;
        tcp.set_nodelay(true)
            .map_err(|e| connection_error(origin, e))?;

        if !origin.is_tls() {
            return handshake(origin, tcp).await;
        }

        let server_name = ServerName::try_from(origin.connect_host().to_string())
            .map_err(|e| ErrorKind::InvalidConfig(format!("Invalid TLS server name: {e}")))?;
        let tls = self
            .tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| connection_error(origin, e))?;
        handshake(origin, tls).await
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// Run the HTTP/1.1 client handshake and drive the connection in the
/// background until it closes.
async fn handshake<T>(origin: &Origin, io: T) -> Result<Sender>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io))
        .await
        .map_err(|e| ErrorKind::from_hyper(origin, e))?;

    let origin = origin.clone();
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            log::debug!("Connection to {origin} failed: {e}");
        }
    });
    Ok(sender)
}

fn connection_error(origin: &Origin, source: impl Into<BoxError>) -> ErrorKind {
    ErrorKind::Connection {
        origin: origin.to_string(),
        source: source.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Scheme;

    #[tokio::test]
    async fn test_refused_connection() {
        // Bind and drop a listener to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = Connector::new(Duration::from_secs(5)).unwrap();
        let err = connector
            .connect(&Origin::new(Scheme::Http, "127.0.0.1", port))
            .await
            .unwrap_err();
        assert!(err.is_connection(), "{err:?}");
    }

    #[tokio::test]
    async fn test_plain_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connector = Connector::new(Duration::from_secs(5)).unwrap();
        let origin = Origin::new(Scheme::Http, "127.0.0.1", port);
        let (sender, accepted) = tokio::join!(
            connector.connect(&origin),
            listener.accept()
        );
        assert!(accepted.is_ok());
        assert!(!sender.unwrap().is_closed());
    }
}
