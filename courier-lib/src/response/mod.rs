//! Responses and their single-pass bodies.

mod body;
mod document;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::redirect::Redirects;
use crate::{ErrorKind, Result};

pub(crate) use body::ResponseBody;
pub use document::{Document, Selection};

/// How the body has been accessed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
    Unread,
    /// A materializer such as [`Response::text`] ran
    Buffered,
    /// Chunk iteration started
    Streamed,
}

/// The response to a request, after all redirects were followed.
///
/// Status and headers are available right away. The body is read lazily,
/// exactly once: either with one of the materializers ([`Response::bytes`],
/// [`Response::text`], [`Response::json`], [`Response::html`],
/// [`Response::xml`], [`Response::pipe`], [`Response::discard`]) or chunk by
/// chunk with [`Response::chunk`]. Any further attempt to read the body
/// fails with [`ErrorKind::BodyConsumed`].
///
/// # Examples
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), courier_lib::ErrorKind> {
/// let mut response = courier_lib::get("https://example.com").await?;
/// if response.is_success() {
///     println!("{}", response.text().await?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    status_message: String,
    headers: HeaderMap,
    url: Url,
    redirects: Redirects,
    body: ResponseBody,
    state: BodyState,
}

impl Response {
    pub(crate) fn new(
        status: StatusCode,
        status_message: String,
        headers: HeaderMap,
        url: Url,
        body: ResponseBody,
    ) -> Self {
        Self {
            status,
            status_message,
            headers,
            redirects: Redirects::starting_at(url.clone()),
            url,
            body,
            state: BodyState::Unread,
        }
    }

    /// The status code
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase sent by the server, or the canonical one for the
    /// status code. Empty for unknown codes without a reason phrase.
    #[must_use]
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Returns `true` for status codes 200 to 299.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status.as_u16())
    }

    /// Returns `true` for status codes 300 to 399.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status.as_u16())
    }

    /// Returns `true` for status codes 400 to 499.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status.as_u16())
    }

    /// Returns `true` for status codes 500 to 599.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status.as_u16())
    }

    /// Returns `true` for client and server errors.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_client_error() || self.is_server_error()
    }

    /// Get a header value as a string. Names are case-insensitive.
    ///
    /// Returns `None` if the header is missing or not valid ASCII. For
    /// headers sent more than once the first value is returned.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// All response headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The URL of the request that produced this response
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The URLs requested on the way to this response
    #[must_use]
    pub const fn redirects(&self) -> &Redirects {
        &self.redirects
    }

    pub(crate) fn set_redirects(&mut self, redirects: Redirects) {
        self.redirects = redirects;
    }

    /// Returns `true` once the body has been accessed in any way.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.state != BodyState::Unread
    }

    fn start_buffering(&mut self) -> Result<()> {
        if self.is_consumed() {
            return Err(ErrorKind::BodyConsumed);
        }
        self.state = BodyState::Buffered;
        Ok(())
    }

    /// Read the whole body into memory.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::BodyConsumed`] if the body was already read,
    /// or with a transport error if reading fails.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        self.start_buffering()?;
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next_chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Read the whole body as text. Invalid UTF-8 is replaced.
    ///
    /// # Errors
    ///
    /// See [`Response::bytes`].
    pub async fn text(&mut self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the body and deserialize it from JSON.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::Parse`] if the body is not valid JSON for `T`,
    /// and as described in [`Response::bytes`].
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the body and parse it as an HTML document.
    ///
    /// # Errors
    ///
    /// See [`Response::bytes`].
    pub async fn html(&mut self) -> Result<Document> {
        let text = self.text().await?;
        Ok(Document::parse_html(&text))
    }

    /// Read the body and parse it as an XML document.
    ///
    /// # Errors
    ///
    /// See [`Response::bytes`].
    pub async fn xml(&mut self) -> Result<Document> {
        let text = self.text().await?;
        Ok(Document::parse_xml(&text))
    }

    /// Stream the body into `writer` and flush it. Returns the number of
    /// bytes written.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::Io`] if writing fails, and as described in
    /// [`Response::bytes`].
    pub async fn pipe<W>(&mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.start_buffering()?;
        let mut written = 0;
        while let Some(chunk) = self.body.next_chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }

    /// Read and throw away the rest of the body, so the connection can be
    /// reused.
    ///
    /// # Errors
    ///
    /// See [`Response::bytes`].
    pub async fn discard(&mut self) -> Result<()> {
        self.start_buffering()?;
        while self.body.next_chunk().await?.is_some() {}
        Ok(())
    }

    /// Read the next chunk of the body, or `None` once it ended.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::BodyConsumed`] if a materializer already read
    /// the body, or with a transport error if reading fails.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        if self.state == BodyState::Buffered {
            return Err(ErrorKind::BodyConsumed);
        }
        self.state = BodyState::Streamed;
        self.body.next_chunk().await
    }
}
