use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use http_body_util::{BodyExt, Empty, Full, StreamBody, combinators::UnsyncBoxBody};
use hyper::body::Frame;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::types::error::BoxError;
use crate::{ErrorKind, Result};

/// Size of the buffer used when reading a request body from an [`AsyncRead`].
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// The chunks of a streaming request body.
pub type BodyChunks = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// The body type handed to the HTTP connection.
pub(crate) type OutgoingBody = UnsyncBoxBody<Bytes, BoxError>;

/// The body of an outgoing request.
///
/// In-memory bodies can be sent any number of times. A [`RequestBody::Stream`]
/// is a single-use resource: once taken it cannot be sent again, which
/// matters when a redirect asks for the request to be repeated.
#[derive(Default)]
pub enum RequestBody {
    /// No body at all
    #[default]
    Empty,
    /// A buffered body, framed with `Content-Length`
    Bytes(Bytes),
    /// A streaming body of unknown length, framed with chunked encoding
    Stream(BodyStream),
}

impl RequestBody {
    /// Stream the body from an [`AsyncRead`] source such as a file.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let chunks = stream::try_unfold(reader, |mut reader| async move {
            let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);
            let read = reader.read_buf(&mut buf).await?;
            Ok::<_, std::io::Error>((read > 0).then(|| (buf.freeze(), reader)))
        });
        Self::Stream(BodyStream::new(chunks))
    }

    /// Stream the body from a stream of byte chunks.
    pub fn from_stream<S>(chunks: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self::Stream(BodyStream::new(chunks))
    }

    /// Returns `true` if there is no body to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Stream(_) => false,
        }
    }

    /// Returns the in-memory content, if the body is buffered.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns a copy that can be sent again, or `None` for streams.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        match self {
            Self::Empty => Some(Self::Empty),
            Self::Bytes(bytes) => Some(Self::Bytes(bytes.clone())),
            Self::Stream(_) => None,
        }
    }

    /// Produce the body for one send over the HTTP connection.
    ///
    /// Buffered bodies stay in place and can be sent again. A stream is
    /// taken, leaving a consumed [`BodyStream`] behind.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BodyConsumed`] if the body is a stream that was
    /// already taken.
    pub(crate) fn take_outgoing(&mut self) -> Result<OutgoingBody> {
        let body = match self {
            Self::Empty => Empty::<Bytes>::new()
                .map_err(|never| -> BoxError { match never {} })
                .boxed_unsync(),
            Self::Bytes(bytes) => Full::new(bytes.clone())
                .map_err(|never| -> BoxError { match never {} })
                .boxed_unsync(),
            Self::Stream(stream) => {
                let frames = stream
                    .take()?
                    .map_ok(Frame::data)
                    .map_err(|e| Box::new(e) as BoxError);
                StreamBody::new(frames).boxed_unsync()
            }
        };
        Ok(body)
    }

    /// Returns `true` if this is a stream that has already been sent.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        match self {
            Self::Stream(stream) => stream.is_consumed(),
            _ => false,
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Self::Stream(stream) => f.debug_tuple("Stream").field(stream).finish(),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes.into())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Bytes(text.into())
    }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for RequestBody {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

/// A single-pass source of body chunks with an explicit consumed flag.
pub struct BodyStream {
    inner: Option<BodyChunks>,
}

impl BodyStream {
    fn new<S>(chunks: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Some(chunks.boxed()),
        }
    }

    /// Returns `true` once the stream has been handed out.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        self.inner.is_none()
    }

    /// Take the chunks out of the stream. Only the first call succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BodyConsumed`] on every call after the first.
    pub fn take(&mut self) -> Result<BodyChunks> {
        self.inner.take().ok_or(ErrorKind::BodyConsumed)
    }
}

impl fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyStream")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
