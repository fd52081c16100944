#![allow(unreachable_pub)]

mod basic_auth;
mod body;
pub(crate) mod error;
mod pairs;

pub use basic_auth::BasicAuthCredentials;
pub(crate) use body::OutgoingBody;
pub use body::{BodyChunks, BodyStream, RequestBody};
pub use error::{BoxError, ErrorKind};
pub use pairs::Pairs;

/// The courier `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
