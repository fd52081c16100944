//! Turning caller input into requests.
//!
//! [`RequestOptions`] is what callers pass in, [`RequestConfig`] is the
//! normalized request that is handed to event hooks, sent by the transport
//! and rewritten by the redirect engine.

mod builder;
mod config;
mod options;

pub(crate) use builder::RequestBuilder;
pub use config::RequestConfig;
pub use options::RequestOptions;
