//! `courier` is an HTTP/1.1 client with keep-alive connection pooling and
//! exact redirect handling.
//! "Hello world" example:
//! ```no_run
//! use courier_lib::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let mut response = courier_lib::get("https://example.com").await?;
//!   println!("{}", response.text().await?);
//!   Ok(())
//! }
//! ```
//!
//! For more specific use-cases you can build a client yourself, using the
//! `ClientBuilder`, which can be used to set a base URL, default headers,
//! timeouts and the redirect limit:
//!
//! ```no_run
//! use courier_lib::{ClientBuilder, RequestOptions, Result};
//! use std::time::Duration;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = ClientBuilder::builder()
//!       .base_url(Url::parse("https://example.com").unwrap())
//!       .timeout(Duration::from_secs(20))
//!       .max_redirects(3usize)
//!       .build()
//!       .client()?;
//!
//!   let options = RequestOptions::builder().form([("foo", "bar")]).build();
//!   let mut response = client.post("/form", options).await?;
//!   assert!(response.is_success());
//!   let _document = response.html().await?;
//!   Ok(())
//! }
//! ```
#![deny(missing_docs)]

mod client;
mod hooks;
mod request;
mod response;
mod transport;
mod types;

pub mod pool;
pub mod redirect;

pub use client::{Client, ClientBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_USER_AGENT, get};
pub use hooks::{EventHooks, RequestHook};
pub use request::{RequestConfig, RequestOptions};
pub use response::{Document, Response, Selection};
pub use types::*;
