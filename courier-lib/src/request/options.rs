use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::pool::ConnectionPolicy;
use crate::{Pairs, RequestBody};

/// Per-request settings passed to [`crate::Client::request`] and the method
/// shorthands.
///
/// At most one of `body`, `text`, `json` and `form` may be set.
///
/// # Examples
///
/// ```
/// use courier_lib::RequestOptions;
/// use std::time::Duration;
///
/// let options = RequestOptions::builder()
///     .headers([("X-Test", "works")])
///     .query([("page", "2")])
///     .form([("foo", "works"), ("bar", "too")])
///     .auth("user:secret")
///     .timeout(Duration::from_secs(5))
///     .build();
/// assert_eq!(options.headers.len(), 1);
/// ```
#[derive(TypedBuilder, Debug, Default)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `RequestOptions`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `RequestOptions`.
"))]
pub struct RequestOptions {
    /// Extra request headers. These replace client default headers of the
    /// same name.
    pub headers: Pairs,

    /// Query parameters, appended to any query the URL already has
    pub query: Pairs,

    /// A raw body, sent as is. The caller is responsible for
    /// `Content-Type`.
    pub body: RequestBody,

    /// A text body, sent with `Content-Type: text/plain` unless a content
    /// type header is set
    #[builder(default, setter(strip_option))]
    pub text: Option<String>,

    /// A JSON body, sent with `Content-Type: application/json`
    #[builder(default, setter(strip_option))]
    pub json: Option<serde_json::Value>,

    /// Form fields, sent urlencoded with
    /// `Content-Type: application/x-www-form-urlencoded`
    #[builder(default, setter(strip_option))]
    pub form: Option<Pairs>,

    /// Basic authentication as `user:pass`. Only the first colon separates
    /// the two parts. Takes precedence over credentials in the URL.
    #[builder(default, setter(strip_option))]
    pub auth: Option<String>,

    /// Connection reuse for this request
    pub agent: ConnectionPolicy,

    /// Overall deadline for this request, redirects and body included.
    /// Overrides the client timeout.
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,
}
