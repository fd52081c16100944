//! An ephemeral HTTP server with the routes the client tests talk to.

use std::time::Duration;

use headers::authorization::Basic;
use headers::{Authorization, HeaderMapExt};
use serde_json::{Map, Value, json};
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A running test server, listening on a random local port.
///
/// Routes:
///
/// - `/hello`: `Hello World!` (any method, so also `HEAD`)
/// - `/hello.json`: `{"hello":"world"}`
/// - `GET /status?status=<code>&test=<value>`: empty response with the given
///   status and `X-Test: <value>` (`missing` by default)
/// - `GET /headers?header=<name>`: the value of request header `<name>`
///   (`fail` if absent), with `X-Test: works too`
/// - `PUT /body`: echoes the request body
/// - `POST /form`: `Form: <foo>, <bar>` from an urlencoded body
/// - `/methods`: the request method
/// - `/test.html`, `/test.xml`: small documents
/// - `/auth/basic`: `basic: <user:pass>, body: <body>`
/// - `POST /redirect/<code>?location=<url>&delay=<ms>`: redirect to `<url>`,
///   optionally after `<ms>` milliseconds
/// - `GET /redirect/again`: 302 to `/hello`
/// - `GET /redirect/infinite/<n>/<code>`: redirect to `/redirect/infinite/<n+1>/<code>`
/// - `/redirect/introspect`: JSON with method, selected headers and body
/// - `/redirect/introspect/<code>`: redirect to `/redirect/introspect`
/// - `/delay/<ms>`: `done`, after `<ms>` milliseconds
#[derive(Debug)]
pub struct TestServer {
    server: MockServer,
    base_url: Url,
}

impl TestServer {
    /// Start a new server with all routes mounted.
    ///
    /// # Panics
    ///
    /// Panics if the server address is not a valid URL.
    pub async fn start() -> Self {
        let server = MockServer::builder().start().await;
        let base_url = Url::parse(&server.uri()).expect("mock server URI should be a valid URL");
        let test_server = Self { server, base_url };
        test_server.mount_routes().await;
        test_server
    }

    /// The base URL of the server, e.g. `http://127.0.0.1:34567/`
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The absolute URL of `path` on this server
    ///
    /// # Panics
    ///
    /// Panics if `path` cannot be joined onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("path should form a valid URL")
    }

    /// All requests the server has received so far
    ///
    /// # Panics
    ///
    /// Panics if request recording was disabled.
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .expect("request recording should be enabled")
    }

    /// Shut the server down.
    pub fn stop(self) {
        drop(self.server);
    }

    async fn mount(&self, mock: Mock) {
        mock.mount(&self.server).await;
    }

    #[allow(clippy::too_many_lines)]
    async fn mount_routes(&self) {
        self.mount(
            Mock::given(path("/hello"))
                .respond_with(ResponseTemplate::new(200).set_body_string("Hello World!")),
        )
        .await;

        self.mount(
            Mock::given(path("/hello.json"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hello": "world"}))),
        )
        .await;

        self.mount(
            Mock::given(method("GET"))
                .and(path("/status"))
                .respond_with(|request: &Request| {
                    let status = query(request, "status")
                        .and_then(|status| status.parse::<u16>().ok())
                        .unwrap_or(200);
                    let test = query(request, "test").unwrap_or_else(|| "missing".to_string());
                    ResponseTemplate::new(status).insert_header("X-Test", test.as_str())
                }),
        )
        .await;

        self.mount(
            Mock::given(method("GET"))
                .and(path("/headers"))
                .respond_with(|request: &Request| {
                    let value = query(request, "header")
                        .and_then(|name| header(request, &name))
                        .unwrap_or_else(|| "fail".to_string());
                    ResponseTemplate::new(200)
                        .insert_header("X-Test", "works too")
                        .set_body_string(value)
                }),
        )
        .await;

        self.mount(
            Mock::given(method("PUT"))
                .and(path("/body"))
                .respond_with(|request: &Request| {
                    ResponseTemplate::new(200).set_body_bytes(request.body.clone())
                }),
        )
        .await;

        self.mount(
            Mock::given(method("POST"))
                .and(path("/form"))
                .respond_with(|request: &Request| {
                    let is_form = header(request, "content-type")
                        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
                    let field = |name: &str| {
                        is_form
                            .then(|| {
                                url::form_urlencoded::parse(&request.body)
                                    .find(|(key, _)| key == name)
                                    .map(|(_, value)| value.into_owned())
                            })
                            .flatten()
                            .unwrap_or_else(|| "missing".to_string())
                    };
                    ResponseTemplate::new(200)
                        .set_body_string(format!("Form: {}, {}", field("foo"), field("bar")))
                }),
        )
        .await;

        self.mount(Mock::given(path("/methods")).respond_with(|request: &Request| {
            ResponseTemplate::new(200).set_body_string(request.method.as_str())
        }))
        .await;

        self.mount(
            Mock::given(path("/test.html"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<div>Test<br>123</div>")),
        )
        .await;

        self.mount(Mock::given(path("/test.xml")).respond_with(
            ResponseTemplate::new(200).set_body_string(
                "<?xml version='1.0' encoding='UTF-8'?><script><p>Hello</p></script>",
            ),
        ))
        .await;

        self.mount(Mock::given(path("/auth/basic")).respond_with(|request: &Request| {
            let auth = request
                .headers
                .typed_get::<Authorization<Basic>>()
                .map_or_else(
                    || "nothing".to_string(),
                    |auth| format!("{}:{}", auth.username(), auth.password()),
                );
            let body = if request.body.is_empty() {
                "nothing".to_string()
            } else {
                String::from_utf8_lossy(&request.body).into_owned()
            };
            ResponseTemplate::new(200).set_body_string(format!("basic: {auth}, body: {body}"))
        }))
        .await;

        self.mount(
            Mock::given(method("POST"))
                .and(path_regex(r"^/redirect/\d+$"))
                .respond_with(|request: &Request| {
                    let location = query(request, "location").unwrap_or_default();
                    let delay = query(request, "delay")
                        .and_then(|millis| millis.parse::<u64>().ok())
                        .unwrap_or(0);
                    ResponseTemplate::new(last_segment(request).parse::<u16>().unwrap_or(500))
                        .insert_header("Location", location.as_str())
                        .set_delay(Duration::from_millis(delay))
                }),
        )
        .await;

        let hello = self.url("/hello");
        self.mount(
            Mock::given(method("GET"))
                .and(path("/redirect/again"))
                .respond_with(ResponseTemplate::new(302).insert_header("Location", hello.as_str())),
        )
        .await;

        let base_url = self.base_url.clone();
        self.mount(
            Mock::given(method("GET"))
                .and(path_regex(r"^/redirect/infinite/\d+/\d+$"))
                .respond_with(move |request: &Request| {
                    let segments: Vec<&str> = request.url.path().rsplit('/').take(2).collect();
                    let (code, num) = (segments[0], segments[1]);
                    let next = num.parse::<u32>().unwrap_or(0) + 1;
                    let location = base_url
                        .join(&format!("/redirect/infinite/{next}/{code}"))
                        .expect("redirect target should be a valid URL");
                    ResponseTemplate::new(code.parse::<u16>().unwrap_or(500))
                        .insert_header("Location", location.as_str())
                }),
        )
        .await;

        self.mount(
            Mock::given(path("/redirect/introspect")).respond_with(|request: &Request| {
                let mut headers = Map::new();
                for (key, name) in [
                    ("authorization", "authorization"),
                    ("content", "content-disposition"),
                    ("cookie", "cookie"),
                    ("referer", "referer"),
                    ("test", "x-test"),
                ] {
                    if let Some(value) = header(request, name) {
                        headers.insert(key.to_string(), Value::String(value));
                    }
                }
                ResponseTemplate::new(200).set_body_json(json!({
                    "method": request.method.as_str(),
                    "headers": headers,
                    "body": String::from_utf8_lossy(&request.body),
                }))
            }),
        )
        .await;

        let introspect = self.url("/redirect/introspect");
        self.mount(
            Mock::given(path_regex(r"^/redirect/introspect/\d+$")).respond_with(
                move |request: &Request| {
                    ResponseTemplate::new(last_segment(request).parse::<u16>().unwrap_or(500))
                        .insert_header("Location", introspect.as_str())
                },
            ),
        )
        .await;

        self.mount(
            Mock::given(path_regex(r"^/delay/\d+$")).respond_with(|request: &Request| {
                let millis = last_segment(request).parse::<u64>().unwrap_or(0);
                ResponseTemplate::new(200)
                    .set_body_string("done")
                    .set_delay(Duration::from_millis(millis))
            }),
        )
        .await;
    }
}

fn query(request: &Request, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn last_segment(request: &Request) -> &str {
    request.url.path().rsplit('/').next().unwrap_or_default()
}
