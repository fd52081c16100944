//! `test-utils` is used for testing `courier-lib`.
//! This crate does not depend on `courier-lib`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

mod server;

pub use server::TestServer;

/// Create a mock web server, which responds with a predefined status when
/// handling a matching request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Set up a mock server which has two routes: `/ok` and `/redirect`.
/// Calling `/redirect` returns a HTTP Location header redirecting to `/ok`
/// with the given status.
#[macro_export]
macro_rules! redirecting_mock_server {
    ($status:expr, $f:expr) => {{
        use std::str::FromStr;
        use url::Url;

        async {
            let mock_server = wiremock::MockServer::start().await;
            let ok_url = Url::from_str(&format!("{}/ok", mock_server.uri())).unwrap();
            let redirect_url = Url::from_str(&format!("{}/redirect", mock_server.uri())).unwrap();

            // Set up redirect
            let redirect = wiremock::ResponseTemplate::new($status)
                .insert_header("Location", ok_url.as_str());
            wiremock::Mock::given(wiremock::matchers::path("/redirect"))
                .respond_with(redirect)
                .expect(1) // expect the redirect to be requested once
                .mount(&mock_server)
                .await;

            let ok = wiremock::ResponseTemplate::new(http::StatusCode::OK);
            wiremock::Mock::given(wiremock::matchers::path("/ok"))
                .respond_with(ok)
                .expect(1) // expect the redirect to be followed once
                .mount(&mock_server)
                .await;

            $f(redirect_url, ok_url).await;
        }
    }};
}

/// Send a `GET` request with a default client and return the response
#[macro_export]
macro_rules! get_mock_client_response {
    ($url:expr $(,)?) => {
        async {
            ClientBuilder::default()
                .client()
                .unwrap()
                .get($url, RequestOptions::default())
                .await
                .unwrap()
        }
    };
}
