use std::time::Duration;

use courier_lib::pool::{ConnectionPolicy, ConnectionPool, Origin};
use courier_lib::{
    Client, ClientBuilder, ErrorKind, RequestBody, RequestConfig, RequestOptions, Result,
};
use http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use test_utils::{TestServer, get_mock_client_response, mock_server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn client(server: &TestServer) -> Client {
    ClientBuilder::builder()
        .base_url(server.base_url().clone())
        .user_agent("courier 1.0")
        .pool(ConnectionPool::default())
        .build()
        .client()
        .unwrap()
}

fn none() -> RequestOptions {
    RequestOptions::default()
}

#[tokio::test]
async fn test_hello_world() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    let mut res = client.get("/hello", none()).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.status_message(), "OK");
    assert_eq!(res.url(), &server.url("/hello"));
    assert_eq!(res.text().await?, "Hello World!");

    server.stop();
    Ok(())
}

#[tokio::test]
async fn test_status() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    // (status, success, redirect, client error, server error)
    let cases = [
        (200, true, false, false, false),
        (201, true, false, false, false),
        (299, true, false, false, false),
        (302, false, true, false, false),
        (404, false, false, true, false),
        (500, false, false, false, true),
        (599, false, false, false, true),
    ];

    for (status, success, redirect, client_error, server_error) in cases {
        let mut res = client
            .get(format!("/status?status={status}"), none())
            .await?;
        assert_eq!(res.status().as_u16(), status);
        assert_eq!(res.is_success(), success, "{status}");
        assert_eq!(res.is_redirect(), redirect, "{status}");
        assert_eq!(res.is_client_error(), client_error, "{status}");
        assert_eq!(res.is_server_error(), server_error, "{status}");
        assert_eq!(res.is_error(), client_error || server_error, "{status}");
        assert_eq!(res.text().await?, "");
    }
    Ok(())
}

#[tokio::test]
async fn test_headers() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    let mut res = client.get("/headers?header=user-agent", none()).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.header("X-Test"), Some("works too"));
    assert_eq!(res.header("x-test"), Some("works too"));
    assert_eq!(res.text().await?, "courier 1.0");

    let options = RequestOptions::builder()
        .headers([("test", "works")])
        .build();
    let mut res = client.get("/headers?header=test", options).await?;
    assert_eq!(res.header("X-Test"), Some("works too"));
    assert_eq!(res.text().await?, "works");
    Ok(())
}

#[tokio::test]
async fn test_default_user_agent() -> Result<()> {
    let server = TestServer::start().await;
    let client = ClientBuilder::builder()
        .base_url(server.base_url().clone())
        .build()
        .client()?;

    let mut res = client.get("/headers?header=user-agent", none()).await?;
    assert_eq!(res.text().await?, courier_lib::DEFAULT_USER_AGENT);
    Ok(())
}

#[tokio::test]
async fn test_body() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    let options = RequestOptions::builder().body("Body works!").build();
    let mut res = client.put("/body", options).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "Body works!");

    let options = RequestOptions::builder().text("I ♥ courier!").build();
    let mut res = client.put("/body", options).await?;
    assert_eq!(res.text().await?, "I ♥ courier!");

    let options = RequestOptions::builder()
        .body("I ♥ courier!".as_bytes().to_vec())
        .build();
    let mut res = client.put("/body", options).await?;
    assert_eq!(res.bytes().await?, "I ♥ courier!".as_bytes());

    let options = RequestOptions::builder().body("I ♥ courier!").build();
    let mut res = client.put("/body", options).await?;
    let mut parts = Vec::new();
    while let Some(chunk) = res.chunk().await? {
        parts.extend_from_slice(&chunk);
    }
    assert_eq!(String::from_utf8(parts).unwrap(), "I ♥ courier!");
    assert!(res.chunk().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_query() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    let options = RequestOptions::builder()
        .query([("header", "user-agent")])
        .build();
    let mut res = client.get("/headers", options).await?;
    assert_eq!(res.header("X-Test"), Some("works too"));
    assert_eq!(res.text().await?, "courier 1.0");

    let options = RequestOptions::builder()
        .query([("status", "201"), ("test", "works")])
        .build();
    let mut res = client.get("/status", options).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.header("X-Test"), Some("works"));
    assert_eq!(res.text().await?, "");
    Ok(())
}

#[tokio::test]
async fn test_json() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    let mut res = client.get("/hello.json", none()).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({"hello": "world"}));

    let mut res = client.get("/hello", none()).await?;
    assert!(matches!(
        res.json::<Value>().await,
        Err(ErrorKind::Parse(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_form() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    let options = RequestOptions::builder().form([("foo", "works")]).build();
    let mut res = client.post("/form", options).await?;
    assert_eq!(res.text().await?, "Form: works, missing");

    let options = RequestOptions::builder()
        .form([("foo", "works"), ("bar", "too")])
        .build();
    let mut res = client.post("/form", options).await?;
    assert_eq!(res.text().await?, "Form: works, too");

    let options = RequestOptions::builder()
        .json(json!({"foo": "works", "bar": "too"}))
        .build();
    let mut res = client.post("/form", options).await?;
    assert_eq!(res.text().await?, "Form: missing, missing");

    let options = RequestOptions::builder()
        .form([("foo", "w(o-&2F%2F)r k  s"), ("bar", "%&!@#$%^&*&&%")])
        .build();
    let mut res = client.post("/form", options).await?;
    assert_eq!(res.text().await?, "Form: w(o-&2F%2F)r k  s, %&!@#$%^&*&&%");
    Ok(())
}

#[tokio::test]
async fn test_methods() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    assert_eq!(client.delete("/methods", none()).await?.text().await?, "DELETE");
    assert_eq!(client.get("/methods", none()).await?.text().await?, "GET");
    assert_eq!(client.options("/methods", none()).await?.text().await?, "OPTIONS");
    assert_eq!(client.patch("/methods", none()).await?.text().await?, "PATCH");
    assert_eq!(client.post("/methods", none()).await?.text().await?, "POST");
    assert_eq!(client.put("/methods", none()).await?.text().await?, "PUT");
    assert_eq!(client.request("put", "/methods", none()).await?.text().await?, "PUT");

    let mut res = client.head("/hello", none()).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.header("Content-Length"), Some("12"));
    assert_eq!(res.text().await?, "");

    let err = client.request("GE T", "/methods", none()).await.unwrap_err();
    assert!(err.is_invalid_config());
    Ok(())
}

#[tokio::test]
async fn test_streams() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("hello.txt");

    let options = RequestOptions::builder().body("Hello courier!").build();
    let mut res = client.put("/body", options).await?;
    let mut file = tokio::fs::File::create(&path).await?;
    assert_eq!(res.pipe(&mut file).await?, 14);
    drop(file);
    assert_eq!(tokio::fs::read_to_string(&path).await?, "Hello courier!");

    let file = tokio::fs::File::open(&path).await?;
    let options = RequestOptions::builder()
        .body(RequestBody::from_reader(file))
        .build();
    let mut res = client.put("/body", options).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "Hello courier!");
    Ok(())
}

#[tokio::test]
async fn test_basic_authentication() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    let options = RequestOptions::builder().auth("foo:bar").build();
    let mut res = client.get("/auth/basic", options).await?;
    assert_eq!(res.text().await?, "basic: foo:bar, body: nothing");

    let mut res = client.get("/auth/basic", none()).await?;
    assert_eq!(res.text().await?, "basic: nothing, body: nothing");

    let options = RequestOptions::builder()
        .auth("foo:bar:baz")
        .body("test")
        .build();
    let mut res = client.get("/auth/basic", options).await?;
    assert_eq!(res.text().await?, "basic: foo:bar:baz, body: test");

    let mut url = server.url("/auth/basic");
    url.set_username("foo@example.com").unwrap();
    url.set_password(Some("bar")).unwrap();
    let mut res = client.get(url, none()).await?;
    assert_eq!(res.text().await?, "basic: foo@example.com:bar, body: nothing");
    assert_eq!(res.url(), &server.url("/auth/basic"));
    Ok(())
}

#[tokio::test]
async fn test_events() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    client.once(|config: &mut RequestConfig| {
        config.url.query_pairs_mut().append_pair("status", "201");
    });
    let mut res = client.get("/status", none()).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.text().await?, "");

    // `once` hooks are gone after the first request
    let mut res = client.get("/status", none()).await?;
    assert_eq!(res.status(), StatusCode::OK);
    res.discard().await?;

    client.on(|config: &mut RequestConfig| {
        config
            .headers
            .insert("test", http::HeaderValue::from_static("from hook"));
    });
    let mut res = client.get("/headers?header=test", none()).await?;
    assert_eq!(res.text().await?, "from hook");
    Ok(())
}

#[tokio::test]
async fn test_connection_reuse() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);
    let origin = Origin::try_from(server.base_url())?;

    for _ in 0..3 {
        let mut res = client.get("/hello", none()).await?;
        assert_eq!(res.text().await?, "Hello World!");
    }

    let stats = client.pool().stats(&origin);
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.reused, 2);
    assert_eq!(stats.requests, 3);
    assert_eq!(client.pool().idle_count(&origin), 1);
    assert_eq!(client.pool().in_flight(&origin), 0);
    Ok(())
}

#[tokio::test]
async fn test_no_reuse_agent() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);
    let origin = Origin::try_from(server.base_url())?;

    for _ in 0..2 {
        let options = RequestOptions::builder()
            .agent(ConnectionPolicy::NoReuse)
            .build();
        let mut res = client.get("/hello", options).await?;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await?, "Hello World!");
    }

    let stats = client.pool().stats(&origin);
    assert_eq!(stats.opened, 2);
    assert_eq!(stats.reused, 0);
    assert_eq!(stats.closed, 2);
    assert_eq!(client.pool().idle_count(&origin), 0);

    let requests = server.received_requests().await;
    assert!(requests.iter().all(|request| {
        request
            .headers
            .get("connection")
            .is_some_and(|value| value == "close")
    }));

    // the default agent keeps the connection alive again
    let mut res = client.get("/hello", none()).await?;
    assert_eq!(res.text().await?, "Hello World!");
    assert_eq!(client.pool().idle_count(&origin), 1);
    Ok(())
}

#[tokio::test]
async fn test_abandoned_body_closes_connection() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);
    let origin = Origin::try_from(server.base_url())?;

    let res = client.get("/hello", none()).await?;
    assert_eq!(client.pool().in_flight(&origin), 1);
    drop(res);

    assert_eq!(client.pool().in_flight(&origin), 0);
    assert_eq!(client.pool().idle_count(&origin), 0);
    assert_eq!(client.pool().stats(&origin).closed, 1);
    Ok(())
}

#[tokio::test]
async fn test_origins_have_separate_pools() -> Result<()> {
    let first = TestServer::start().await;
    let second = TestServer::start().await;
    let pool = ConnectionPool::default();
    let client = ClientBuilder::builder().pool(pool.clone()).build().client()?;

    client.get(first.url("/hello"), none()).await?.discard().await?;
    client.get(second.url("/hello"), none()).await?.discard().await?;

    assert_eq!(pool.origin_count(), 2);
    assert_eq!(pool.idle_count(&Origin::try_from(first.base_url())?), 1);
    assert_eq!(pool.idle_count(&Origin::try_from(second.base_url())?), 1);
    Ok(())
}

#[tokio::test]
async fn test_timeout() -> Result<()> {
    let server = TestServer::start().await;
    let client = ClientBuilder::builder()
        .base_url(server.base_url().clone())
        .timeout(Duration::from_millis(200))
        .pool(ConnectionPool::default())
        .build()
        .client()?;

    let err = client.get("/delay/2000", none()).await.unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
    assert!(matches!(err, ErrorKind::Timeout(timeout) if timeout == Duration::from_millis(200)));

    // per-request timeouts override the client one
    let options = RequestOptions::builder()
        .timeout(Duration::from_secs(5))
        .build();
    let mut res = client.get("/delay/300", options).await?;
    assert_eq!(res.text().await?, "done");

    let origin = Origin::try_from(server.base_url())?;
    assert!(client.pool().stats(&origin).closed >= 1);
    Ok(())
}

#[tokio::test]
async fn test_connection_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = ClientBuilder::default().client().unwrap();
    let err = client
        .get(format!("http://127.0.0.1:{port}/"), none())
        .await
        .unwrap_err();
    assert!(err.is_connection(), "{err:?}");
}

#[tokio::test]
async fn test_protocol_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0; 1024];
        let _ = socket.read(&mut buf).await;
        socket.write_all(b"NOT HTTP AT ALL\r\n\r\n").await.unwrap();
        let _ = socket.shutdown().await;
    });

    let client = ClientBuilder::builder()
        .pool(ConnectionPool::default())
        .build()
        .client()
        .unwrap();
    let err = client
        .get(format!("http://127.0.0.1:{port}/"), none())
        .await
        .unwrap_err();
    assert!(matches!(err, ErrorKind::Protocol { .. }), "{err:?}");
}

#[tokio::test]
async fn test_body_can_only_be_consumed_once() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    let mut res = client.get("/hello", none()).await?;
    assert!(!res.is_consumed());
    assert_eq!(res.text().await?, "Hello World!");
    assert!(res.is_consumed());
    assert!(matches!(res.text().await, Err(ErrorKind::BodyConsumed)));
    assert!(matches!(res.chunk().await, Err(ErrorKind::BodyConsumed)));
    assert!(matches!(res.discard().await, Err(ErrorKind::BodyConsumed)));

    let mut res = client.get("/hello", none()).await?;
    assert!(res.chunk().await?.is_some());
    assert!(matches!(res.bytes().await, Err(ErrorKind::BodyConsumed)));
    assert!(matches!(res.html().await, Err(ErrorKind::BodyConsumed)));
    Ok(())
}

#[tokio::test]
async fn test_html_and_xml() -> Result<()> {
    let server = TestServer::start().await;
    let client = client(&server);

    let html = client.get("/test.html", none()).await?.html().await?;
    assert_eq!(html.select("div")?.text(), "Test123");

    let xml = client.get("/test.xml", none()).await?.xml().await?;
    assert_eq!(xml.select("script p")?.len(), 1);
    assert_eq!(xml.select("script p")?.text(), "Hello");

    let html = client.get("/test.xml", none()).await?.html().await?;
    assert_eq!(html.select("script p")?.len(), 0);
    Ok(())
}

#[tokio::test]
async fn test_free_get_function() -> Result<()> {
    let server = TestServer::start().await;
    let mut res = courier_lib::get(server.url("/hello")).await?;
    assert_eq!(res.text().await?, "Hello World!");
    Ok(())
}

#[tokio::test]
async fn test_mock_server_status() {
    let mock = mock_server!(StatusCode::NOT_FOUND, set_body_string("gone"));
    let mut res = get_mock_client_response!(mock.uri()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.is_client_error());
    assert_eq!(res.status_message(), "Not Found");
    assert_eq!(res.text().await.unwrap(), "gone");
}
