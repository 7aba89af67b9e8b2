//! Integration tests for fixture recording and replay.

use tether::{Client, Executor, HttpClient, Method, Request, fixture};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn request(server: &MockServer, route: &str) -> Request {
    let url = url::Url::parse(&format!("{}{route}", server.uri())).expect("valid URL");
    Request::builder(Method::Get, url)
        .header("accept", "text/plain")
        .build()
        .expect("valid request")
}

#[tokio::test]
async fn test_record_then_replay_offline() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/greeting"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-origin", "live")
                .set_body_string("hello"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let recording = Client::new(HttpClient::new(), [fixture::record(dir.path())]);
    let response = recording
        .execute(request(&mock_server, "/greeting"))
        .await
        .expect("live response");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("body"), "hello");

    let name = fixture::fixture_name(&request(&mock_server, "/greeting"));
    assert!(dir.path().join(format!("{name}.req.txt")).exists());
    assert!(dir.path().join(format!("{name}.res.txt")).exists());

    // The mock expects a single call: this one must come from disk.
    let replaying = Client::new(fixture::replay(dir.path()), []);
    let response = replaying
        .execute(request(&mock_server, "/greeting"))
        .await
        .expect("replayed response");
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("x-origin"), Some("live"));
    assert_eq!(response.text().await.expect("body"), "hello");
}

#[tokio::test]
async fn test_replay_without_fixture_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mock_server = MockServer::start().await;

    let replaying = fixture::replay(dir.path());
    let err = replaying
        .execute(request(&mock_server, "/unknown"))
        .await
        .expect_err("no fixture");

    assert_eq!(err.kind(), tether::ErrorKind::Io);
}

#[tokio::test]
async fn test_try_replay_falls_back_and_records() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/count"))
        .respond_with(ResponseTemplate::new(200).set_body_string("42"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let live = Client::new(HttpClient::new(), [fixture::record(dir.path())]);
    let client = Client::new(fixture::try_replay(live, dir.path()), []);

    for _ in 0..3 {
        let response = client
            .execute(request(&mock_server, "/count"))
            .await
            .expect("response");
        assert_eq!(response.text().await.expect("body"), "42");
    }
}
