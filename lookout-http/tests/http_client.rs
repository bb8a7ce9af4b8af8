use lookout_http::{Auth, HeaderName, HttpClient, HttpError, RequestOpts, StatusCode};
use serde_json::{json, Value};
use std::borrow::Cow;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(&server.uri())
        .expect("mock uri is valid")
        .with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn post_empty_json_sends_query_header_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(query_param("q", "rust lang"))
        .and(header("x-api-key", "k-123"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .post_empty_json(
            "search",
            RequestOpts {
                auth: Some(
                    Auth::api_key_header(HeaderName::from_static("x-api-key"), "k-123").unwrap(),
                ),
                query: Some(vec![("q", Cow::Borrowed("rust lang"))]),
                retries: Some(0),
                ..Default::default()
            },
        )
        .await
        .expect("request succeeds");

    assert_eq!(got, json!({"ok": true}));
}

#[tokio::test]
async fn server_error_without_retry_budget_fails_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .post_empty_json::<Value>(
            "search",
            RequestOpts {
                retries: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    match err {
        HttpError::Api { message, .. } => assert_eq!(message, "boom"),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn retries_transient_status_when_budget_allows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .expect(1)
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .with_retries(1)
        .get_json("items", RequestOpts::default())
        .await
        .expect("second attempt succeeds");

    assert_eq!(got, json!([1, 2]));
}

#[tokio::test]
async fn non_json_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Value>("page", RequestOpts::default())
        .await
        .unwrap_err();

    match err {
        HttpError::Decode(_, snippet) => assert!(snippet.contains("<html>")),
        other => panic!("expected Decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn post_json_sends_body_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_json(json!({"model": "m"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/v1", server.uri())).unwrap();
    let got: Value = client
        .post_json(
            "chat/completions",
            &json!({"model": "m"}),
            RequestOpts {
                auth: Some(Auth::Bearer("sk-test")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(got["id"], "x");
}

#[tokio::test]
async fn post_stream_returns_unread_success_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string("line1\nline2\n"))
        .mount(&server)
        .await;

    let resp = client_for(&server)
        .post_stream("stream", &json!({}), RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "line1\nline2\n");
}
