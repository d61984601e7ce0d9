//! Contract tests for the three stage clients against a mock backend.

use std::sync::Arc;

use reqwest::Url;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use idsync::client::{BackendHttp, LookupClient, SessionClient, SessionLogin, UpsertClient, UserLookup, UserUpsert};
use idsync::identity::RecordId;
use idsync::{Cause, ExternalIdentity, MemorySessionStore, SessionStore, SyncConfig, SyncError, UpsertPayload};

fn http(server: &MockServer) -> BackendHttp {
    BackendHttp::new(&SyncConfig::new(Url::parse(&server.uri()).unwrap())).expect("http client")
}

fn payload() -> UpsertPayload {
    let identity = ExternalIdentity::new("ext_1", "a@x.com").with_names(Some("Ann"), None);
    UpsertPayload::for_identity(&identity).unwrap()
}

#[tokio::test]
async fn upsert_twice_with_same_external_id_succeeds_twice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(body_json(json!({"email":"a@x.com","name":"Ann","role":"user","externalId":"ext_1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id":"u1","email":"a@x.com"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = UpsertClient::new(http(&server));
    let first = client.upsert(&payload()).await.expect("first upsert");
    let second = client.upsert(&payload()).await.expect("second upsert");
    assert_eq!(first, second);
    assert_eq!(first.id, Some(RecordId::Text("u1".into())));
}

#[tokio::test]
async fn upsert_failure_carries_payload_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"error":"email taken"})))
        .mount(&server)
        .await;

    let err = UpsertClient::new(http(&server)).upsert(&payload()).await.unwrap_err();
    match err {
        SyncError::UpsertFailed { payload: p, cause: Cause::Status { status, body } } => {
            assert_eq!(p, payload());
            assert_eq!(status, 422);
            assert!(body.contains("email taken"), "{body}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn upsert_transport_error_when_backend_is_down() {
    // Reserve a port, then free it so nothing is listening there
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind 127.0.0.1:0");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = SyncConfig::new(Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap());
    let client = UpsertClient::new(BackendHttp::new(&config).unwrap());
    let err = client.upsert(&payload()).await.unwrap_err();
    assert!(err.cause().is_transport(), "{err:?}");
}

#[tokio::test]
async fn lookup_encodes_the_email_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/by-email/a%2Bb%40x.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id":7,"email":"a+b@x.com"})))
        .expect(1)
        .mount(&server)
        .await;

    let record = LookupClient::new(http(&server)).find_by_email("a+b@x.com").await.expect("lookup");
    assert_eq!(record.id, Some(RecordId::Int(7)));
}

#[tokio::test]
async fn lookup_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/by-email/c%40x.com"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = LookupClient::new(http(&server)).find_by_email("c@x.com").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound { ref email, .. } if email == "c@x.com"), "{err:?}");
}

#[tokio::test]
async fn lookup_rejects_a_record_for_another_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/by-email/a%40x.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email":"someone@else.com"})))
        .mount(&server)
        .await;

    let err = LookupClient::new(http(&server)).find_by_email("a@x.com").await.unwrap_err();
    assert_eq!(err.code_str(), "lookup_failed");
    assert!(matches!(err.cause(), Cause::Malformed(_)));
}

#[tokio::test]
async fn login_collects_cookies_and_installs_into_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/google"))
        .and(body_json(json!({"email":"a@x.com"})))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "session=s1; HttpOnly; Path=/; Max-Age=600")
                .append_header("set-cookie", "csrf=c1; Path=/")
                .set_body_json(json!({"message":"logged in"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let client = SessionClient::new(http(&server), "google", store.clone());
    let cred = client.login("a@x.com").await.expect("login");
    assert_eq!(cred.cookie_header, "session=s1; csrf=c1");
    assert_eq!(cred.confirmation["message"], "logged in");
    assert!(store.is_empty(), "login alone must not store the credential");

    client.install(cred);
    assert_eq!(store.get("a@x.com").unwrap().cookie_header, "session=s1; csrf=c1");
}

#[tokio::test]
async fn login_without_cookie_is_login_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/oauth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status":"ok"})))
        .mount(&server)
        .await;

    let client = SessionClient::new(http(&server), "oauth", Arc::new(MemorySessionStore::new()));
    let err = client.login("a@x.com").await.unwrap_err();
    assert_eq!(err.code_str(), "login_failed");
    assert!(matches!(err.cause(), Cause::Malformed(_)));
}
