//! Integration tests for `SupabaseClient` using wiremock HTTP mocks.

use closet_background::{BackendError, SupabaseClient};
use closet_core::{ProductInfo, Session, User};
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> SupabaseClient {
    SupabaseClient::with_base_url("anon-key", 30, base_url)
        .expect("client construction should not fail")
}

fn session() -> Session {
    Session {
        access_token: "user-token".to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_at: None,
        user: User {
            id: "user-1".to_string(),
            is_anonymous: true,
        },
    }
}

fn product() -> ProductInfo {
    ProductInfo {
        title: "Men's Fleece Pullover Hoodie".to_string(),
        image: "https://www.amazon.com/images/I/main.jpg".to_string(),
        price: "$34.99".to_string(),
        url: "https://www.amazon.com/dp/B0HOODIE".to_string(),
        site: "amazon".to_string(),
        timestamp: "2026-04-01T09:00:00Z".parse().unwrap(),
    }
}

#[tokio::test]
async fn sign_in_anonymously_returns_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "fresh-refresh",
            "user": { "id": "anon-42", "is_anonymous": true, "aud": "authenticated" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = test_client(&server.uri())
        .sign_in_anonymously()
        .await
        .expect("should sign in");

    assert_eq!(session.access_token, "fresh-token");
    assert_eq!(session.refresh_token.as_deref(), Some("fresh-refresh"));
    assert_eq!(session.user.id, "anon-42");
    assert!(session.user.is_anonymous);
    assert!(session.expires_at.is_some());
}

#[tokio::test]
async fn rejected_key_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Invalid API key"
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .sign_in_anonymously()
        .await
        .expect_err("should reject");

    assert!(matches!(err, BackendError::Unauthorized { status: 401, .. }));
}

#[tokio::test]
async fn sign_out_uses_user_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server.uri())
        .sign_out(&session())
        .await
        .expect("should sign out");
}

#[tokio::test]
async fn upload_image_stores_under_user_folder() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/user-images/user-1/[0-9a-f-]{36}\.png$"))
        .and(header("content-type", "image/png"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Key": "user-images/user-1/photo.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let object_path = test_client(&server.uri())
        .upload_image(&session(), vec![0x89, b'P', b'N', b'G'], "image/png")
        .await
        .expect("should upload");

    assert!(object_path.starts_with("user-1/"));
    assert!(object_path.ends_with(".png"));
}

#[tokio::test]
async fn insert_user_image_returns_row_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/user_images"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(serde_json::json!({
            "user_id": "user-1",
            "image_path": "user-1/photo.png"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([
            { "id": "img-9", "user_id": "user-1", "image_path": "user-1/photo.png" }
        ])))
        .mount(&server)
        .await;

    let id = test_client(&server.uri())
        .insert_user_image(&session(), "user-1/photo.png")
        .await
        .expect("should insert");

    assert_eq!(id, "img-9");
}

#[tokio::test]
async fn latest_user_image_id_queries_newest_row() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_images"))
        .and(query_param("select", "id"))
        .and(query_param("user_id", "eq.user-1"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "id": 17 }])))
        .mount(&server)
        .await;

    let id = test_client(&server.uri())
        .latest_user_image_id(&session())
        .await
        .expect("should query");

    assert_eq!(id.as_deref(), Some("17"));
}

#[tokio::test]
async fn latest_user_image_id_is_none_without_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let id = test_client(&server.uri())
        .latest_user_image_id(&session())
        .await
        .expect("should query");

    assert!(id.is_none());
}

#[tokio::test]
async fn invoke_tryon_returns_signed_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/virtual-tryon"))
        .and(body_partial_json(serde_json::json!({
            "productImageUrl": "https://www.amazon.com/images/I/main.jpg",
            "productUrl": "https://www.amazon.com/dp/B0HOODIE",
            "userImageId": "img-9"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "signedUrl": "https://cdn.example.com/tryon/result.png?token=abc"
        })))
        .mount(&server)
        .await;

    let url = test_client(&server.uri())
        .invoke_tryon(&session(), &product(), "img-9")
        .await
        .expect("should generate");

    assert_eq!(url, "https://cdn.example.com/tryon/result.png?token=abc");
}

#[tokio::test]
async fn invoke_tryon_accepts_public_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/virtual-tryon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "publicUrl": "https://cdn.example.com/tryon/public.png"
        })))
        .mount(&server)
        .await;

    let url = test_client(&server.uri())
        .invoke_tryon(&session(), &product(), "img-9")
        .await
        .expect("should generate");

    assert_eq!(url, "https://cdn.example.com/tryon/public.png");
}

#[tokio::test]
async fn http_429_is_limit_exceeded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/virtual-tryon"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .invoke_tryon(&session(), &product(), "img-9")
        .await
        .expect_err("quota");

    assert!(matches!(err, BackendError::LimitExceeded));
}

#[tokio::test]
async fn limit_exceeded_body_is_recognised() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/virtual-tryon"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": "limit_exceeded"
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .invoke_tryon(&session(), &product(), "img-9")
        .await
        .expect_err("quota");

    assert!(matches!(err, BackendError::LimitExceeded));
}

#[tokio::test]
async fn server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/virtual-tryon"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .invoke_tryon(&session(), &product(), "img-9")
        .await
        .expect_err("server error");

    match err {
        BackendError::UnexpectedStatus { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn reply_without_image_url_is_missing_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/virtual-tryon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "queued"
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .invoke_tryon(&session(), &product(), "img-9")
        .await
        .expect_err("no url");

    assert!(matches!(err, BackendError::MissingField { field: "signedUrl", .. }));
}
