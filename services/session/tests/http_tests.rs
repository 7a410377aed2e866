//! HTTP surface tests driven through the router without a socket.

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use common::cheap_config;
use session_service::SessionTokenPair;
use session_service::directory::DEMO_USER_ID;
use session_service::http::router;
use session_service::server::build_state;
use std::net::SocketAddr;
use tower::ServiceExt;

async fn app() -> Router {
    let state = build_state(&cheap_config()).await.unwrap();
    let peer: SocketAddr = "198.51.100.7:40000".parse().unwrap();
    router(state).layer(MockConnectInfo(peer))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn refresh(access_token: &str, secret: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/refresh")
        .header(AUTHORIZATION, access_token)
        .body(Body::from(secret.to_string()))
        .unwrap()
}

async fn issue(app: &Router) -> SessionTokenPair {
    let (status, _, body) = send(app, get(&format!("/session?id={DEMO_USER_ID}"))).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_issue_returns_pair_and_cookie() {
    let app = app().await;
    let (status, headers, body) = send(&app, get(&format!("/session?id={DEMO_USER_ID}"))).await;

    assert_eq!(status, StatusCode::OK);
    let pair: SessionTokenPair = serde_json::from_slice(&body).unwrap();
    assert!(!pair.access_token.is_empty());
    assert!(!pair.refresh_token.is_empty());

    let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with(&format!("session={}", pair.access_token)));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_guid_alias_is_accepted() {
    let app = app().await;
    let (status, _, _) = send(&app, get(&format!("/session?guid={DEMO_USER_ID}"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_or_malformed_identity_is_404() {
    let app = app().await;
    for uri in [
        "/session?id=00000000-0000-4000-8000-000000000000".to_string(),
        "/session?id=not-a-uuid".to_string(),
        "/session".to_string(),
    ] {
        let (status, _, _) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_wrong_methods_are_405() {
    let app = app().await;
    let post_session = Request::builder()
        .method("POST")
        .uri(format!("/session?id={DEMO_USER_ID}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, post_session).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _, _) = send(&app, get("/refresh")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_refresh_success_then_uniform_rejections() {
    let app = app().await;
    let pair = issue(&app).await;

    let (status, _, body) = send(&app, refresh(&pair.access_token, &pair.refresh_token)).await;
    assert_eq!(status, StatusCode::OK);
    let rotated: SessionTokenPair = serde_json::from_slice(&body).unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    let (replay_status, _, replay_body) = send(&app, refresh(&pair.access_token, &pair.refresh_token)).await;
    let (tamper_status, _, tamper_body) = send(
        &app,
        refresh(&rotated.access_token, &format!("{}x", rotated.refresh_token)),
    )
    .await;
    let (garbage_status, _, garbage_body) = send(&app, refresh("not.a.jwt", &rotated.refresh_token)).await;

    assert_eq!(replay_status, StatusCode::BAD_REQUEST);
    assert_eq!(tamper_status, StatusCode::BAD_REQUEST);
    assert_eq!(garbage_status, StatusCode::BAD_REQUEST);
    assert_eq!(replay_body, tamper_body);
    assert_eq!(replay_body, garbage_body);
}

#[tokio::test]
async fn test_refresh_accepts_bearer_and_cookie() {
    let app = app().await;

    let pair = issue(&app).await;
    let bearer = refresh(&format!("Bearer {}", pair.access_token), &pair.refresh_token);
    let (status, _, _) = send(&app, bearer).await;
    assert_eq!(status, StatusCode::OK);

    let pair = issue(&app).await;
    let with_cookie = Request::builder()
        .method("POST")
        .uri("/refresh")
        .header(COOKIE, format!("session={}", pair.access_token))
        .body(Body::from(pair.refresh_token.clone()))
        .unwrap();
    let (status, _, _) = send(&app, with_cookie).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_credentials_is_400() {
    let app = app().await;
    let pair = issue(&app).await;

    let no_header = Request::builder()
        .method("POST")
        .uri("/refresh")
        .body(Body::from(pair.refresh_token.clone()))
        .unwrap();
    let (status, _, _) = send(&app, no_header).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, refresh(&pair.access_token, "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = app().await;
    issue(&app).await;

    let (status, _, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("session_service_pairs_issued_total"));
}

#[tokio::test]
async fn test_rejected_requests_are_timed() {
    let app = app().await;
    let (status, _, _) = send(&app, get("/session?id=not-a-uuid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let bare_refresh = Request::builder()
        .method("POST")
        .uri("/refresh")
        .body(Body::from("secret"))
        .unwrap();
    let (status, _, _) = send(&app, bare_refresh).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, _, body) = send(&app, get("/metrics")).await;
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains(r#"session_service_http_latency_seconds_count{route="/session",status="404"}"#));
    assert!(text.contains(r#"session_service_http_latency_seconds_count{route="/refresh",status="400"}"#));
}
