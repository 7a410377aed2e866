use super::{ApiError, AppState, SESSION_COOKIE};
use crate::authority::SessionTokenPair;
use crate::metrics;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, MatchedPath, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    id: Option<String>,
    guid: Option<String>,
}

/// `GET /session?id=<uuid>`
pub async fn issue_session(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Response, ApiError> {
    let identity = query
        .id
        .or(query.guid)
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or(ApiError::UnknownIdentity)?;

    if state.directory.find_by_id(identity).await?.is_none() {
        return Err(ApiError::UnknownIdentity);
    }

    let remote_address = client_address(&headers, peer, state.trust_forwarded_for);
    let pair = state.sessions.create_pair(identity, &remote_address).await?;

    Ok(pair_response(&state, pair))
}

/// `POST /refresh` with the raw refresh secret as body.
pub async fn refresh_session(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let token = access_token_from(&headers).ok_or(ApiError::Rejected)?;
    let secret = std::str::from_utf8(&body).map_err(|_| ApiError::Rejected)?;
    if secret.is_empty() {
        return Err(ApiError::Rejected);
    }

    let remote_address = client_address(&headers, peer, state.trust_forwarded_for);
    let access = state.sessions.verify_access_token(&token, &remote_address)?;
    let pair = state.sessions.refresh(&access, secret, &remote_address).await?;

    Ok(pair_response(&state, pair))
}

/// Time every routed request, rejected ones included.
pub async fn track_latency(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |p| p.as_str().to_string());
    let started = Instant::now();
    let response = next.run(request).await;
    metrics::observe_latency(&route, response.status().as_u16(), started.elapsed().as_secs_f64());
    response
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn render_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static("text/plain; version=0.0.4"))],
        metrics::render(),
    )
}

fn pair_response(state: &AppState, pair: SessionTokenPair) -> Response {
    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; Max-Age={}",
        pair.access_token,
        state.access_ttl.as_secs()
    );
    let mut response = Json(pair).into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

/// Access token from `Authorization` (raw or `Bearer`), else the session cookie.
pub(crate) fn access_token_from(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        let value = value.trim();
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .unwrap_or(value)
            .trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Address a pair is bound to: the peer IP without port, or the first
/// `X-Forwarded-For` hop when the proxy is trusted.
pub(crate) fn client_address(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(address) = forwarded {
            return address.to_string();
        }
    }
    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "192.0.2.10:54321".parse().unwrap()
    }

    #[test]
    fn test_client_address_drops_port() {
        assert_eq!(client_address(&HeaderMap::new(), peer(), false), "192.0.2.10");
    }

    #[test]
    fn test_forwarded_for_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5, 10.0.0.1"));

        assert_eq!(client_address(&headers, peer(), false), "192.0.2.10");
        assert_eq!(client_address(&headers, peer(), true), "203.0.113.5");
    }

    #[test]
    fn test_access_token_sources() {
        let mut headers = HeaderMap::new();
        assert!(access_token_from(&headers).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; session=from-cookie"));
        assert_eq!(access_token_from(&headers).as_deref(), Some("from-cookie"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(access_token_from(&headers).as_deref(), Some("from-header"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("raw-token"));
        assert_eq!(access_token_from(&headers).as_deref(), Some("raw-token"));
    }
}
