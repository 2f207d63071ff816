//! Login proxy: `POST /api/process`.
//!
//! With an upstream URL configured the `input` object is forwarded and the
//! upstream status and JSON body are relayed. Without one, a canned
//! login-shaped response is returned so the batch runner can be exercised
//! locally.

pub mod error;

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::proxy::error::ProxyError;
use crate::utils::error::Result;

/// 與瀏覽器 `encodeURIComponent` 相同的保留字元
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone)]
pub struct ProxyState {
    upstream: Option<String>,
    client: Client,
}

impl ProxyState {
    pub fn new(upstream: Option<String>) -> Self {
        Self {
            upstream: upstream.filter(|url| !url.trim().is_empty()),
            client: Client::new(),
        }
    }

    pub fn upstream(&self) -> Option<&str> {
        self.upstream.as_deref()
    }
}

pub fn proxy_router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/process", post(process))
        .with_state(state)
}

/// 綁定位址並啟動，直到收到 Ctrl-C
pub async fn serve(addr: SocketAddr, state: ProxyState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Login proxy listening on {}", listener.local_addr()?);
    match state.upstream() {
        Some(url) => tracing::info!("📡 Forwarding to upstream {}", url),
        None => tracing::info!("🧪 No upstream configured, serving mock login responses"),
    }

    axum::serve(listener, proxy_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Login proxy shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn process(
    State(state): State<ProxyState>,
    body: Bytes,
) -> std::result::Result<Response, ProxyError> {
    let payload: Value =
        serde_json::from_slice(&body).map_err(|e| ProxyError::InvalidBody(e.to_string()))?;
    let input = payload
        .get("input")
        .filter(|input| !input.is_null())
        .cloned()
        .unwrap_or_else(|| json!({}));

    let Some(upstream) = state.upstream.as_deref() else {
        return Ok(Json(mock_login_response(&input)).into_response());
    };

    tracing::debug!("Forwarding login request to {}", upstream);
    let response = state
        .client
        .post(upstream)
        .json(&json!({ "input": input }))
        .send()
        .await?;
    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let data: Value = response.json().await?;

    Ok((status, Json(data)).into_response())
}

fn mock_login_response(input: &Value) -> Value {
    let email = input.get("email").and_then(Value::as_str).unwrap_or("");
    let cookie_count = Uuid::new_v4().as_bytes()[0] % 5;

    json!({
        "data": {
            "cookie_count": cookie_count,
            "current_url": format!(
                "https://example.com/?email={}",
                utf8_percent_encode(email, URI_COMPONENT)
            ),
            "tokens": {
                "access_token": format!("mock_access_token_{}", Uuid::new_v4().simple()),
                "bearer_token": "true",
                "expires_in": 1800,
                "id_token": "mock_id_token",
                "refresh_token": null,
            },
            "visits_data": {},
        },
        "message": "Login automation completed successfully (mock)",
        "success": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use httpmock::prelude::*;
    use tower::ServiceExt;

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/process")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn mock_mode_returns_login_shaped_payload() {
        let app = proxy_router(ProxyState::new(None));

        let response = app
            .oneshot(post_json(r#"{"input":{"email":"ops+rtm@clinic.test"}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["data"]["tokens"]["access_token"]
            .as_str()
            .unwrap()
            .starts_with("mock_access_token_"));
        assert_eq!(json["data"]["tokens"]["expires_in"], 1800);
        assert!(json["data"]["tokens"]["refresh_token"].is_null());
        assert!(json["data"]["cookie_count"].as_u64().unwrap() < 5);
        assert_eq!(
            json["data"]["current_url"],
            "https://example.com/?email=ops%2Brtm%40clinic.test"
        );
    }

    #[tokio::test]
    async fn missing_input_defaults_to_empty_object() {
        let app = proxy_router(ProxyState::new(None));

        let response = app.oneshot(post_json("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert_eq!(json["data"]["current_url"], "https://example.com/?email=");
    }

    #[tokio::test]
    async fn invalid_body_returns_500_with_message() {
        let app = proxy_router(ProxyState::new(None));

        let response = app.oneshot(post_json("not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = read_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("Invalid request body"));
    }

    #[tokio::test]
    async fn forwards_input_and_relays_upstream_status() {
        let server = MockServer::start_async().await;
        let upstream = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/login")
                    .json_body(json!({ "input": { "email": "a@b.test", "password": "pw" } }));
                then.status(403)
                    .json_body(json!({ "success": false, "message": "bad credentials" }));
            })
            .await;

        let app = proxy_router(ProxyState::new(Some(server.url("/login"))));
        let response = app
            .oneshot(post_json(
                r#"{"input":{"email":"a@b.test","password":"pw"},"extra":1}"#,
            ))
            .await
            .unwrap();

        upstream.assert_async().await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = read_json(response).await;
        assert_eq!(json["message"], "bad credentials");
    }

    #[tokio::test]
    async fn non_json_upstream_body_returns_500() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login");
                then.status(200).body("<html>oops</html>");
            })
            .await;

        let app = proxy_router(ProxyState::new(Some(server.url("/login"))));
        let response = app.oneshot(post_json(r#"{"input":{}}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = read_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn mock_email_is_encoded_like_a_uri_component() {
        let app = proxy_router(ProxyState::new(None));

        let response = app
            .oneshot(post_json(r#"{"input":{"email":"Ada Lovelace (it)@clinic.test"}}"#))
            .await
            .unwrap();

        let json = read_json(response).await;
        assert_eq!(
            json["data"]["current_url"],
            "https://example.com/?email=Ada%20Lovelace%20(it)%40clinic.test"
        );
    }

    #[test]
    fn blank_upstream_means_mock_mode() {
        assert!(ProxyState::new(Some("  ".into())).upstream().is_none());
        assert_eq!(
            ProxyState::new(Some("http://up.test/login".into())).upstream(),
            Some("http://up.test/login")
        );
    }
}
