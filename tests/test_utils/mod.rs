//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use tempfile::TempDir;
use tower::util::ServiceExt;

use naviable::api::AppState;
use naviable::api::app;
use naviable::api::session::USER_COOKIE;
use naviable::core::AppConfig;
use naviable::core::db::{async_db, initialize_db};

pub const GENERAL_REPLY: &str = "I can help you plan an accessible trip.";
pub const CHAT_TITLE: &str = "Accessible trip planning";

/// An app wired to a fresh database in a temporary directory. Keep
/// the `TempDir` alive for as long as the router is used.
pub async fn test_app(llm_url: &str, weather_url: &str) -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("naviable.db");
    let db_path = db_path.to_str().unwrap().to_string();

    let db = async_db(&db_path)
        .await
        .expect("Failed to connect to async db");
    db.call(|conn| {
        initialize_db(conn).expect("Failed to migrate db");
        Ok(())
    })
    .await
    .unwrap();

    let app_config = AppConfig {
        storage_path: dir.path().display().to_string(),
        db_path,
        web_ui_path: dir.path().join("web-ui").display().to_string(),
        openai_model: String::from("gpt-4o"),
        openai_api_hostname: llm_url.to_string(),
        openai_api_key: String::from("test-api-key"),
        system_message: String::from("You are NaviAble."),
        openweather_api_url: weather_url.to_string(),
        openweather_api_key: Some(String::from("test-weather-key")),
    };
    let app_state = AppState::new(db, app_config);
    (app(Arc::new(RwLock::new(app_state))), dir)
}

/// Mock the LLM so the general agent replies with `GENERAL_REPLY` and
/// title requests get `CHAT_TITLE`.
pub async fn mock_llm(server: &mut mockito::ServerGuard) -> (mockito::Mock, mockito::Mock) {
    let reply = server
        .mock("POST", "/v1/chat/completions")
        .match_body(mockito::Matcher::Regex(
            "You can help with accessible flights".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body(GENERAL_REPLY))
        .create_async()
        .await;
    let title = server
        .mock("POST", "/v1/chat/completions")
        .match_body(mockito::Matcher::Regex("title of a chat thread".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body(CHAT_TITLE))
        .create_async()
        .await;
    (reply, title)
}

pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_to_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).unwrap()
}

/// The `name=value` pair of the user cookie set by a response, ready
/// to send back in a `cookie` header.
pub fn user_cookie<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", USER_COOKIE)))
        .and_then(|v| v.split(';').next())
        .map(String::from)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("DELETE");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Send a chat message and return the user cookie along with the
/// response body.
pub async fn send_message(
    app: &Router,
    message: &str,
    cookie: Option<&str>,
) -> (Option<String>, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(post_json(
            "/chat",
            serde_json::json!({"message": message}),
            cookie,
        ))
        .await
        .unwrap();
    let cookie = user_cookie(&response);
    (cookie, body_to_json(response.into_body()).await)
}
