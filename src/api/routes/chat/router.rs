//! Router for the current chat: send a message, read or clear it

use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tokio_rusqlite::Connection;

use super::public;
use crate::ai::agents::{generate_title, respond};
use crate::api::public::ApiError;
use crate::api::session::{current_user, existing_user};
use crate::api::state::AppState;
use crate::chat::db::{
    chat_messages, clear_messages, get_or_create_current_chat, insert_exchange, update_chat_title,
};
use crate::core::AppConfig;
use crate::openai::{Message, Role};

type SharedState = Arc<RwLock<AppState>>;

/// Title a chat from its first message. The exchange is already saved
/// at this point so failures are logged rather than returned.
async fn name_chat(db: &Connection, config: &AppConfig, chat_id: &str, message: &str) {
    let title = generate_title(config, message).await;
    if let Err(e) = update_chat_title(db, chat_id, &title).await {
        tracing::error!("Failed to set title for chat {}: {}", chat_id, e);
    }
}

/// Send a message to the user's current chat and reply with the
/// assistant's response
async fn chat_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    payload: Result<Json<public::ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(&e.body_text()))?;
    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    let (db, config) = {
        let shared_state = state.read().expect("Unable to read share state");
        (shared_state.db.clone(), shared_state.config.clone())
    };

    let (user, jar) = current_user(&db, jar).await?;
    let chat = get_or_create_current_chat(&db, &user).await?;

    let stored = chat_messages(&db, &chat.id).await?;
    let mut history: Vec<Message> = stored.iter().map(Message::from).collect();
    history.push(Message::new(Role::User, &message));

    // Nothing is written when the agent fails so the user can retry
    // the same message
    let reply = match respond(&config, &history).await {
        Ok(reply) => reply,
        Err(e) => return Ok((jar, ApiError::from(e)).into_response()),
    };

    insert_exchange(&db, &chat.id, &message, &reply).await?;

    if stored.is_empty() && chat.has_default_title() {
        name_chat(&db, &config, &chat.id, &message).await;
    }

    let response = public::ChatResponse {
        response: reply,
        chat_id: chat.id,
    };
    Ok((jar, Json(response)).into_response())
}

/// Delete all messages in the current chat
async fn clear_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Json<public::SuccessResponse>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();

    if let Some(chat_id) = existing_user(&db, &jar)
        .await?
        .and_then(|user| user.current_chat_id)
    {
        let deleted = clear_messages(&db, &chat_id).await?;
        tracing::debug!("Cleared {} messages from chat {}", deleted, chat_id);
    }

    Ok(Json(public::SuccessResponse::new()))
}

/// Messages in the current chat
async fn history_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Json<public::HistoryResponse>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();

    let messages = match existing_user(&db, &jar)
        .await?
        .and_then(|user| user.current_chat_id)
    {
        Some(chat_id) => chat_messages(&db, &chat_id)
            .await?
            .iter()
            .map(public::ChatMessage::from)
            .collect(),
        None => vec![],
    };

    Ok(Json(public::HistoryResponse { messages }))
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/clear", post(clear_handler))
        .route("/history", get(history_handler))
}
