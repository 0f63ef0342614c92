//! Router for listing, opening, and deleting chats

use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use tokio_rusqlite::Connection;

use super::public;
use crate::api::public::ApiError;
use crate::api::session::{current_user, existing_user};
use crate::api::state::AppState;
use crate::chat::db::{
    chat_messages, create_chat, delete_chat, find_chat, list_chats, set_current_chat,
};
use crate::chat::{Chat, User};

type SharedState = Arc<RwLock<AppState>>;

/// Load a chat that must belong to the cookie's user
async fn owned_chat(
    db: &Connection,
    jar: &CookieJar,
    chat_id: &str,
) -> Result<(User, Chat), ApiError> {
    let chat = find_chat(db, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Chat not found"))?;
    match existing_user(db, jar).await? {
        Some(user) if user.id == chat.user_id => Ok((user, chat)),
        _ => Err(ApiError::forbidden()),
    }
}

/// List the user's chats, most recently active first
async fn chat_list(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Json<public::ChatsResponse>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();

    let chats = match existing_user(&db, &jar).await? {
        Some(user) => list_chats(&db, &user.id)
            .await?
            .into_iter()
            .map(public::ChatListItem::from)
            .collect(),
        None => vec![],
    };

    Ok(Json(public::ChatsResponse { chats }))
}

/// Start a new chat and make it the current one
async fn chat_create(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<public::CreateChatResponse>), ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();

    let (user, jar) = current_user(&db, jar).await?;
    let chat = create_chat(&db, &user.id, None).await?;
    set_current_chat(&db, &user.id, Some(&chat.id)).await?;

    Ok((
        jar,
        Json(public::CreateChatResponse {
            chat_id: chat.id,
            status: String::from("created"),
        }),
    ))
}

/// Open a chat: make it current and return its messages
async fn chat_open(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Json<public::ChatMessagesResponse>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();

    let (user, chat) = owned_chat(&db, &jar, &id).await?;
    set_current_chat(&db, &user.id, Some(&chat.id)).await?;
    let messages = chat_messages(&db, &chat.id)
        .await?
        .iter()
        .map(public::ChatMessage::from)
        .collect();

    Ok(Json(public::ChatMessagesResponse {
        messages,
        chat_id: chat.id,
    }))
}

/// Delete a chat and its messages
async fn chat_delete(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Json<public::SuccessResponse>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();

    let (_user, chat) = owned_chat(&db, &jar, &id).await?;
    delete_chat(&db, &chat.id).await?;
    tracing::debug!("Deleted chat {}", chat.id);

    Ok(Json(public::SuccessResponse::new()))
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(chat_list).post(chat_create))
        .route("/{id}", get(chat_open).delete(chat_delete))
}
