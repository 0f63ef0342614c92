//! Public types for the chats API
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::api::routes::chat::public::{ChatMessage, SuccessResponse};
use crate::chat::ChatSummary;

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatListItem {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: i64,
}

impl From<ChatSummary> for ChatListItem {
    fn from(chat: ChatSummary) -> Self {
        Self {
            id: chat.id,
            title: chat.title,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            message_count: chat.message_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatsResponse {
    pub chats: Vec<ChatListItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChatResponse {
    pub chat_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessagesResponse {
    pub messages: Vec<ChatMessage>,
    pub chat_id: String,
}
