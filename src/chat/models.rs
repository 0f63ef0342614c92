//! Records persisted for each browser user and their chats.
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::openai::{Message, Role};

pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub current_chat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_CHAT_TITLE
    }
}

/// A chat as listed in the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&StoredMessage> for Message {
    fn from(msg: &StoredMessage) -> Self {
        Message::new(msg.role, &msg.content)
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
    }
}
