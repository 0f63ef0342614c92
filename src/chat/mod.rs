pub mod db;
pub mod models;

pub use models::{Chat, ChatSummary, DEFAULT_CHAT_TITLE, StoredMessage, User};
