//! API routes module

pub mod chat;
pub mod chats;
pub mod status;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Health check
        .merge(status::router())
        // Current chat routes
        .merge(chat::router())
        // Chat management routes
        .nest("/chats", chats::router())
}
