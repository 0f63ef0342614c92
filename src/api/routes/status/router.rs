//! Router for the status API

use std::sync::{Arc, RwLock};

use axum::{Json, Router, routing::get};

use super::public;
use crate::api::state::AppState;

type SharedState = Arc<RwLock<AppState>>;

async fn status() -> Json<public::StatusResponse> {
    Json(public::StatusResponse {
        message: String::from("NaviAble API is running!"),
        status: String::from("success"),
        app: String::from("NaviAble - Your Intelligent Navigation Assistant"),
    })
}

pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(status))
}
