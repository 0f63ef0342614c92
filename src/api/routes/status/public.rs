//! Public types for the status API
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: String,
    pub status: String,
    pub app: String,
}
