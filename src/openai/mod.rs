//! Minimal client for OpenAI compatible chat completion APIs.
mod core;
pub use self::core::*;
