//! Travel agents that answer a conversation.
pub mod locations;
pub mod supervisor;
pub mod title;

pub use supervisor::{Agent, enforce_role_alternation, respond};
pub use title::generate_title;
