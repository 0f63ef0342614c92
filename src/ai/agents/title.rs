use anyhow::{Error, Result, anyhow};
use serde_json::json;

use crate::ai::chat::ChatBuilder;
use crate::ai::prompt::{self, Prompt};
use crate::core::AppConfig;
use crate::openai::{Message, Role};

const MAX_TITLE_WORDS: usize = 6;
const FALLBACK_TITLE_CHARS: usize = 60;

/// Title used when the model can't produce one: the start of the
/// user's first message.
pub fn fallback_title(message: &str) -> String {
    message.trim().chars().take(FALLBACK_TITLE_CHARS).collect()
}

// Models sometimes wrap the title in quotes, add a trailing period,
// or ramble on past the first line
fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.trim_start_matches("Title:").trim();
    let title = line
        .split_whitespace()
        .take(MAX_TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    let title = title
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
        .trim_end_matches(['.', '!', '?', ':'])
        .trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

async fn request_title(config: &AppConfig, message: &str) -> Result<String, Error> {
    let prompt = prompt::render(Prompt::ChatTitle, &json!({"message": message}))?;
    let mut chat = ChatBuilder::new(
        &config.openai_api_hostname,
        &config.openai_api_key,
        &config.openai_model,
    )
    .build();
    let response = chat.next_msg(Message::new(Role::User, &prompt)).await?;
    let raw = response
        .last()
        .map(|m| m.text().to_string())
        .unwrap_or_default();
    clean_title(&raw).ok_or(anyhow!("Model returned an empty title"))
}

/// Generate a short title for a chat from its first message. Never
/// fails; falls back to the start of the message.
pub async fn generate_title(config: &AppConfig, message: &str) -> String {
    match request_title(config, message).await {
        Ok(title) => title,
        Err(e) => {
            tracing::warn!("Falling back to default chat title: {}", e);
            fallback_title(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_title_truncates() {
        let message = "a".repeat(100);
        assert_eq!(fallback_title(&message).len(), FALLBACK_TITLE_CHARS);
        assert_eq!(fallback_title("  short  "), "short");
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(
            clean_title("\"Accessible Flights To Boston.\"").as_deref(),
            Some("Accessible Flights To Boston")
        );
        assert_eq!(
            clean_title("Title: Wheelchair friendly hotels in Denver for a family trip\nMore text")
                .as_deref(),
            Some("Wheelchair friendly hotels in Denver for")
        );
        assert_eq!(clean_title("  \n \"\" "), None);
    }

    #[tokio::test]
    async fn test_generate_title_falls_back_on_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .create_async()
            .await;

        let config = AppConfig {
            openai_api_hostname: server.url(),
            ..test_config()
        };
        let title = generate_title(&config, "Hotels in Denver with roll-in showers").await;
        assert_eq!(title, "Hotels in Denver with roll-in showers");
    }

    #[tokio::test]
    async fn test_generate_title() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "Denver accessible hotels"}, "finish_reason": "stop"}]}"#,
            )
            .create_async()
            .await;

        let config = AppConfig {
            openai_api_hostname: server.url(),
            ..test_config()
        };
        let title = generate_title(&config, "Hotels in Denver with roll-in showers").await;
        assert_eq!(title, "Denver accessible hotels");
    }

    fn test_config() -> AppConfig {
        AppConfig {
            storage_path: String::from("."),
            db_path: String::from(":memory:"),
            web_ui_path: String::from("./web-ui/out"),
            openai_model: String::from("gpt-4o"),
            openai_api_hostname: String::from("http://localhost:1"),
            openai_api_key: String::from("test-api-key"),
            system_message: String::from("You are NaviAble."),
            openweather_api_url: String::from("http://localhost:1"),
            openweather_api_key: None,
        }
    }
}
