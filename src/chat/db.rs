use anyhow::{Error, Result};
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::models::{Chat, ChatSummary, DEFAULT_CHAT_TITLE, StoredMessage, User};
use crate::openai::Role;

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        created_at: row.get(1)?,
        current_chat_id: row.get(2)?,
    })
}

fn chat_from_row(row: &Row) -> rusqlite::Result<Chat> {
    Ok(Chat {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub async fn find_user(db: &Connection, user_id: &str) -> Result<Option<User>, Error> {
    let id = user_id.to_owned();
    let user = db
        .call(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, created_at, current_chat_id FROM user WHERE id = ?",
                    [id],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await?;
    Ok(user)
}

/// Look up the user with `user_id` or create one. A new user reuses
/// `user_id` when it's a valid UUID so a browser keeps its identity
/// even if the database was reset.
pub async fn get_or_create_user(db: &Connection, user_id: Option<&str>) -> Result<User, Error> {
    let reusable_id = user_id
        .and_then(|id| Uuid::parse_str(id).ok())
        .map(|id| id.to_string());

    if let Some(id) = &reusable_id
        && let Some(user) = find_user(db, id).await?
    {
        return Ok(user);
    }

    let user = User {
        id: reusable_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        created_at: Utc::now(),
        current_chat_id: None,
    };
    let new_user = user.clone();
    db.call(move |conn| {
        conn.execute(
            "INSERT OR IGNORE INTO user (id, created_at) VALUES (?, ?)",
            params![new_user.id, new_user.created_at],
        )?;
        Ok(())
    })
    .await?;

    tracing::debug!("Created user {}", user.id);
    Ok(user)
}

pub async fn set_current_chat(
    db: &Connection,
    user_id: &str,
    chat_id: Option<&str>,
) -> Result<(), Error> {
    let user_id = user_id.to_owned();
    let chat_id = chat_id.map(String::from);
    db.call(move |conn| {
        conn.execute(
            "UPDATE user SET current_chat_id = ? WHERE id = ?",
            params![chat_id, user_id],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

/// Create a chat for `user_id`. Pass `chat_id` to re-create a chat
/// under a known ID.
pub async fn create_chat(
    db: &Connection,
    user_id: &str,
    chat_id: Option<&str>,
) -> Result<Chat, Error> {
    let now = Utc::now();
    let chat = Chat {
        id: chat_id
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        user_id: user_id.to_owned(),
        title: DEFAULT_CHAT_TITLE.to_string(),
        created_at: now,
        updated_at: now,
    };
    let new_chat = chat.clone();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO chat (id, user_id, title, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            params![
                new_chat.id,
                new_chat.user_id,
                new_chat.title,
                new_chat.created_at,
                new_chat.updated_at
            ],
        )?;
        Ok(())
    })
    .await?;

    tracing::debug!("Created chat {} for user {}", chat.id, chat.user_id);
    Ok(chat)
}

pub async fn find_chat(db: &Connection, chat_id: &str) -> Result<Option<Chat>, Error> {
    let id = chat_id.to_owned();
    let chat = db
        .call(move |conn| {
            let chat = conn
                .query_row(
                    "SELECT id, user_id, title, created_at, updated_at FROM chat WHERE id = ?",
                    [id],
                    chat_from_row,
                )
                .optional()?;
            Ok(chat)
        })
        .await?;
    Ok(chat)
}

/// The chat the user is currently writing to. Creates one and makes it
/// current if the user has none. A current chat that no longer exists
/// is re-created under the same ID.
pub async fn get_or_create_current_chat(db: &Connection, user: &User) -> Result<Chat, Error> {
    if let Some(chat_id) = &user.current_chat_id {
        if let Some(chat) = find_chat(db, chat_id).await? {
            return Ok(chat);
        }
        tracing::warn!("Current chat {} is missing, re-creating it", chat_id);
        return create_chat(db, &user.id, Some(chat_id)).await;
    }

    let chat = create_chat(db, &user.id, None).await?;
    set_current_chat(db, &user.id, Some(&chat.id)).await?;
    Ok(chat)
}

/// All chats for a user, most recently active first.
pub async fn list_chats(db: &Connection, user_id: &str) -> Result<Vec<ChatSummary>, Error> {
    let id = user_id.to_owned();
    let chats = db
        .call(move |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT c.id, c.title, c.created_at, c.updated_at, COUNT(m.id) AS message_count
                FROM chat c
                LEFT JOIN chat_message m ON m.chat_id = c.id
                WHERE c.user_id = ?
                GROUP BY c.id
                ORDER BY c.updated_at DESC, c.created_at DESC
                "#,
            )?;
            let rows = stmt
                .query_map([id], |row| {
                    Ok(ChatSummary {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        created_at: row.get(2)?,
                        updated_at: row.get(3)?,
                        message_count: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await?;
    Ok(chats)
}

/// Messages for a chat in the order they were written.
pub async fn chat_messages(db: &Connection, chat_id: &str) -> Result<Vec<StoredMessage>, Error> {
    let id = chat_id.to_owned();
    let messages = db
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, role, content, timestamp FROM chat_message WHERE chat_id = ? ORDER BY id",
            )?;
            let rows = stmt
                .query_map([id], |row| {
                    Ok(StoredMessage {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        role: row.get(2)?,
                        content: row.get(3)?,
                        timestamp: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await?;
    Ok(messages)
}

/// Store one turn of the conversation. Both messages are written or
/// neither is, and the chat is marked as recently active.
pub async fn insert_exchange(
    db: &Connection,
    chat_id: &str,
    user_content: &str,
    assistant_content: &str,
) -> Result<(), Error> {
    let chat_id = chat_id.to_owned();
    let user_content = user_content.to_owned();
    let assistant_content = assistant_content.to_owned();

    db.call(move |conn| {
        let tx = conn.transaction()?;
        let now = Utc::now();
        for (role, content) in [
            (Role::User, &user_content),
            (Role::Assistant, &assistant_content),
        ] {
            tx.execute(
                "INSERT INTO chat_message (chat_id, role, content, timestamp) VALUES (?, ?, ?, ?)",
                params![chat_id, role, content, now],
            )?;
        }
        tx.execute(
            "UPDATE chat SET updated_at = ? WHERE id = ?",
            params![now, chat_id],
        )?;
        tx.commit()?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn update_chat_title(db: &Connection, chat_id: &str, title: &str) -> Result<(), Error> {
    let chat_id = chat_id.to_owned();
    let title = title.to_owned();
    db.call(move |conn| {
        conn.execute(
            "UPDATE chat SET title = ? WHERE id = ?",
            params![title, chat_id],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

/// Remove every message from a chat but keep the chat itself.
/// Returns the number of messages deleted.
pub async fn clear_messages(db: &Connection, chat_id: &str) -> Result<usize, Error> {
    let chat_id = chat_id.to_owned();
    let deleted = db
        .call(move |conn| {
            let deleted =
                conn.execute("DELETE FROM chat_message WHERE chat_id = ?", [chat_id])?;
            Ok(deleted)
        })
        .await?;
    Ok(deleted)
}

/// Delete a chat and all of its messages. Any user whose current chat
/// it was is left without one.
pub async fn delete_chat(db: &Connection, chat_id: &str) -> Result<(), Error> {
    let chat_id = chat_id.to_owned();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chat_message WHERE chat_id = ?", [&chat_id])?;
        tx.execute("DELETE FROM chat WHERE id = ?", [&chat_id])?;
        tx.execute(
            "UPDATE user SET current_chat_id = NULL WHERE current_chat_id = ?",
            [&chat_id],
        )?;
        tx.commit()?;
        Ok(())
    })
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{async_db, initialize_db};

    async fn test_db() -> Connection {
        let db = async_db(":memory:").await.unwrap();
        db.call(|conn| {
            initialize_db(conn).expect("Failed to migrate db");
            Ok(())
        })
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_get_or_create_user() {
        let db = test_db().await;

        let user = get_or_create_user(&db, None).await.unwrap();
        assert!(Uuid::parse_str(&user.id).is_ok());
        assert!(user.current_chat_id.is_none());

        let same = get_or_create_user(&db, Some(&user.id)).await.unwrap();
        assert_eq!(same.id, user.id);
    }

    #[tokio::test]
    async fn test_get_or_create_user_reuses_valid_unknown_id() {
        let db = test_db().await;
        let id = Uuid::new_v4().to_string();

        let user = get_or_create_user(&db, Some(&id)).await.unwrap();
        assert_eq!(user.id, id);
        assert!(find_user(&db, &id).await.unwrap().is_some());

        let other = get_or_create_user(&db, Some("not-a-uuid")).await.unwrap();
        assert_ne!(other.id, "not-a-uuid");
    }

    #[tokio::test]
    async fn test_create_and_find_chat() {
        let db = test_db().await;
        let user = get_or_create_user(&db, None).await.unwrap();

        let chat = create_chat(&db, &user.id, None).await.unwrap();
        assert_eq!(chat.title, DEFAULT_CHAT_TITLE);
        assert!(chat.has_default_title());

        let found = find_chat(&db, &chat.id).await.unwrap().unwrap();
        assert_eq!(found.id, chat.id);
        assert_eq!(found.user_id, user.id);

        let known = create_chat(&db, &user.id, Some("known-id")).await.unwrap();
        assert_eq!(known.id, "known-id");

        assert!(find_chat(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_current_chat() {
        let db = test_db().await;
        let user = get_or_create_user(&db, None).await.unwrap();
        let chat = create_chat(&db, &user.id, None).await.unwrap();

        set_current_chat(&db, &user.id, Some(&chat.id)).await.unwrap();
        let user = find_user(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(user.current_chat_id, Some(chat.id));

        set_current_chat(&db, &user.id, None).await.unwrap();
        let user = find_user(&db, &user.id).await.unwrap().unwrap();
        assert!(user.current_chat_id.is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_current_chat() {
        let db = test_db().await;
        let user = get_or_create_user(&db, None).await.unwrap();

        let chat = get_or_create_current_chat(&db, &user).await.unwrap();
        let user = find_user(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(user.current_chat_id.as_deref(), Some(chat.id.as_str()));

        let same = get_or_create_current_chat(&db, &user).await.unwrap();
        assert_eq!(same.id, chat.id);
    }

    #[tokio::test]
    async fn test_get_or_create_current_chat_recreates_missing() {
        let db = test_db().await;
        let user = get_or_create_user(&db, None).await.unwrap();
        let chat = get_or_create_current_chat(&db, &user).await.unwrap();
        let user = find_user(&db, &user.id).await.unwrap().unwrap();

        // Remove the chat without touching the user's pointer
        let chat_id = chat.id.clone();
        db.call(move |conn| {
            conn.execute("DELETE FROM chat WHERE id = ?", [chat_id])?;
            Ok(())
        })
        .await
        .unwrap();

        let recreated = get_or_create_current_chat(&db, &user).await.unwrap();
        assert_eq!(recreated.id, chat.id);
        assert!(find_chat(&db, &chat.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_exchange_and_messages() {
        let db = test_db().await;
        let user = get_or_create_user(&db, None).await.unwrap();
        let chat = create_chat(&db, &user.id, None).await.unwrap();

        insert_exchange(&db, &chat.id, "Hi", "Hello!").await.unwrap();
        insert_exchange(&db, &chat.id, "Flights?", "Where to?")
            .await
            .unwrap();

        let messages = chat_messages(&db, &chat.id).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Hi", "Hello!", "Flights?", "Where to?"]);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);

        let updated = find_chat(&db, &chat.id).await.unwrap().unwrap();
        assert!(updated.updated_at >= chat.updated_at);
    }

    #[tokio::test]
    async fn test_insert_exchange_requires_chat() {
        let db = test_db().await;
        assert!(insert_exchange(&db, "missing", "Hi", "Hello").await.is_err());
    }

    #[tokio::test]
    async fn test_list_chats_orders_by_activity() {
        let db = test_db().await;
        let user = get_or_create_user(&db, None).await.unwrap();
        let other_user = get_or_create_user(&db, None).await.unwrap();

        let older = create_chat(&db, &user.id, None).await.unwrap();
        let newer = create_chat(&db, &user.id, None).await.unwrap();
        create_chat(&db, &other_user.id, None).await.unwrap();

        // Writing to the older chat moves it to the top
        insert_exchange(&db, &older.id, "Hi", "Hello!").await.unwrap();

        let chats = list_chats(&db, &user.id).await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, older.id);
        assert_eq!(chats[0].message_count, 2);
        assert_eq!(chats[1].id, newer.id);
        assert_eq!(chats[1].message_count, 0);
    }

    #[tokio::test]
    async fn test_update_chat_title() {
        let db = test_db().await;
        let user = get_or_create_user(&db, None).await.unwrap();
        let chat = create_chat(&db, &user.id, None).await.unwrap();

        update_chat_title(&db, &chat.id, "Trip to Boston").await.unwrap();
        let chat = find_chat(&db, &chat.id).await.unwrap().unwrap();
        assert_eq!(chat.title, "Trip to Boston");
    }

    #[tokio::test]
    async fn test_clear_messages() {
        let db = test_db().await;
        let user = get_or_create_user(&db, None).await.unwrap();
        let chat = create_chat(&db, &user.id, None).await.unwrap();
        insert_exchange(&db, &chat.id, "Hi", "Hello!").await.unwrap();

        assert_eq!(clear_messages(&db, &chat.id).await.unwrap(), 2);
        assert!(chat_messages(&db, &chat.id).await.unwrap().is_empty());
        assert!(find_chat(&db, &chat.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_chat() {
        let db = test_db().await;
        let user = get_or_create_user(&db, None).await.unwrap();
        let chat = create_chat(&db, &user.id, None).await.unwrap();
        insert_exchange(&db, &chat.id, "Hi", "Hello!").await.unwrap();
        set_current_chat(&db, &user.id, Some(&chat.id)).await.unwrap();

        delete_chat(&db, &chat.id).await.unwrap();

        assert!(find_chat(&db, &chat.id).await.unwrap().is_none());
        assert!(chat_messages(&db, &chat.id).await.unwrap().is_empty());
        let user = find_user(&db, &user.id).await.unwrap().unwrap();
        assert!(user.current_chat_id.is_none());
    }
}
