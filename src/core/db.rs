//! SQLite connection setup and schema migrations.
use anyhow::{Error, Result};
use rusqlite::Connection as SyncConnection;
use tokio_rusqlite::Connection;

// Each entry is applied once, in order, and recorded in `user_version`
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS user (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        current_chat_id TEXT
    );

    CREATE TABLE IF NOT EXISTS chat (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES user(id),
        title TEXT NOT NULL DEFAULT 'New Chat',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chat_message (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id TEXT NOT NULL REFERENCES chat(id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_chat_user_updated ON chat (user_id, updated_at DESC);
    CREATE INDEX IF NOT EXISTS idx_chat_message_chat ON chat_message (chat_id, id);
    "#,
];

/// Open a connection to the database at `path`. Use `:memory:` for
/// an in-memory database.
pub async fn async_db(path: &str) -> Result<Connection, Error> {
    let db = if path == ":memory:" {
        Connection::open_in_memory().await?
    } else {
        Connection::open(path).await?
    };

    db.call(|conn| {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Ok(())
    })
    .await?;

    Ok(db)
}

/// Create all tables for a fresh database.
pub fn initialize_db(conn: &mut SyncConnection) -> Result<(), rusqlite::Error> {
    migrate_db(conn)?;
    Ok(())
}

/// Apply any migrations that haven't been run yet. Returns the
/// number of migrations applied.
pub fn migrate_db(conn: &mut SyncConnection) -> Result<usize, rusqlite::Error> {
    let current: usize = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let mut applied = 0;

    for (idx, migration) in MIGRATIONS.iter().enumerate().skip(current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration)?;
        tx.pragma_update(None, "user_version", idx + 1)?;
        tx.commit()?;
        tracing::info!("Applied db migration {}", idx + 1);
        applied += 1;
    }

    Ok(applied)
}
