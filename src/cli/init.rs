use std::fs;

use anyhow::{Result, anyhow};

use crate::core::AppConfig;
use crate::core::db::{async_db, initialize_db};

pub async fn run(db: bool, config: &AppConfig) -> Result<()> {
    if !db {
        return Err(anyhow!("Missing value for init \"--db\""));
    }

    println!("Initializing db at {}...", config.db_path);
    fs::create_dir_all(&config.storage_path)
        .unwrap_or_else(|err| println!("Ignoring storage directory create failed: {}", err));

    let db = async_db(&config.db_path).await?;
    db.call(|conn| Ok(initialize_db(conn)?)).await?;
    println!("Finished initializing db");

    Ok(())
}
