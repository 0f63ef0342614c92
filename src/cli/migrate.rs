use anyhow::{Result, anyhow};

use crate::core::AppConfig;
use crate::core::db::{async_db, migrate_db};

pub async fn run(db: bool, config: &AppConfig) -> Result<()> {
    if !db {
        return Err(anyhow!("Missing value for migrate \"--db\""));
    }

    println!("Migrating db...");
    let db = async_db(&config.db_path).await?;
    let applied = db.call(|conn| Ok(migrate_db(conn)?)).await?;
    println!("Finished migrating db, applied {} migrations", applied);

    Ok(())
}
