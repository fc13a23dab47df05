use anyhow::Context;

use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(config: &AppConfig) -> anyhow::Result<()> {
    let database = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    database.migrate().await.context("failed to apply migrations")?;
    database.close().await;

    println!("Migrations applied");
    Ok(())
}
