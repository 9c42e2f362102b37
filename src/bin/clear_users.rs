//! Deletes every user record.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use gatekeep::{
    auth::repo::{PgUserStore, UserStore},
    config::AppConfig,
    logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init("clear_users=info,gatekeep=info");

    let database_url = AppConfig::database_url_from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("connect to database")?;
    tracing::info!("connected to database");

    let store = PgUserStore::new(db);
    let deleted = store.delete_all().await?;
    tracing::info!(deleted, "{} user(s) deleted", deleted);

    store.pool().close().await;
    Ok(())
}
