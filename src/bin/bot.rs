//! Chat bot process
//!
//! Long-polls the Bot API and answers `/start`, `/get_books` and inline
//! queries, reading titles straight from the catalog database.

use std::time::Duration;

use anyhow::{bail, Context};
use sqlx::postgres::PgPoolOptions;

use library_server::{
    bot::{telegram::TelegramClient, Bot},
    config::AppConfig,
    logging,
    repository::books::BooksRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let _log_guard = logging::init(&config.logging, "library_server");

    if config.bot.token.is_empty() {
        bail!("Bot token is not configured; set BOT_TOKEN");
    }

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    let poll_timeout = Duration::from_secs(config.bot.poll_timeout_secs);
    let client = TelegramClient::new(&config.bot.api_url, &config.bot.token, poll_timeout)?;

    tracing::info!("Starting bot v{}", env!("CARGO_PKG_VERSION"));

    Bot::new(client, BooksRepository::new(pool), poll_timeout)
        .run()
        .await?;

    Ok(())
}
