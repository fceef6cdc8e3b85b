mod bot;
mod config;
mod engine;
mod platform;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::engine::ReplyEngine;
use crate::platform::telegram::TelegramSource;
use crate::platform::UpdateSource;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,eybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Poll timeout: {}s", config.telegram.poll_timeout_secs);
    info!("  Parse mode: {}", config.telegram.parse_mode);
    info!("  Echo words: {:?}", config.replies.echo_words);
    info!(
        "  Resurrection notice: {}",
        if config.replies.resurrection_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    let source = TelegramSource::connect(&config.bot_token, config.telegram.clone()).await?;
    let engine = ReplyEngine::new(source.bot_username(), config.replies.clone());

    info!("Bot is starting...");
    bot::run(source, engine).await?;

    Ok(())
}
