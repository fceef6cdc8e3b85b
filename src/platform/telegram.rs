use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use teloxide::payloads::setters::*;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, UpdateKind};
use tracing::{debug, info, warn};

use crate::config::{ParseMode, TelegramConfig};
use crate::platform::{Message, UpdateSource};

/// Extra room on top of the long-poll timeout before the HTTP client gives up.
const HTTP_TIMEOUT_MARGIN_SECS: u64 = 10;

/// What one long-poll round produced.
#[derive(Debug, PartialEq, Eq)]
enum PollOutcome {
    Queued(usize),
    /// Long-poll timeout or a batch without text messages; poll again at once.
    Empty,
    /// Transport or API error; poll again after `retry_delay_secs`.
    Failed,
}

/// Long-polling Telegram client that hands out one text message at a time.
pub struct TelegramSource {
    bot: Bot,
    config: TelegramConfig,
    bot_username: String,
    offset: Option<i32>,
    pending: VecDeque<Message>,
}

impl TelegramSource {
    /// Build the client and verify the token with `getMe`.
    pub async fn connect(token: &str, config: TelegramConfig) -> Result<Self> {
        info!("Initialising Telegram client...");

        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(
                u64::from(config.poll_timeout_secs) + HTTP_TIMEOUT_MARGIN_SECS,
            ))
            .build()
            .context("Failed to build HTTP client")?;
        let bot = Bot::with_client(token, client);

        let me = bot.get_me().await.context(
            "Failed to verify API token. Please check your BOT_TOKEN environment variable",
        )?;
        if !me.user.is_bot {
            bail!(
                "Token does not belong to a bot account (got user {})",
                me.user.id.0
            );
        }
        let bot_username = match me.user.username.clone() {
            Some(username) => username,
            None => bail!("Bot account {} has no username", me.user.id.0),
        };

        info!(
            "Connected to Telegram for {} (@{})",
            me.user.first_name, bot_username
        );

        Ok(Self {
            bot,
            config,
            bot_username,
            offset: None,
            pending: VecDeque::new(),
        })
    }

    /// Fetch one batch of updates past the current offset.
    async fn fetch_updates(&self) -> Result<Vec<Update>> {
        let mut request = self
            .bot
            .get_updates()
            .timeout(self.config.poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message]);
        if let Some(offset) = self.offset {
            request = request.offset(offset);
        }

        request.await.context("getUpdates failed")
    }

    /// Fold the result of one `getUpdates` call into the queue.
    fn absorb(&mut self, fetched: Result<Vec<Update>>) -> PollOutcome {
        match fetched {
            Ok(updates) => match self.enqueue(updates) {
                0 => PollOutcome::Empty,
                n => PollOutcome::Queued(n),
            },
            Err(e) => {
                warn!("Telegram polling error: {:#}", e);
                PollOutcome::Failed
            }
        }
    }

    /// Advance the offset past every update and keep the usable ones.
    fn enqueue(&mut self, updates: Vec<Update>) -> usize {
        let mut queued = 0;
        for update in updates {
            self.offset = Some(update.id.as_offset());
            match message_from_update(&update) {
                Some(message) => {
                    self.pending.push_back(message);
                    queued += 1;
                }
                None => debug!("Update {} is not a text message, skipping", update.id.0),
            }
        }
        queued
    }
}

#[async_trait]
impl UpdateSource for TelegramSource {
    async fn get_latest_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(message);
            }

            debug!("Getting latest update (offset {:?})...", self.offset);
            let fetched = self.fetch_updates().await;
            match self.absorb(fetched) {
                PollOutcome::Queued(n) => debug!("Queued {} message(s)", n),
                PollOutcome::Empty => {
                    debug!("Poll timed out or had no text messages, polling again");
                }
                PollOutcome::Failed => {
                    tokio::time::sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
                }
            }
        }
    }

    async fn send_message(&mut self, chat_id: i64, text: &str) {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .disable_notification(self.config.disable_notification);
        if let Some(mode) = telegram_parse_mode(self.config.parse_mode) {
            request = request.parse_mode(mode);
        }

        match request.await {
            Ok(sent) => debug!("Sent message {} to chat {}", sent.id.0, chat_id),
            Err(e) => warn!("Failed to send '{}' to chat {}: {}", text, chat_id, e),
        }
    }

    fn bot_username(&self) -> &str {
        &self.bot_username
    }
}

#[allow(deprecated)]
fn telegram_parse_mode(mode: ParseMode) -> Option<teloxide::types::ParseMode> {
    match mode {
        ParseMode::Markdown => Some(teloxide::types::ParseMode::Markdown),
        ParseMode::Html => Some(teloxide::types::ParseMode::Html),
        ParseMode::Plain => None,
    }
}

/// Normalize an update into a [`Message`]. Anything other than a new,
/// non-empty text message yields `None`.
pub fn message_from_update(update: &Update) -> Option<Message> {
    let UpdateKind::Message(msg) = &update.kind else {
        return None;
    };
    let text = msg.text().filter(|t| !t.is_empty())?;

    let chat_type = if msg.chat.is_private() {
        "private"
    } else if msg.chat.is_supergroup() {
        "supergroup"
    } else if msg.chat.is_group() {
        "group"
    } else {
        "channel"
    };

    Some(Message {
        text: text.to_string(),
        chat_id: msg.chat.id.0,
        sender: msg.from.as_ref().map(|user| user.full_name()),
        chat_title: msg.chat.title().map(str::to_string),
        chat_type: Some(chat_type.to_string()),
    })
}
