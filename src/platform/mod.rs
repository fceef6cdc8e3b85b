pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// A text message received in a chat the bot is part of
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The message text, never empty
    pub text: String,
    /// Chat the message was posted in
    pub chat_id: i64,
    /// Display name of the sender, if known
    pub sender: Option<String>,
    /// Title of group chats
    pub chat_title: Option<String>,
    /// e.g. "private", "group", "supergroup", "channel"
    pub chat_type: Option<String>,
}

impl Message {
    #[cfg(test)]
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            chat_id,
            sender: None,
            chat_title: None,
            chat_type: None,
        }
    }

    /// Human-readable chat label for logs.
    pub fn chat_label(&self) -> String {
        match (&self.chat_title, &self.sender) {
            (Some(title), _) => format!("{} ({})", title, self.chat_id),
            (None, Some(sender)) => format!("{} ({})", sender, self.chat_id),
            (None, None) => self.chat_id.to_string(),
        }
    }
}

/// Where messages come from and where replies go.
#[async_trait]
pub trait UpdateSource: Send {
    /// Block until the next unseen text message is available.
    async fn get_latest_message(&mut self) -> Result<Message>;

    /// Fire-and-forget; failures are logged by the implementation.
    async fn send_message(&mut self, chat_id: i64, text: &str);

    fn bot_username(&self) -> &str;
}
