use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the Bot API token.
pub const TOKEN_ENV: &str = "BOT_TOKEN";
/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "EYBOT_CONFIG";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    #[default]
    Markdown,
    Html,
    Plain,
}

impl std::fmt::Display for ParseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseMode::Markdown => write!(f, "markdown"),
            ParseMode::Html => write!(f, "html"),
            ParseMode::Plain => write!(f, "plain"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Filled from the environment, never from the file.
    #[serde(skip)]
    pub bot_token: String,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub replies: ReplyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default)]
    pub parse_mode: ParseMode,
    #[serde(default = "default_true")]
    pub disable_notification: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            poll_timeout_secs: default_poll_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            parse_mode: ParseMode::default(),
            disable_notification: true,
        }
    }
}

/// Canned texts and triggers used by the reply engine.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplyConfig {
    /// Checked in order; the first prefix match is echoed back.
    #[serde(default = "default_echo_words")]
    pub echo_words: Vec<String>,
    #[serde(default = "default_clapback_trigger")]
    pub clapback_trigger: String,
    #[serde(default = "default_clapback_reply")]
    pub clapback_reply: String,
    #[serde(default = "default_resurrection_message")]
    pub resurrection_message: String,
    #[serde(default = "default_daily_message")]
    pub daily_message: String,
    #[serde(default = "default_true")]
    pub resurrection_enabled: bool,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            echo_words: default_echo_words(),
            clapback_trigger: default_clapback_trigger(),
            clapback_reply: default_clapback_reply(),
            resurrection_message: default_resurrection_message(),
            daily_message: default_daily_message(),
            resurrection_enabled: true,
        }
    }
}

fn default_poll_timeout_secs() -> u32 {
    100
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_echo_words() -> Vec<String> {
    ["ey", "ea", "gelow", "anying"]
        .iter()
        .map(|w| w.to_string())
        .collect()
}

fn default_clapback_trigger() -> String {
    "cicing".to_string()
}

fn default_clapback_reply() -> String {
    "embung".to_string()
}

fn default_resurrection_message() -> String {
    "*BANGKIT DARI KUBUR*".to_string()
}

fn default_daily_message() -> String {
    "ey".to_string()
}

impl Config {
    /// Load from the process environment: `BOT_TOKEN` is required, and the
    /// TOML file named by `EYBOT_CONFIG` (or `eybot.toml`) is read if present.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).ok();
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from("eybot.toml"));

        let mut config = if path.exists() {
            Self::load(&path)?
        } else if explicit.is_some() {
            bail!("Config file not found: {}", path.display());
        } else {
            Config::default()
        };

        config.bot_token = validate_token(token)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;

        if config.telegram.poll_timeout_secs == 0 {
            bail!("telegram.poll_timeout_secs must be greater than zero");
        }
        if config.replies.clapback_trigger.is_empty() {
            bail!("replies.clapback_trigger must not be empty");
        }
        if config.replies.echo_words.iter().any(|w| w.is_empty()) {
            bail!("replies.echo_words must not contain empty words");
        }
        // Prefixes are lowercased before comparing, so the words must be too.
        for word in &mut config.replies.echo_words {
            *word = word.to_lowercase();
        }

        Ok(config)
    }
}

fn validate_token(token: Option<String>) -> Result<String> {
    match token.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => bail!(
            "{} is not set. Please check your environment variable.",
            TOKEN_ENV
        ),
    }
}
