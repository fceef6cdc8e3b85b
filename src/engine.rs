use std::collections::HashSet;

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::config::ReplyConfig;
use crate::platform::Message;

/// Which rule produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Resurrection,
    Daily,
    Clapback,
    Echo,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::Resurrection => write!(f, "resurrection"),
            Rule::Daily => write!(f, "daily"),
            Rule::Clapback => write!(f, "clapback"),
            Rule::Echo => write!(f, "echo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub rule: Rule,
    pub text: String,
}

impl Reply {
    fn new(rule: Rule, text: impl Into<String>) -> Self {
        Self {
            rule,
            text: text.into(),
        }
    }
}

/// Mutable state carried across messages for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct EngineState {
    last_broadcast_day: NaiveDate,
    greeted_chats: HashSet<i64>,
}

impl EngineState {
    /// Fresh state; `started_on` counts as already broadcast.
    pub fn new(started_on: NaiveDate) -> Self {
        Self {
            last_broadcast_day: started_on,
            greeted_chats: HashSet::new(),
        }
    }

    #[cfg(test)]
    pub fn last_broadcast_day(&self) -> NaiveDate {
        self.last_broadcast_day
    }

    #[cfg(test)]
    pub fn is_greeted(&self, chat_id: i64) -> bool {
        self.greeted_chats.contains(&chat_id)
    }

    pub fn greeted_count(&self) -> usize {
        self.greeted_chats.len()
    }
}

/// Picks at most one canned reply per message.
///
/// Rules are tried in order and the first one that fires wins:
/// resurrection notice, daily message, mention clapback, echo.
pub struct ReplyEngine {
    bot_username: String,
    replies: ReplyConfig,
}

impl ReplyEngine {
    pub fn new(bot_username: impl Into<String>, replies: ReplyConfig) -> Self {
        Self {
            bot_username: bot_username.into(),
            replies,
        }
    }

    /// Evaluate against the local calendar day.
    pub fn reply_now(&self, message: &Message, state: &mut EngineState) -> Option<Reply> {
        self.reply(message, state, Local::now().date_naive())
    }

    pub fn reply(
        &self,
        message: &Message,
        state: &mut EngineState,
        today: NaiveDate,
    ) -> Option<Reply> {
        self.resurrection(message.chat_id, state)
            .or_else(|| self.daily(state, today))
            .or_else(|| self.clapback(&message.text))
            .or_else(|| self.echo(&message.text))
    }

    fn resurrection(&self, chat_id: i64, state: &mut EngineState) -> Option<Reply> {
        if !self.replies.resurrection_enabled || !state.greeted_chats.insert(chat_id) {
            return None;
        }
        Some(Reply::new(
            Rule::Resurrection,
            self.replies.resurrection_message.as_str(),
        ))
    }

    fn daily(&self, state: &mut EngineState, today: NaiveDate) -> Option<Reply> {
        if today <= state.last_broadcast_day {
            return None;
        }
        debug!(
            "Daily message due, last sent on {}",
            state.last_broadcast_day
        );
        state.last_broadcast_day = today;
        Some(Reply::new(Rule::Daily, self.replies.daily_message.as_str()))
    }

    fn clapback(&self, text: &str) -> Option<Reply> {
        let mentioned = text.contains(self.bot_username.as_str());
        let provoked = text.contains(self.replies.clapback_trigger.as_str());
        if mentioned && provoked {
            Some(Reply::new(Rule::Clapback, self.replies.clapback_reply.as_str()))
        } else {
            None
        }
    }

    fn echo(&self, text: &str) -> Option<Reply> {
        self.replies
            .echo_words
            .iter()
            .find_map(|word| echo_match(text, word))
            .map(|prefix| Reply::new(Rule::Echo, prefix))
    }
}

/// Returns the leading `word.chars().count()` characters of `text` in their
/// original casing if they lowercase to `word`.
fn echo_match<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let len = word.chars().count();
    let end = text
        .char_indices()
        .nth(len)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let prefix = &text[..end];
    (prefix.to_lowercase() == word).then_some(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn msg(chat_id: i64, text: &str) -> Message {
        Message::new(chat_id, text)
    }

    fn engine() -> ReplyEngine {
        ReplyEngine::new("EyBot", ReplyConfig::default())
    }

    /// State where chat 1 is greeted and today's daily message already went out.
    fn settled_state() -> EngineState {
        let mut state = EngineState::new(day(1));
        state.greeted_chats.insert(1);
        state
    }

    #[test]
    fn test_resurrection_once_per_chat() {
        let engine = engine();
        let mut state = EngineState::new(day(1));

        let first = engine.reply(&msg(1, "hello"), &mut state, day(1)).unwrap();
        assert_eq!(first.rule, Rule::Resurrection);
        assert_eq!(first.text, "*BANGKIT DARI KUBUR*");
        assert!(state.is_greeted(1));

        assert_eq!(engine.reply(&msg(1, "hello"), &mut state, day(1)), None);

        let other = engine.reply(&msg(2, "hello"), &mut state, day(1)).unwrap();
        assert_eq!(other.rule, Rule::Resurrection);
        assert_eq!(state.greeted_count(), 2);
    }

    #[test]
    fn test_resurrection_beats_everything() {
        let engine = engine();
        let mut state = EngineState::new(day(1));
        let reply = engine
            .reply(&msg(9, "ey EyBot cicing"), &mut state, day(2))
            .unwrap();
        assert_eq!(reply.rule, Rule::Resurrection);
        // Daily did not get evaluated, so it is still pending.
        assert_eq!(state.last_broadcast_day(), day(1));
    }

    #[test]
    fn test_daily_once_per_day_across_chats() {
        let engine = engine();
        let mut state = settled_state();
        state.greeted_chats.insert(2);

        let reply = engine.reply(&msg(2, "hello"), &mut state, day(2)).unwrap();
        assert_eq!(reply, Reply::new(Rule::Daily, "ey"));
        assert_eq!(state.last_broadcast_day(), day(2));

        assert_eq!(engine.reply(&msg(1, "hello"), &mut state, day(2)), None);
        assert_eq!(engine.reply(&msg(2, "hello"), &mut state, day(2)), None);

        let next = engine.reply(&msg(1, "hello"), &mut state, day(3)).unwrap();
        assert_eq!(next.rule, Rule::Daily);
    }

    #[test]
    fn test_daily_ignores_clock_going_backward() {
        let engine = engine();
        let mut state = EngineState::new(day(3));
        state.greeted_chats.insert(1);

        assert_eq!(engine.reply(&msg(1, "hello"), &mut state, day(2)), None);
        assert_eq!(state.last_broadcast_day(), day(3));

        assert_eq!(engine.reply(&msg(1, "hello"), &mut state, day(3)), None);

        let reply = engine.reply(&msg(1, "hello"), &mut state, day(4)).unwrap();
        assert_eq!(reply.rule, Rule::Daily);
        assert_eq!(state.last_broadcast_day(), day(4));
    }

    #[test]
    fn test_daily_not_sent_on_start_day() {
        let engine = engine();
        let mut state = settled_state();
        assert_eq!(engine.reply(&msg(1, "hello"), &mut state, day(1)), None);
        assert_eq!(state.last_broadcast_day(), day(1));
    }

    #[test]
    fn test_clapback() {
        let engine = engine();
        let mut state = settled_state();
        let reply = engine
            .reply(&msg(1, "hey EyBot cicing now"), &mut state, day(1))
            .unwrap();
        assert_eq!(reply, Reply::new(Rule::Clapback, "embung"));
    }

    #[test]
    fn test_clapback_needs_mention_and_trigger() {
        let engine = engine();
        let mut state = settled_state();
        assert_eq!(engine.reply(&msg(1, "hi EyBot"), &mut state, day(1)), None);
        assert_eq!(engine.reply(&msg(1, "so cicing"), &mut state, day(1)), None);
        // Mention is case-sensitive.
        assert_eq!(engine.reply(&msg(1, "so eybot cicing"), &mut state, day(1)), None);
        // Echo still answers when the clapback does not apply.
        let reply = engine.reply(&msg(1, "EyBot hi"), &mut state, day(1)).unwrap();
        assert_eq!(reply, Reply::new(Rule::Echo, "Ey"));
    }

    #[test]
    fn test_clapback_beats_echo() {
        let engine = engine();
        let mut state = settled_state();
        let reply = engine
            .reply(&msg(1, "ey @EyBot cicing"), &mut state, day(1))
            .unwrap();
        assert_eq!(reply.rule, Rule::Clapback);
    }

    #[test]
    fn test_echo_keeps_original_casing() {
        let engine = engine();
        let mut state = settled_state();
        let reply = engine
            .reply(&msg(1, "Eyyyy there"), &mut state, day(1))
            .unwrap();
        assert_eq!(reply, Reply::new(Rule::Echo, "Ey"));

        let reply = engine.reply(&msg(1, "GELOWWW"), &mut state, day(1)).unwrap();
        assert_eq!(reply.text, "GELOW");

        let reply = engine.reply(&msg(1, "Anying lah"), &mut state, day(1)).unwrap();
        assert_eq!(reply.text, "Anying");
    }

    #[test]
    fn test_echo_only_matches_prefix() {
        let engine = engine();
        let mut state = settled_state();
        assert_eq!(engine.reply(&msg(1, "hello"), &mut state, day(1)), None);
        assert_eq!(engine.reply(&msg(1, "say ey"), &mut state, day(1)), None);
        assert_eq!(engine.reply(&msg(1, "e"), &mut state, day(1)), None);
    }

    #[test]
    fn test_echo_respects_word_order() {
        let replies = ReplyConfig {
            echo_words: vec!["ge".into(), "gelow".into()],
            ..ReplyConfig::default()
        };
        let engine = ReplyEngine::new("EyBot", replies);
        let mut state = settled_state();
        let reply = engine.reply(&msg(1, "gelow"), &mut state, day(1)).unwrap();
        assert_eq!(reply.text, "ge");
    }

    #[test]
    fn test_echo_counts_characters_not_bytes() {
        assert_eq!(echo_match("éy", "ey"), None);
        assert_eq!(echo_match("ÉA", "éa"), Some("ÉA"));
        assert_eq!(echo_match("ey😀", "ey"), Some("ey"));
        assert_eq!(echo_match("", "ey"), None);
    }

    #[test]
    fn test_repeated_messages_do_not_mutate_state() {
        let engine = engine();
        let mut state = settled_state();
        for _ in 0..3 {
            let reply = engine.reply(&msg(1, "eaaa"), &mut state, day(1)).unwrap();
            assert_eq!(reply, Reply::new(Rule::Echo, "ea"));
        }
        assert_eq!(state.greeted_count(), 1);
        assert_eq!(state.last_broadcast_day(), day(1));
    }

    #[test]
    fn test_resurrection_can_be_disabled() {
        let replies = ReplyConfig {
            resurrection_enabled: false,
            ..ReplyConfig::default()
        };
        let engine = ReplyEngine::new("EyBot", replies);
        let mut state = EngineState::new(day(1));
        let reply = engine.reply(&msg(5, "ey"), &mut state, day(1)).unwrap();
        assert_eq!(reply.rule, Rule::Echo);
        assert!(!state.is_greeted(5));
    }
}
