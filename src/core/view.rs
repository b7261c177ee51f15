//! Render model mutated by handlers and read by the renderer.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Instant;

use crate::core::message::{ChannelId, ChatMessage};

pub const MAX_MESSAGES_PER_CHANNEL: usize = 500;
pub const MAX_KEY_LOG: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Navigation keys move between channels and scroll.
    #[default]
    Command,
    /// Keys edit the message being composed.
    Insert,
    /// Keys edit the channel filter.
    Search,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Command => "COMMAND",
            Mode::Insert => "INSERT",
            Mode::Search => "SEARCH",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub mode: Mode,
    /// Message being composed in insert mode.
    pub input: String,
    /// Channel filter typed in search mode.
    pub search: String,
    /// Lines scrolled up from the bottom of the message pane.
    pub scroll: u16,
    /// Persistent notice, e.g. after the connection dropped.
    pub banner: Option<String>,
    /// Transient status line.
    pub status: Option<String>,
    pub term_width: u16,
    pub term_height: u16,
    messages: HashMap<ChannelId, VecDeque<ChatMessage>>,
    typing: BTreeMap<ChannelId, BTreeMap<String, Instant>>,
    key_log: VecDeque<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self, channel: &ChannelId) -> impl Iterator<Item = &ChatMessage> {
        self.messages.get(channel).into_iter().flatten()
    }

    pub fn message_count(&self, channel: &ChannelId) -> usize {
        self.messages.get(channel).map_or(0, VecDeque::len)
    }

    pub(crate) fn push_message(&mut self, message: ChatMessage) {
        let list = self.messages.entry(message.channel.clone()).or_default();
        list.push_back(message);
        while list.len() > MAX_MESSAGES_PER_CHANNEL {
            list.pop_front();
        }
    }

    pub(crate) fn forget_channel(&mut self, channel: &ChannelId) {
        self.messages.remove(channel);
        self.typing.remove(channel);
    }

    pub fn set_typing(&mut self, channel: ChannelId, user: String, expires_at: Instant) {
        self.typing.entry(channel).or_default().insert(user, expires_at);
    }

    pub fn clear_typing(&mut self, channel: &ChannelId, user: &str) -> bool {
        let Some(users) = self.typing.get_mut(channel) else {
            return false;
        };
        let removed = users.remove(user).is_some();
        if users.is_empty() {
            self.typing.remove(channel);
        }
        removed
    }

    /// Drops indicators whose deadline has passed. Returns whether any were removed.
    pub fn expire_typing(&mut self, now: Instant) -> bool {
        let mut changed = false;
        self.typing.retain(|_, users| {
            let before = users.len();
            users.retain(|_, expires_at| *expires_at > now);
            changed |= users.len() != before;
            !users.is_empty()
        });
        changed
    }

    pub fn typing_users(&self, channel: &ChannelId) -> Vec<&str> {
        self.typing
            .get(channel)
            .map(|users| users.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_typing(&self) -> bool {
        !self.typing.is_empty()
    }

    pub fn push_key(&mut self, key: String) {
        self.key_log.push_back(key);
        while self.key_log.len() > MAX_KEY_LOG {
            self.key_log.pop_front();
        }
    }

    pub fn key_log(&self) -> impl Iterator<Item = &str> {
        self.key_log.iter().map(String::as_str)
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }
}
