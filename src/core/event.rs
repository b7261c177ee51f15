//! Events flowing from producers to the dispatch loop.
//!
//! The set of kinds is closed and known at build time. Tags that do not map to
//! a known kind parse to [`EventKind::Other`] so new producers can be added
//! before any handler knows about them; the bus drops those with a diagnostic.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::message::{ChannelId, ChannelUpdate, ChatMessage, Presence};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Key,
    Paste,
    Resize,
    ServiceConnected,
    ServiceMessage,
    ServicePresence,
    ServiceTyping,
    ServiceChannel,
    ServiceError,
    ServiceDisconnect,
    TimerTick,
    Render,
    Quit,
    /// Forward-compatible fallback for tags without a known kind.
    Other(String),
}

impl EventKind {
    pub const KNOWN: [EventKind; 13] = [
        EventKind::Key,
        EventKind::Paste,
        EventKind::Resize,
        EventKind::ServiceConnected,
        EventKind::ServiceMessage,
        EventKind::ServicePresence,
        EventKind::ServiceTyping,
        EventKind::ServiceChannel,
        EventKind::ServiceError,
        EventKind::ServiceDisconnect,
        EventKind::TimerTick,
        EventKind::Render,
        EventKind::Quit,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Key => "key",
            EventKind::Paste => "paste",
            EventKind::Resize => "resize",
            EventKind::ServiceConnected => "service.connected",
            EventKind::ServiceMessage => "service.message",
            EventKind::ServicePresence => "service.presence",
            EventKind::ServiceTyping => "service.typing",
            EventKind::ServiceChannel => "service.channel",
            EventKind::ServiceError => "service.error",
            EventKind::ServiceDisconnect => "service.disconnect",
            EventKind::TimerTick => "timer.tick",
            EventKind::Render => "render",
            EventKind::Quit => "quit",
            EventKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(EventKind::KNOWN
            .iter()
            .find(|kind| kind.as_str() == tag)
            .cloned()
            .unwrap_or_else(|| EventKind::Other(tag.to_string())))
    }
}

impl From<&str> for EventKind {
    fn from(tag: &str) -> Self {
        match tag.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

/// A single key press, detached from the terminal library's event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyInput {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn is_ctrl(&self, c: char) -> bool {
        self.code == KeyCode::Char(c) && self.modifiers.contains(KeyModifiers::CONTROL)
    }

    /// Printable character for text entry, if this key produces one.
    pub fn text_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c)
                if !self
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(c)
            }
            _ => None,
        }
    }

    /// Short textual form used in the key log, e.g. `a`, `C-c`, `<enter>`.
    pub fn describe(&self) -> String {
        let base = match self.code {
            KeyCode::Char(' ') => "<space>".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Enter => "<enter>".to_string(),
            KeyCode::Esc => "<esc>".to_string(),
            KeyCode::Backspace => "<backspace>".to_string(),
            KeyCode::Tab => "<tab>".to_string(),
            KeyCode::Up => "<up>".to_string(),
            KeyCode::Down => "<down>".to_string(),
            KeyCode::Left => "<left>".to_string(),
            KeyCode::Right => "<right>".to_string(),
            KeyCode::PageUp => "<pgup>".to_string(),
            KeyCode::PageDown => "<pgdn>".to_string(),
            KeyCode::F(n) => format!("<f{n}>"),
            other => format!("<{other:?}>").to_lowercase(),
        };
        let mut prefix = String::new();
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            prefix.push_str("C-");
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            prefix.push_str("M-");
        }
        format!("{prefix}{base}")
    }
}

impl From<KeyEvent> for KeyInput {
    fn from(key: KeyEvent) -> Self {
        Self::new(key.code, key.modifiers)
    }
}

/// Kind-specific data carried by an [`Event`]. The bus never inspects it.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    None,
    Key(KeyInput),
    Paste(String),
    Resize { width: u16, height: u16 },
    Connected { user: String },
    Message(ChatMessage),
    Presence { user: String, presence: Presence },
    Typing { channel: ChannelId, user: String },
    Channel(ChannelUpdate),
    Disconnect { reason: String },
    Error(String),
    Text(String),
}

/// Immutable occurrence handed from a producer to exactly one handler.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    payload: EventPayload,
    enqueued_at: Instant,
}

impl Event {
    pub fn new(kind: impl Into<EventKind>, payload: EventPayload) -> Self {
        Self {
            kind: kind.into(),
            payload,
            enqueued_at: Instant::now(),
        }
    }

    pub fn key(key: KeyInput) -> Self {
        Self::new(EventKind::Key, EventPayload::Key(key))
    }

    pub fn resize(width: u16, height: u16) -> Self {
        Self::new(EventKind::Resize, EventPayload::Resize { width, height })
    }

    pub fn message(message: ChatMessage) -> Self {
        Self::new(EventKind::ServiceMessage, EventPayload::Message(message))
    }

    pub fn disconnect(reason: impl Into<String>) -> Self {
        Self::new(
            EventKind::ServiceDisconnect,
            EventPayload::Disconnect {
                reason: reason.into(),
            },
        )
    }

    pub fn tick() -> Self {
        Self::new(EventKind::TimerTick, EventPayload::None)
    }

    pub fn render() -> Self {
        Self::new(EventKind::Render, EventPayload::None)
    }

    pub fn quit() -> Self {
        Self::new(EventKind::Quit, EventPayload::None)
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn into_payload(self) -> EventPayload {
        self.payload
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }
}
