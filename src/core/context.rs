//! Shared session state, confined to the dispatch loop.
//!
//! [`AppContext`] has no interior locking. The event bus owns it and hands a
//! `&mut` to exactly one handler at a time; producers only ever see the
//! [`ContextSnapshot`] the bus publishes after each dispatch.
//!
//! Structural invariant: `current_channel`, when set, names an entry in the
//! channel list. Every mutator below keeps that true in the same call.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::core::config::Config;
use crate::core::message::{ChannelId, ChannelSummary, ChatMessage, Presence};
use crate::core::view::{Mode, ViewState};
use crate::service::{OutboundCommand, ServiceConnection, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    UnknownChannel(ChannelId),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::UnknownChannel(id) => write!(f, "Unknown channel: {id}"),
        }
    }
}

impl Error for ContextError {}

pub struct AppContext {
    config: Arc<Config>,
    workspace: String,
    user: Option<String>,
    connection: Option<ServiceConnection>,
    current_channel: Option<ChannelId>,
    channels: Vec<ChannelSummary>,
    presence: HashMap<String, Presence>,
    pub view: ViewState,
}

impl AppContext {
    pub fn new(config: Arc<Config>, workspace: impl Into<String>) -> Self {
        Self {
            config,
            workspace: workspace.into(),
            user: None,
            connection: None,
            current_channel: None,
            channels: Vec::new(),
            presence: HashMap::new(),
            view: ViewState::new(),
        }
    }

    pub fn with_connection(mut self, connection: ServiceConnection) -> Self {
        self.user = Some(connection.user().to_string());
        self.connection = Some(connection);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = Some(user.into());
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| !connection.is_closed())
    }

    pub fn connection(&self) -> Option<&ServiceConnection> {
        self.connection.as_ref()
    }

    /// Hands a command to the connection, if one is held.
    pub fn send(&self, command: OutboundCommand) -> Result<(), ServiceError> {
        match &self.connection {
            Some(connection) => connection.send(command),
            None => Err(ServiceError::NotConnected),
        }
    }

    /// Closes and drops the connection. Returns `false` when there was none,
    /// so calling this repeatedly never closes twice.
    pub fn release_connection(&mut self) -> bool {
        match self.connection.take() {
            Some(connection) => {
                connection.close();
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    pub fn channels(&self) -> &[ChannelSummary] {
        &self.channels
    }

    pub fn channel(&self, id: &ChannelId) -> Option<&ChannelSummary> {
        self.channels.iter().find(|channel| &channel.id == id)
    }

    fn channel_mut(&mut self, id: &ChannelId) -> Option<&mut ChannelSummary> {
        self.channels.iter_mut().find(|channel| &channel.id == id)
    }

    fn position(&self, id: &ChannelId) -> Option<usize> {
        self.channels.iter().position(|channel| &channel.id == id)
    }

    pub fn current_channel(&self) -> Option<&ChannelId> {
        self.current_channel.as_ref()
    }

    pub fn current_summary(&self) -> Option<&ChannelSummary> {
        self.current_channel
            .as_ref()
            .and_then(|id| self.channel(id))
    }

    /// Adds a channel, or renames it if the id is already listed.
    ///
    /// The first channel added becomes current when nothing is selected.
    pub fn upsert_channel(&mut self, id: ChannelId, name: String) {
        if let Some(existing) = self.channel_mut(&id) {
            existing.name = name;
        } else {
            let mut summary = ChannelSummary::new(id.clone(), name);
            summary.presence = summary
                .direct_user()
                .and_then(|user| self.presence.get(user).copied());
            self.channels.push(summary);
        }
        if self.current_channel.is_none() {
            self.current_channel = Some(id);
        }
    }

    /// Removes a channel along with its messages, clearing the selection in
    /// the same step when it pointed at the removed entry.
    pub fn remove_channel(&mut self, id: &ChannelId) -> Option<ChannelSummary> {
        let index = self.position(id)?;
        let removed = self.channels.remove(index);
        self.view.forget_channel(id);
        if self.current_channel.as_ref() == Some(id) {
            self.current_channel = None;
            self.view.scroll = 0;
        }
        Some(removed)
    }

    /// Makes `id` the current channel and clears its unread count.
    pub fn select_channel(&mut self, id: &ChannelId) -> Result<(), ContextError> {
        let channel = self
            .channel_mut(id)
            .ok_or_else(|| ContextError::UnknownChannel(id.clone()))?;
        channel.unread = 0;
        if self.current_channel.as_ref() != Some(id) {
            self.view.scroll = 0;
        }
        self.current_channel = Some(id.clone());
        Ok(())
    }

    /// Moves the selection by `delta` entries, clamped to the list bounds.
    pub fn select_relative(&mut self, delta: isize) -> Option<ChannelId> {
        if self.channels.is_empty() {
            return None;
        }
        let current = self
            .current_channel
            .as_ref()
            .and_then(|id| self.position(id));
        let last = self.channels.len() as isize - 1;
        let target = match current {
            Some(index) => (index as isize + delta).clamp(0, last) as usize,
            None => 0,
        };
        let id = self.channels[target].id.clone();
        self.select_channel(&id).ok()?;
        Some(id)
    }

    pub fn select_first(&mut self) -> Option<ChannelId> {
        let id = self.channels.first()?.id.clone();
        self.select_channel(&id).ok()?;
        Some(id)
    }

    pub fn select_last(&mut self) -> Option<ChannelId> {
        let id = self.channels.last()?.id.clone();
        self.select_channel(&id).ok()?;
        Some(id)
    }

    /// Channels whose name contains `query`, case-insensitively.
    pub fn filter_channels(&self, query: &str) -> Vec<&ChannelSummary> {
        let needle = query.trim().to_lowercase();
        self.channels
            .iter()
            .filter(|channel| needle.is_empty() || channel.name.to_lowercase().contains(&needle))
            .collect()
    }

    // ------------------------------------------------------------------
    // Messages and presence
    // ------------------------------------------------------------------

    /// Appends a message, creating its channel on first sight. Messages for a
    /// channel other than the current one count as unread.
    pub fn record_message(&mut self, message: ChatMessage) {
        if self.channel(&message.channel).is_none() {
            debug!(channel = %message.channel, "Message for unlisted channel; adding it");
            self.upsert_channel(message.channel.clone(), message.channel.to_string());
        }
        let is_current = self.current_channel.as_ref() == Some(&message.channel);
        let from_self = self.user.as_deref() == Some(message.user.as_str());
        if let Some(channel) = self.channel_mut(&message.channel) {
            if !is_current && !from_self {
                channel.unread += 1;
            }
        }
        self.view.clear_typing(&message.channel, &message.user);
        self.view.push_message(message);
    }

    pub fn presence_of(&self, user: &str) -> Option<Presence> {
        self.presence.get(user).copied()
    }

    pub fn set_presence(&mut self, user: &str, presence: Presence) {
        self.presence.insert(user.to_string(), presence);
        for channel in &mut self.channels {
            if channel.direct_user() == Some(user) {
                channel.presence = Some(presence);
            }
        }
    }

    /// Copy of the fields producers may consult when building events.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            workspace: self.workspace.clone(),
            user: self.user.clone(),
            connected: self.is_connected(),
            current_channel: self.current_channel.clone(),
            channel_ids: self.channels.iter().map(|c| c.id.clone()).collect(),
            mode: self.view.mode,
            typing_active: self.view.has_typing(),
        }
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("workspace", &self.workspace)
            .field("user", &self.user)
            .field("connected", &self.is_connected())
            .field("current_channel", &self.current_channel)
            .field("channels", &self.channels.len())
            .finish()
    }
}

/// Immutable view of [`AppContext`] published by the bus for producers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub workspace: String,
    pub user: Option<String>,
    pub connected: bool,
    pub current_channel: Option<ChannelId>,
    pub channel_ids: Vec<ChannelId>,
    pub mode: Mode,
    pub typing_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AppContext {
        AppContext::new(Arc::new(Config::default()), "test")
    }

    fn id(raw: &str) -> ChannelId {
        ChannelId::new(raw)
    }

    #[test]
    fn first_channel_becomes_current() {
        let mut ctx = context();
        ctx.upsert_channel(id("C1"), "general".into());
        ctx.upsert_channel(id("C2"), "random".into());
        assert_eq!(ctx.current_channel(), Some(&id("C1")));
        assert_eq!(ctx.channels().len(), 2);
    }

    #[test]
    fn removing_current_channel_clears_selection() {
        let mut ctx = context();
        ctx.upsert_channel(id("C1"), "general".into());
        ctx.upsert_channel(id("C2"), "random".into());
        ctx.record_message(ChatMessage::new("C1", "ada", "hi"));

        let removed = ctx.remove_channel(&id("C1")).expect("removed");
        assert_eq!(removed.name, "general");
        assert_eq!(ctx.current_channel(), None);
        assert_eq!(ctx.view.message_count(&id("C1")), 0);

        assert!(ctx.remove_channel(&id("C1")).is_none());
    }

    #[test]
    fn removing_other_channel_keeps_selection() {
        let mut ctx = context();
        ctx.upsert_channel(id("C1"), "general".into());
        ctx.upsert_channel(id("C2"), "random".into());
        ctx.remove_channel(&id("C2"));
        assert_eq!(ctx.current_channel(), Some(&id("C1")));
    }

    #[test]
    fn selecting_unknown_channel_fails_without_change() {
        let mut ctx = context();
        ctx.upsert_channel(id("C1"), "general".into());
        assert_eq!(
            ctx.select_channel(&id("nope")),
            Err(ContextError::UnknownChannel(id("nope")))
        );
        assert_eq!(ctx.current_channel(), Some(&id("C1")));
    }

    #[test]
    fn messages_elsewhere_count_as_unread_until_selected() {
        let mut ctx = context();
        ctx.set_user("me");
        ctx.upsert_channel(id("C1"), "general".into());
        ctx.upsert_channel(id("C2"), "random".into());

        ctx.record_message(ChatMessage::new("C2", "ada", "psst"));
        ctx.record_message(ChatMessage::new("C2", "me", "mine"));
        ctx.record_message(ChatMessage::new("C1", "ada", "here"));
        assert_eq!(ctx.channel(&id("C2")).map(|c| c.unread), Some(1));
        assert_eq!(ctx.channel(&id("C1")).map(|c| c.unread), Some(0));

        ctx.select_channel(&id("C2")).expect("select");
        assert_eq!(ctx.channel(&id("C2")).map(|c| c.unread), Some(0));
    }

    #[test]
    fn messages_for_unknown_channels_create_them() {
        let mut ctx = context();
        ctx.record_message(ChatMessage::new("C9", "ada", "hello"));
        assert!(ctx.channel(&id("C9")).is_some());
        assert_eq!(ctx.view.message_count(&id("C9")), 1);
    }

    #[test]
    fn relative_selection_clamps() {
        let mut ctx = context();
        for (raw, name) in [("C1", "a"), ("C2", "b"), ("C3", "c")] {
            ctx.upsert_channel(id(raw), name.into());
        }
        assert_eq!(ctx.select_relative(5), Some(id("C3")));
        assert_eq!(ctx.select_relative(-1), Some(id("C2")));
        assert_eq!(ctx.select_relative(-10), Some(id("C1")));
        assert_eq!(ctx.select_last(), Some(id("C3")));
        assert_eq!(ctx.select_first(), Some(id("C1")));
    }

    #[test]
    fn presence_updates_direct_channels() {
        let mut ctx = context();
        ctx.set_presence("ada", Presence::Away);
        ctx.upsert_channel(id("D1"), "@ada".into());
        assert_eq!(ctx.channel(&id("D1")).and_then(|c| c.presence), Some(Presence::Away));

        ctx.set_presence("ada", Presence::Active);
        assert_eq!(ctx.channel(&id("D1")).and_then(|c| c.presence), Some(Presence::Active));
    }

    #[test]
    fn filter_matches_case_insensitively() {
        let mut ctx = context();
        ctx.upsert_channel(id("C1"), "General".into());
        ctx.upsert_channel(id("C2"), "random".into());
        let names: Vec<_> = ctx.filter_channels("gen").iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["General".to_string()]);
        assert_eq!(ctx.filter_channels("").len(), 2);
    }

    #[test]
    fn release_connection_happens_once() {
        let (connection, transport) = ServiceConnection::pair("me");
        let mut ctx = context().with_connection(connection);
        assert!(ctx.is_connected());
        assert_eq!(ctx.user(), Some("me"));

        assert!(ctx.release_connection());
        assert!(transport.closed.is_cancelled());
        assert!(!ctx.release_connection());
        assert!(matches!(
            ctx.send(OutboundCommand::SetPresence(Presence::Away)),
            Err(ServiceError::NotConnected)
        ));
    }
}
