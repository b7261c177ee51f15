use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a channel or direct conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChannelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Active,
    Away,
}

impl Presence {
    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Active => "active",
            Presence::Away => "away",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    Channel,
    /// Direct conversation with a single user.
    Direct { user: String },
}

/// Entry in the channel list shown in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    pub unread: usize,
    pub presence: Option<Presence>,
}

impl ChannelSummary {
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = match name.strip_prefix('@') {
            Some(user) => ChannelKind::Direct {
                user: user.to_string(),
            },
            None => ChannelKind::Channel,
        };
        Self {
            id: id.into(),
            name,
            kind,
            unread: 0,
            presence: None,
        }
    }

    pub fn direct_user(&self) -> Option<&str> {
        match &self.kind {
            ChannelKind::Direct { user } => Some(user),
            _ => None,
        }
    }

    /// Sidebar label, prefixed by unread and presence markers.
    pub fn label(&self) -> String {
        let presence = match self.presence {
            Some(Presence::Active) => "● ",
            Some(Presence::Away) => "○ ",
            None => "",
        };
        let name = match self.kind {
            ChannelKind::Direct { .. } => self.name.clone(),
            _ => format!("#{}", self.name.trim_start_matches('#')),
        };
        if self.unread > 0 {
            format!("{presence}{name} ({})", self.unread)
        } else {
            format!("{presence}{name}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel: ChannelId,
    pub user: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        channel: impl Into<ChannelId>,
        user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Membership change pushed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelUpdate {
    Joined { id: ChannelId, name: String },
    Left { id: ChannelId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_prefixed_names_are_direct_conversations() {
        let summary = ChannelSummary::new("D1", "@ada");
        assert_eq!(summary.direct_user(), Some("ada"));
        assert_eq!(summary.label(), "@ada");
    }

    #[test]
    fn label_includes_unread_and_presence() {
        let mut summary = ChannelSummary::new("C1", "general");
        summary.unread = 3;
        assert_eq!(summary.label(), "#general (3)");

        let mut direct = ChannelSummary::new("D1", "@ada");
        direct.presence = Some(Presence::Away);
        assert_eq!(direct.label(), "○ @ada");
    }

    #[test]
    fn presence_round_trips_through_serde() {
        let presence: Presence = serde_json::from_str("\"away\"").expect("parse");
        assert_eq!(presence, Presence::Away);
        assert_eq!(presence.as_str(), "away");
    }
}
