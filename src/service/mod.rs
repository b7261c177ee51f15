//! Boundary to the remote chat service.
//!
//! The wire protocol and authentication live behind [`ChatService`]. The core
//! only sees two things: a lazy stream of inbound [`Notification`]s consumed
//! by the push producer, and a [`ServiceConnection`] owned by the application
//! context through which handlers send [`OutboundCommand`]s.

pub mod loopback;
pub mod replay;

use std::error::Error as StdError;
use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::config::ResolvedWorkspace;
use crate::core::message::{ChannelId, Presence};

pub use loopback::LoopbackService;
pub use replay::ReplayService;

/// Inbound notification pushed by the service over its long-lived connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Hello {
        user: String,
    },
    Message {
        channel: ChannelId,
        user: String,
        text: String,
        #[serde(default)]
        ts: Option<DateTime<Utc>>,
    },
    Presence {
        user: String,
        presence: Presence,
    },
    Typing {
        channel: ChannelId,
        user: String,
    },
    ChannelJoined {
        id: ChannelId,
        name: String,
    },
    ChannelLeft {
        id: ChannelId,
    },
    Error {
        message: String,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug)]
pub enum NotificationError {
    /// A single frame could not be decoded; the stream itself is still usable.
    Malformed {
        raw: String,
        source: serde_json::Error,
    },
    /// The underlying connection is gone.
    ConnectionLost { reason: String },
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationError::Malformed { raw, source } => {
                write!(f, "Malformed notification ({source}): {raw}")
            }
            NotificationError::ConnectionLost { reason } => {
                write!(f, "Connection lost: {reason}")
            }
        }
    }
}

impl StdError for NotificationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            NotificationError::Malformed { source, .. } => Some(source),
            NotificationError::ConnectionLost { .. } => None,
        }
    }
}

/// Decodes one JSON-encoded notification frame.
pub fn decode_notification(raw: &str) -> Result<Notification, NotificationError> {
    serde_json::from_str(raw.trim()).map_err(|source| NotificationError::Malformed {
        raw: raw.trim().to_string(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    SendMessage { channel: ChannelId, text: String },
    MarkRead { channel: ChannelId },
    SetPresence(Presence),
}

#[derive(Debug)]
pub enum ServiceError {
    /// No connection is held by the context.
    NotConnected,
    /// The connection was closed before the command could be handed off.
    Closed,
    /// Establishing the connection failed.
    Connect { workspace: String, reason: String },
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotConnected => write!(f, "Not connected"),
            ServiceError::Closed => write!(f, "Connection closed"),
            ServiceError::Connect { workspace, reason } => {
                write!(f, "Failed to connect to workspace '{workspace}': {reason}")
            }
        }
    }
}

impl StdError for ServiceError {}

pub type NotificationStream =
    Pin<Box<dyn Stream<Item = Result<Notification, NotificationError>> + Send>>;

/// Handle to an established connection. Owned by the application context.
///
/// Sending never blocks: commands are handed to the transport task through an
/// unbounded channel. Closing is idempotent and also happens on drop.
#[derive(Debug)]
pub struct ServiceConnection {
    user: String,
    outbound: mpsc::UnboundedSender<OutboundCommand>,
    closed: CancellationToken,
}

/// Transport-side half of a [`ServiceConnection`].
pub struct ConnectionTransport {
    pub outbound: mpsc::UnboundedReceiver<OutboundCommand>,
    pub closed: CancellationToken,
}

impl ServiceConnection {
    pub fn pair(user: impl Into<String>) -> (Self, ConnectionTransport) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();
        (
            Self {
                user: user.into(),
                outbound: tx,
                closed: closed.clone(),
            },
            ConnectionTransport {
                outbound: rx,
                closed,
            },
        )
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn send(&self, command: OutboundCommand) -> Result<(), ServiceError> {
        if self.closed.is_cancelled() {
            return Err(ServiceError::Closed);
        }
        self.outbound.send(command).map_err(|_| ServiceError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub fn close(self) {
        debug!(user = %self.user, "Closing service connection");
        self.closed.cancel();
    }
}

impl Drop for ServiceConnection {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

/// A live connection split into the handle and its inbound notifications.
pub struct Connected {
    pub connection: ServiceConnection,
    pub notifications: NotificationStream,
}

#[async_trait]
pub trait ChatService: Send + Sync {
    async fn connect(&self, workspace: &ResolvedWorkspace) -> Result<Connected, ServiceError>;
}

/// Adapts an mpsc receiver into a [`NotificationStream`].
pub(crate) fn stream_from_receiver(
    rx: mpsc::UnboundedReceiver<Result<Notification, NotificationError>>,
) -> NotificationStream {
    Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}
