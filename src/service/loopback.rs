//! In-process transport that echoes outbound traffic back as notifications.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;

use super::{
    stream_from_receiver, ChatService, Connected, ConnectionTransport, Notification,
    OutboundCommand, ServiceConnection, ServiceError,
};
use crate::core::config::ResolvedWorkspace;
use crate::core::message::ChannelId;

pub struct LoopbackService {
    user: String,
}

impl LoopbackService {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

#[async_trait]
impl ChatService for LoopbackService {
    async fn connect(&self, workspace: &ResolvedWorkspace) -> Result<Connected, ServiceError> {
        let (connection, transport) = ServiceConnection::pair(self.user.clone());
        let (tx, rx) = mpsc::unbounded_channel();

        let _ = tx.send(Ok(Notification::Hello {
            user: self.user.clone(),
        }));
        for name in &workspace.settings.channels {
            let _ = tx.send(Ok(Notification::ChannelJoined {
                id: ChannelId::new(name.clone()),
                name: name.clone(),
            }));
        }

        tokio::spawn(echo_outbound(self.user.clone(), transport, tx));

        Ok(Connected {
            connection,
            notifications: stream_from_receiver(rx),
        })
    }
}

async fn echo_outbound(
    user: String,
    transport: ConnectionTransport,
    tx: mpsc::UnboundedSender<Result<Notification, super::NotificationError>>,
) {
    let ConnectionTransport {
        mut outbound,
        closed,
    } = transport;

    loop {
        let command = tokio::select! {
            _ = closed.cancelled() => break,
            command = outbound.recv() => command,
        };
        let Some(command) = command else {
            break;
        };

        let echoed = match command {
            OutboundCommand::SendMessage { channel, text } => Some(Notification::Message {
                channel,
                user: user.clone(),
                text,
                ts: Some(Utc::now()),
            }),
            OutboundCommand::SetPresence(presence) => Some(Notification::Presence {
                user: user.clone(),
                presence,
            }),
            OutboundCommand::MarkRead { channel } => {
                debug!(%channel, "Loopback mark-read");
                None
            }
        };

        if let Some(notification) = echoed {
            if tx.send(Ok(notification)).is_err() {
                break;
            }
        }
    }

    debug!("Loopback transport stopped");
}
