use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Producer;
use crate::bus::{EventEmitter, SnapshotReader};
use crate::core::event::{Event, EventKind, EventPayload};
use crate::core::message::{ChannelUpdate, ChatMessage};
use crate::service::{Notification, NotificationError, NotificationStream};

/// Turns the service's notification stream into bus events.
///
/// The connection ending in any way (an explicit `disconnected` frame, a
/// transport error, or the stream simply running out) yields exactly one
/// `service.disconnect` event, after which the producer stops.
pub struct ServicePushProducer {
    notifications: NotificationStream,
}

impl ServicePushProducer {
    pub fn new(notifications: NotificationStream) -> Self {
        Self { notifications }
    }
}

enum Step {
    Emit(Event),
    Skip,
    Disconnect(String),
}

fn translate(item: Result<Notification, NotificationError>) -> Step {
    let notification = match item {
        Ok(notification) => notification,
        Err(NotificationError::ConnectionLost { reason }) => return Step::Disconnect(reason),
        Err(err @ NotificationError::Malformed { .. }) => {
            warn!(error = %err, "Dropping malformed notification");
            return Step::Skip;
        }
    };

    let event = match notification {
        Notification::Hello { user } => Event::new(
            EventKind::ServiceConnected,
            EventPayload::Connected { user },
        ),
        Notification::Message {
            channel,
            user,
            text,
            ts,
        } => Event::message(ChatMessage {
            channel,
            user,
            text,
            timestamp: ts.unwrap_or_else(Utc::now),
        }),
        Notification::Presence { user, presence } => Event::new(
            EventKind::ServicePresence,
            EventPayload::Presence { user, presence },
        ),
        Notification::Typing { channel, user } => Event::new(
            EventKind::ServiceTyping,
            EventPayload::Typing { channel, user },
        ),
        Notification::ChannelJoined { id, name } => Event::new(
            EventKind::ServiceChannel,
            EventPayload::Channel(ChannelUpdate::Joined { id, name }),
        ),
        Notification::ChannelLeft { id } => Event::new(
            EventKind::ServiceChannel,
            EventPayload::Channel(ChannelUpdate::Left { id }),
        ),
        Notification::Error { message } => {
            Event::new(EventKind::ServiceError, EventPayload::Error(message))
        }
        Notification::Disconnected { reason } => return Step::Disconnect(reason),
    };
    Step::Emit(event)
}

#[async_trait]
impl Producer for ServicePushProducer {
    fn name(&self) -> &'static str {
        "service-push"
    }

    async fn run(
        self: Box<Self>,
        emitter: EventEmitter,
        _snapshot: SnapshotReader,
        cancel: CancellationToken,
    ) {
        let mut notifications = self.notifications;

        let reason = loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Service push producer cancelled");
                    return;
                }
                item = notifications.next() => item,
            };

            let Some(item) = item else {
                break "connection closed".to_string();
            };
            match translate(item) {
                Step::Emit(event) => {
                    if !emitter.emit(event) {
                        debug!("Bus stopped; service push producer exiting");
                        return;
                    }
                }
                Step::Skip => {}
                Step::Disconnect(reason) => break reason,
            }
        };

        info!(reason = %reason, "Service connection ended");
        emitter.emit(Event::disconnect(reason));
    }
}
