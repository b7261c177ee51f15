//! Transport that replays newline-delimited JSON notifications from a file.
//!
//! Useful for demos and for reproducing a session without a live service.
//! Blank lines and lines starting with `#` are skipped. The end of the file
//! ends the notification stream, which the push producer reports as a
//! disconnect.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use super::{
    decode_notification, ChatService, Connected, ConnectionTransport, Notification,
    NotificationError, NotificationStream, ServiceConnection, ServiceError,
};
use crate::core::config::ResolvedWorkspace;

pub struct ReplayService {
    user: String,
}

impl ReplayService {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

struct ReplayState {
    lines: Lines<BufReader<File>>,
    delay: Duration,
    done: bool,
}

#[async_trait]
impl ChatService for ReplayService {
    async fn connect(&self, workspace: &ResolvedWorkspace) -> Result<Connected, ServiceError> {
        let path: PathBuf = workspace
            .settings
            .replay
            .clone()
            .ok_or_else(|| ServiceError::Connect {
                workspace: workspace.name.clone(),
                reason: "no replay file configured".to_string(),
            })?;

        let file = File::open(&path)
            .await
            .map_err(|err| ServiceError::Connect {
                workspace: workspace.name.clone(),
                reason: format!("{}: {err}", path.display()),
            })?;

        let (connection, transport) = ServiceConnection::pair(self.user.clone());
        tokio::spawn(discard_outbound(transport));

        let state = ReplayState {
            lines: BufReader::new(file).lines(),
            delay: Duration::from_millis(workspace.settings.replay_delay_ms.unwrap_or(0)),
            done: false,
        };

        Ok(Connected {
            connection,
            notifications: replay_stream(state),
        })
    }
}

fn replay_stream(state: ReplayState) -> NotificationStream {
    Box::pin(futures_util::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            match state.lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }
                    if !state.delay.is_zero() {
                        tokio::time::sleep(state.delay).await;
                    }
                    let item: Result<Notification, NotificationError> =
                        decode_notification(trimmed);
                    return Some((item, state));
                }
                Ok(None) => return None,
                Err(err) => {
                    state.done = true;
                    let lost = NotificationError::ConnectionLost {
                        reason: err.to_string(),
                    };
                    return Some((Err(lost), state));
                }
            }
        }
    }))
}

async fn discard_outbound(transport: ConnectionTransport) {
    let ConnectionTransport {
        mut outbound,
        closed,
    } = transport;
    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            command = outbound.recv() => match command {
                Some(command) => debug!(?command, "Replay transport dropped outbound command"),
                None => break,
            },
        }
    }
}
