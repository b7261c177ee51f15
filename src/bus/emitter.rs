use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::event::Event;

/// Producer-side entry to the ingestion queue.
///
/// Cloneable and safe to use from any task or thread. The queue is unbounded,
/// so emitting never blocks and never drops; it only fails once the dispatch
/// loop has stopped, which producers should take as a signal to stop.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventEmitter {
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// External cancellation for a running bus. Shutting down twice is a no-op.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Shutdown requested");
        }
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reports_closed_queue() {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = EventEmitter::new(tx);
        assert!(emitter.emit(Event::render()));
        drop(rx);
        assert!(emitter.is_closed());
        assert!(!emitter.emit(Event::render()));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let handle = ShutdownHandle::new(CancellationToken::new());
        handle.shutdown();
        handle.shutdown();
        assert!(handle.is_shutdown());
    }
}
