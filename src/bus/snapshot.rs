use tokio::sync::watch;

use crate::core::context::ContextSnapshot;

/// Synchronized read access to the latest published [`ContextSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<ContextSnapshot>,
}

impl SnapshotReader {
    pub fn current(&self) -> ContextSnapshot {
        self.rx.borrow().clone()
    }

    /// Reader with a default snapshot and no publisher behind it.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        SnapshotPublisher::new().reader()
    }

    /// Waits for the next publication. Returns `false` once the bus is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

pub(crate) struct SnapshotPublisher {
    tx: watch::Sender<ContextSnapshot>,
}

impl SnapshotPublisher {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ContextSnapshot::default());
        Self { tx }
    }

    pub(crate) fn publish(&self, snapshot: ContextSnapshot) {
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    pub(crate) fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn readers_observe_published_snapshots() {
        let publisher = SnapshotPublisher::new();
        let mut reader = publisher.reader();
        assert!(!reader.current().connected);

        publisher.publish(ContextSnapshot {
            connected: true,
            ..Default::default()
        });
        assert!(reader.changed().await);
        assert!(reader.current().connected);
    }

    #[tokio::test]
    async fn identical_snapshots_do_not_wake_readers() {
        let publisher = SnapshotPublisher::new();
        let mut reader = publisher.reader();
        publisher.publish(ContextSnapshot::default());

        let woke =
            tokio::time::timeout(std::time::Duration::from_millis(20), reader.changed()).await;
        assert!(woke.is_err());
    }
}
