use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Producer;
use crate::bus::{EventEmitter, SnapshotReader};
use crate::core::event::Event;

/// Emits `timer.tick` at a fixed period. Ticks missed while the task was
/// delayed are skipped rather than delivered in a burst.
pub struct TimerProducer {
    period: Duration,
}

impl TimerProducer {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }
}

#[async_trait]
impl Producer for TimerProducer {
    fn name(&self) -> &'static str {
        "timer"
    }

    async fn run(
        self: Box<Self>,
        emitter: EventEmitter,
        _snapshot: SnapshotReader,
        cancel: CancellationToken,
    ) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !emitter.emit(Event::tick()) {
                        break;
                    }
                }
            }
        }

        debug!("Timer producer stopped");
    }
}
