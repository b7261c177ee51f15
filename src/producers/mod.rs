//! Independent event sources feeding the bus.
//!
//! Each producer runs on its own task, blocks only on its own source, and
//! never touches the application context. Anything it needs to know about
//! the session comes from the [`SnapshotReader`] the bus hands it.

pub mod input;
pub mod service;
pub mod timer;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::bus::{EventEmitter, SnapshotReader};

pub use input::{CrosstermInput, InputSource, TerminalInputProducer};
pub use service::ServicePushProducer;
pub use timer::TimerProducer;

#[async_trait]
pub trait Producer: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Emits events until `cancel` fires, the source is exhausted, or the
    /// emitter reports that the bus has stopped.
    async fn run(
        self: Box<Self>,
        emitter: EventEmitter,
        snapshot: SnapshotReader,
        cancel: CancellationToken,
    );
}
