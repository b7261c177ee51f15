//! Event ingestion queue and the single-threaded dispatch loop.
//!
//! Producers push [`Event`]s through an [`EventEmitter`] from their own tasks.
//! [`EventBus::run`] drains the queue in arrival order and hands each event to
//! the handler registered for its kind, with exclusive `&mut` access to the
//! [`AppContext`]. Concurrency therefore ends at the queue: at most one handler
//! runs at any instant and nothing else ever touches the context.
//!
//! The loop ends when a handler returns [`HandlerOutcome::Quit`] or
//! [`HandlerOutcome::Fatal`], when the [`ShutdownHandle`] fires, or when every
//! producer has finished and the queue is empty. On every exit path the
//! producers are cancelled, the service connection is released once, and the
//! renderer restores the terminal.

mod emitter;
mod registry;
mod snapshot;


use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::core::context::AppContext;
use crate::core::event::{Event, EventKind};
use crate::producers::Producer;
use crate::ui::renderer::{NullRenderer, Renderer};

pub use emitter::{EventEmitter, ShutdownHandle};
pub use registry::{Handler, HandlerOutcome, HandlerRegistry};
pub use snapshot::SnapshotReader;

use snapshot::SnapshotPublisher;

const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// A handler asked to quit, or every producer finished and the queue drained.
    Normal,
    /// A handler reported that continuing was unsafe.
    Fatal(String),
    /// The shutdown handle fired.
    Cancelled,
}

impl TerminationReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminationReason::Normal | TerminationReason::Cancelled => 0,
            TerminationReason::Fatal(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events handed to a handler.
    pub dispatched: u64,
    /// Events dropped because no handler was registered for their kind.
    pub unhandled: u64,
    /// Successful renderer invocations.
    pub redraws: u64,
}

/// Result of [`EventBus::run`]: why the loop stopped plus the final state.
#[derive(Debug)]
pub struct Termination {
    pub reason: TerminationReason,
    pub context: AppContext,
    pub stats: DispatchStats,
}

pub struct EventBus {
    context: AppContext,
    registry: HandlerRegistry,
    producers: Vec<Box<dyn Producer>>,
    renderer: Box<dyn Renderer>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    shutdown: CancellationToken,
    snapshots: SnapshotPublisher,
    shutdown_grace: Duration,
}

impl EventBus {
    pub fn new(context: AppContext) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            context,
            registry: HandlerRegistry::new(),
            producers: Vec::new(),
            renderer: Box::new(NullRenderer),
            tx,
            rx,
            shutdown: CancellationToken::new(),
            snapshots: SnapshotPublisher::new(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Adds a producer. It is started when [`run`](Self::run) begins and
    /// emits from its own task until cancelled.
    pub fn subscribe<P>(&mut self, producer: P) -> &mut Self
    where
        P: Producer + 'static,
    {
        self.producers.push(Box::new(producer));
        self
    }

    /// Binds `handler` to `kind`, replacing any earlier binding for that kind.
    ///
    /// Registration is only possible before [`run`](Self::run), which
    /// consumes the bus.
    pub fn register<H>(&mut self, kind: impl Into<EventKind>, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.registry.register(kind, handler);
        self
    }

    pub fn set_renderer<R>(&mut self, renderer: R) -> &mut Self
    where
        R: Renderer + 'static,
    {
        self.renderer = Box::new(renderer);
        self
    }

    /// How long producers get to stop on their own before being aborted.
    pub fn set_shutdown_grace(&mut self, grace: Duration) -> &mut Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn emitter(&self) -> EventEmitter {
        EventEmitter::new(self.tx.clone())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(self.shutdown.clone())
    }

    pub fn snapshot_reader(&self) -> SnapshotReader {
        self.snapshots.reader()
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Starts the producers and dispatches events until the loop terminates.
    pub async fn run(self) -> Termination {
        let EventBus {
            mut context,
            mut registry,
            producers,
            mut renderer,
            tx,
            mut rx,
            shutdown,
            snapshots,
            shutdown_grace,
        } = self;

        let emitter = EventEmitter::new(tx);
        let producer_cancel = shutdown.child_token();
        let mut stats = DispatchStats::default();

        snapshots.publish(context.snapshot());

        let mut tasks = JoinSet::new();
        for producer in producers {
            let name = producer.name();
            debug!(producer = name, "Starting producer");
            let emitter = emitter.clone();
            let reader = snapshots.reader();
            let cancel = producer_cancel.clone();
            tasks.spawn(async move {
                producer.run(emitter, reader, cancel).await;
                name
            });
        }

        info!(
            handlers = registry.len(),
            producers = tasks.len(),
            "Dispatch loop started"
        );
        render(renderer.as_mut(), &context, &mut stats);

        let mut dispatcher = Dispatcher {
            registry: &mut registry,
            context: &mut context,
            renderer: renderer.as_mut(),
            snapshots: &snapshots,
            emitter: &emitter,
            stats: &mut stats,
        };

        let reason = loop {
            if shutdown.is_cancelled() {
                break TerminationReason::Cancelled;
            }

            if tasks.is_empty() {
                match rx.try_recv() {
                    Ok(event) => {
                        if let Some(reason) = dispatcher.dispatch(event) {
                            break reason;
                        }
                        continue;
                    }
                    Err(_) => {
                        debug!("All producers finished and queue drained");
                        break TerminationReason::Normal;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break TerminationReason::Cancelled,
                Some(joined) = tasks.join_next() => log_producer_exit(joined),
                event = rx.recv() => {
                    // The bus holds a sender, so the queue cannot close while running.
                    let Some(event) = event else {
                        break TerminationReason::Normal;
                    };
                    if let Some(reason) = dispatcher.dispatch(event) {
                        break reason;
                    }
                }
            }
        };

        producer_cancel.cancel();
        drop(rx);
        drop(emitter);

        let stopped = tokio::time::timeout(shutdown_grace, async {
            while let Some(joined) = tasks.join_next().await {
                log_producer_exit(joined);
            }
        })
        .await;
        if stopped.is_err() {
            warn!(
                remaining = tasks.len(),
                "Producers did not stop within the grace period; aborting"
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }

        if context.release_connection() {
            debug!("Service connection released");
        }
        if let Err(err) = renderer.restore() {
            warn!(error = %err, "Failed to restore terminal");
        }
        shutdown.cancel();

        match &reason {
            TerminationReason::Fatal(message) => {
                error!(reason = %message, ?stats, "Dispatch loop stopped")
            }
            other => info!(reason = ?other, ?stats, "Dispatch loop stopped"),
        }

        Termination {
            reason,
            context,
            stats,
        }
    }
}

struct Dispatcher<'a> {
    registry: &'a mut HandlerRegistry,
    context: &'a mut AppContext,
    renderer: &'a mut dyn Renderer,
    snapshots: &'a SnapshotPublisher,
    emitter: &'a EventEmitter,
    stats: &'a mut DispatchStats,
}

impl Dispatcher<'_> {
    fn dispatch(&mut self, event: Event) -> Option<TerminationReason> {
        let kind = event.kind().clone();
        let Some(handler) = self.registry.get_mut(&kind) else {
            self.stats.unhandled += 1;
            warn!(kind = %kind, "No handler registered; dropping event");
            return None;
        };

        self.stats.dispatched += 1;
        trace!(
            kind = %kind,
            queued_for = ?event.enqueued_at().elapsed(),
            "Dispatching event"
        );

        let outcome = handler.handle(self.context, event, self.emitter);
        self.snapshots.publish(self.context.snapshot());

        match outcome {
            HandlerOutcome::Handled => None,
            HandlerOutcome::Redraw => {
                render(self.renderer, self.context, self.stats);
                None
            }
            HandlerOutcome::Quit => {
                debug!(kind = %kind, "Handler requested quit");
                Some(TerminationReason::Normal)
            }
            HandlerOutcome::Fatal(message) => {
                error!(kind = %kind, reason = %message, "Handler reported a fatal error");
                Some(TerminationReason::Fatal(message))
            }
        }
    }
}

fn render(renderer: &mut dyn Renderer, context: &AppContext, stats: &mut DispatchStats) {
    match renderer.render(context) {
        Ok(()) => stats.redraws += 1,
        Err(err) => warn!(error = %err, "Render failed"),
    }
}

fn log_producer_exit(joined: Result<&'static str, tokio::task::JoinError>) {
    match joined {
        Ok(name) => debug!(producer = name, "Producer finished"),
        Err(err) if err.is_cancelled() => debug!("Producer aborted"),
        Err(err) => error!(error = %err, "Producer task panicked"),
    }
}
