//! Event-kind to handler bindings.

use std::collections::HashMap;

use tracing::debug;

use super::EventEmitter;
use crate::core::context::AppContext;
use crate::core::event::{Event, EventKind};

/// What the dispatch loop should do after a handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// State (possibly) changed; nothing visible needs redrawing.
    Handled,
    /// State changed in a way the renderer should show.
    Redraw,
    /// Stop the loop normally after this event.
    Quit,
    /// Continuing is unsafe; stop the loop and report the reason.
    Fatal(String),
}

impl From<bool> for HandlerOutcome {
    fn from(changed: bool) -> Self {
        if changed {
            HandlerOutcome::Redraw
        } else {
            HandlerOutcome::Handled
        }
    }
}

/// Behavior bound to one event kind.
///
/// Handlers run on the dispatch loop only, one at a time, with exclusive
/// access to the context. They must return quickly: anything that waits on
/// the network or disk belongs in a producer whose result comes back as a
/// later event. A handler that cannot finish must leave the context as it
/// found it.
pub trait Handler: Send {
    fn handle(
        &mut self,
        ctx: &mut AppContext,
        event: Event,
        emitter: &EventEmitter,
    ) -> HandlerOutcome;
}

impl<F> Handler for F
where
    F: FnMut(&mut AppContext, Event, &EventEmitter) -> HandlerOutcome + Send,
{
    fn handle(
        &mut self,
        ctx: &mut AppContext,
        event: Event,
        emitter: &EventEmitter,
    ) -> HandlerOutcome {
        self(ctx, event, emitter)
    }
}

/// Mapping from event kind to its single handler.
///
/// Registering a kind that already has a handler replaces the earlier one
/// (last writer wins); the displaced handler is returned to the caller.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(
        &mut self,
        kind: impl Into<EventKind>,
        handler: H,
    ) -> Option<Box<dyn Handler>>
    where
        H: Handler + 'static,
    {
        let kind = kind.into();
        let previous = self.handlers.insert(kind.clone(), Box::new(handler));
        if previous.is_some() {
            debug!(kind = %kind, "Replacing previously registered handler");
        }
        previous
    }

    pub fn get_mut(&mut self, kind: &EventKind) -> Option<&mut Box<dyn Handler>> {
        self.handlers.get_mut(kind)
    }

    pub fn contains(&self, kind: &EventKind) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn context() -> AppContext {
        AppContext::new(Arc::new(Config::default()), "test")
    }

    fn emitter() -> EventEmitter {
        let (tx, _rx) = mpsc::unbounded_channel();
        EventEmitter::new(tx)
    }

    #[test]
    fn re_registration_replaces_the_handler() {
        let mut registry = HandlerRegistry::new();
        let first = registry.register(
            EventKind::Render,
            |_: &mut AppContext, _: Event, _: &EventEmitter| HandlerOutcome::Handled,
        );
        assert!(first.is_none());

        let displaced = registry.register(
            "render",
            |_: &mut AppContext, _: Event, _: &EventEmitter| HandlerOutcome::Quit,
        );
        assert!(displaced.is_some());
        assert_eq!(registry.len(), 1);

        let handler = registry.get_mut(&EventKind::Render).expect("registered");
        let outcome = handler.handle(&mut context(), Event::render(), &emitter());
        assert_eq!(outcome, HandlerOutcome::Quit);
    }

    #[test]
    fn lookup_of_unregistered_kind_is_none() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get_mut(&EventKind::from("custom")).is_none());
        assert!(!registry.contains(&EventKind::Key));
    }

    #[test]
    fn bool_converts_to_redraw_or_handled() {
        assert_eq!(HandlerOutcome::from(true), HandlerOutcome::Redraw);
        assert_eq!(HandlerOutcome::from(false), HandlerOutcome::Handled);
    }
}
