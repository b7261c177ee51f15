use std::time::Instant;

use crate::bus::{EventEmitter, HandlerOutcome};
use crate::core::context::AppContext;
use crate::core::event::{Event, EventPayload};

/// Expires stale typing indicators; redraws only when one went away.
pub fn on_tick(ctx: &mut AppContext, _event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    ctx.view.expire_typing(Instant::now()).into()
}

pub fn on_resize(ctx: &mut AppContext, event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    if let EventPayload::Resize { width, height } = event.into_payload() {
        ctx.view.term_width = width;
        ctx.view.term_height = height;
    }
    HandlerOutcome::Redraw
}

pub fn on_render(_ctx: &mut AppContext, _event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    HandlerOutcome::Redraw
}

pub fn on_quit(_ctx: &mut AppContext, _event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    HandlerOutcome::Quit
}
