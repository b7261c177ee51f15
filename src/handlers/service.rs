use std::time::Instant;

use tracing::{debug, info, warn};

use crate::bus::{EventEmitter, HandlerOutcome};
use crate::core::context::AppContext;
use crate::core::event::{Event, EventPayload};
use crate::core::message::ChannelUpdate;

pub fn on_connected(ctx: &mut AppContext, event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    let EventPayload::Connected { user } = event.into_payload() else {
        return HandlerOutcome::Handled;
    };
    info!(user = %user, workspace = ctx.workspace(), "Connected");
    ctx.view.banner = None;
    ctx.view.set_status(format!("Connected as {user}"));
    ctx.set_user(user);
    HandlerOutcome::Redraw
}

pub fn on_message(ctx: &mut AppContext, event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    let EventPayload::Message(message) = event.into_payload() else {
        return HandlerOutcome::Handled;
    };
    ctx.record_message(message);
    HandlerOutcome::Redraw
}

pub fn on_presence(ctx: &mut AppContext, event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    let EventPayload::Presence { user, presence } = event.into_payload() else {
        return HandlerOutcome::Handled;
    };
    let changed = ctx.presence_of(&user) != Some(presence);
    ctx.set_presence(&user, presence);
    changed.into()
}

pub fn on_typing(ctx: &mut AppContext, event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    let EventPayload::Typing { channel, user } = event.into_payload() else {
        return HandlerOutcome::Handled;
    };
    if ctx.user() == Some(user.as_str()) {
        return HandlerOutcome::Handled;
    }
    let expires_at = Instant::now() + ctx.config().typing_timeout();
    ctx.view.set_typing(channel, user, expires_at);
    HandlerOutcome::Redraw
}

pub fn on_channel(ctx: &mut AppContext, event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    let EventPayload::Channel(update) = event.into_payload() else {
        return HandlerOutcome::Handled;
    };
    match update {
        ChannelUpdate::Joined { id, name } => {
            debug!(channel = %id, name = %name, "Channel joined");
            ctx.upsert_channel(id, name);
            HandlerOutcome::Redraw
        }
        ChannelUpdate::Left { id } => match ctx.remove_channel(&id) {
            Some(removed) => {
                debug!(channel = %id, name = %removed.name, "Channel left");
                HandlerOutcome::Redraw
            }
            None => HandlerOutcome::Handled,
        },
    }
}

pub fn on_service_error(
    ctx: &mut AppContext,
    event: Event,
    _emitter: &EventEmitter,
) -> HandlerOutcome {
    let EventPayload::Error(message) = event.into_payload() else {
        return HandlerOutcome::Handled;
    };
    warn!(error = %message, "Service reported an error");
    ctx.view.set_status(format!("Service error: {message}"));
    HandlerOutcome::Redraw
}

/// Drops the connection and leaves a banner; the session keeps running
/// with whatever state it already has.
pub fn on_disconnect(
    ctx: &mut AppContext,
    event: Event,
    _emitter: &EventEmitter,
) -> HandlerOutcome {
    let reason = match event.into_payload() {
        EventPayload::Disconnect { reason } => reason,
        _ => "unknown reason".to_string(),
    };
    if ctx.release_connection() {
        info!(reason = %reason, "Released service connection");
    }
    ctx.view.banner = Some(format!("Disconnected: {reason}"));
    HandlerOutcome::Redraw
}
