//! Default handler set for the interactive client.
//!
//! Every handler here is a plain function over `&mut AppContext`. They never
//! wait on I/O: outbound commands go through the connection's non-blocking
//! `send`, and anything slower arrives later as its own event.

mod keys;
mod service;
mod system;

#[cfg(test)]
mod tests;

use tracing::warn;

use crate::bus::EventBus;
use crate::core::context::AppContext;
use crate::core::event::EventKind;
use crate::core::message::ChannelId;
use crate::service::{OutboundCommand, ServiceError};

pub use keys::{on_key, on_paste};
pub use service::{
    on_channel, on_connected, on_disconnect, on_message, on_presence, on_service_error, on_typing,
};
pub use system::{on_quit, on_render, on_resize, on_tick};

/// Binds the default handler for every known event kind.
pub fn register_defaults(bus: &mut EventBus) {
    bus.register(EventKind::Key, on_key)
        .register(EventKind::Paste, on_paste)
        .register(EventKind::Resize, on_resize)
        .register(EventKind::ServiceConnected, on_connected)
        .register(EventKind::ServiceMessage, on_message)
        .register(EventKind::ServicePresence, on_presence)
        .register(EventKind::ServiceTyping, on_typing)
        .register(EventKind::ServiceChannel, on_channel)
        .register(EventKind::ServiceError, on_service_error)
        .register(EventKind::ServiceDisconnect, on_disconnect)
        .register(EventKind::TimerTick, on_tick)
        .register(EventKind::Render, on_render)
        .register(EventKind::Quit, on_quit);
}

/// Selects `id` and tells the service the channel has been read.
pub(crate) fn select_and_mark_read(ctx: &mut AppContext, id: &ChannelId) {
    if let Err(err) = ctx.select_channel(id) {
        ctx.view.set_status(err.to_string());
        return;
    }
    mark_read(ctx, id.clone());
}

pub(crate) fn mark_read(ctx: &mut AppContext, channel: ChannelId) {
    match ctx.send(OutboundCommand::MarkRead { channel }) {
        Ok(()) | Err(ServiceError::NotConnected) => {}
        Err(err) => warn!(error = %err, "Failed to mark channel read"),
    }
}
