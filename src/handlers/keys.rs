use ratatui::crossterm::event::KeyCode;
use tracing::{debug, warn};

use super::select_and_mark_read;
use crate::bus::{EventEmitter, HandlerOutcome};
use crate::core::context::AppContext;
use crate::core::event::{Event, EventPayload, KeyInput};
use crate::core::view::Mode;
use crate::service::OutboundCommand;

pub fn on_key(ctx: &mut AppContext, event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    let EventPayload::Key(key) = event.into_payload() else {
        return HandlerOutcome::Handled;
    };
    ctx.view.push_key(key.describe());

    if key.is_ctrl('c') {
        return HandlerOutcome::Quit;
    }

    match ctx.view.mode {
        Mode::Command => command_key(ctx, key),
        Mode::Insert => insert_key(ctx, key),
        Mode::Search => search_key(ctx, key),
    }
}

pub fn on_paste(ctx: &mut AppContext, event: Event, _emitter: &EventEmitter) -> HandlerOutcome {
    let EventPayload::Paste(text) = event.into_payload() else {
        return HandlerOutcome::Handled;
    };
    match ctx.view.mode {
        Mode::Insert => {
            ctx.view.input.push_str(&text);
            HandlerOutcome::Redraw
        }
        Mode::Search => {
            let first_line = text.lines().next().unwrap_or_default();
            ctx.view.search.push_str(first_line);
            HandlerOutcome::Redraw
        }
        Mode::Command => HandlerOutcome::Handled,
    }
}

fn page_size(ctx: &AppContext) -> u16 {
    (ctx.view.term_height / 2).max(1)
}

fn command_key(ctx: &mut AppContext, key: KeyInput) -> HandlerOutcome {
    let moved = match (key.code, key.text_char()) {
        (_, Some('q')) => return HandlerOutcome::Quit,
        (_, Some('i')) => {
            ctx.view.mode = Mode::Insert;
            return HandlerOutcome::Redraw;
        }
        (_, Some('/')) => {
            ctx.view.mode = Mode::Search;
            ctx.view.search.clear();
            return HandlerOutcome::Redraw;
        }
        (KeyCode::Down, _) | (_, Some('j')) => ctx.select_relative(1),
        (KeyCode::Up, _) | (_, Some('k')) => ctx.select_relative(-1),
        (_, Some('g')) => ctx.select_first(),
        (_, Some('G')) => ctx.select_last(),
        (KeyCode::PageUp, _) => {
            let lines = page_size(ctx);
            ctx.view.scroll_up(lines);
            return HandlerOutcome::Redraw;
        }
        (KeyCode::PageDown, _) => {
            let lines = page_size(ctx);
            ctx.view.scroll_down(lines);
            return HandlerOutcome::Redraw;
        }
        _ => return HandlerOutcome::Handled,
    };

    match moved {
        Some(id) => {
            super::mark_read(ctx, id);
            HandlerOutcome::Redraw
        }
        None => HandlerOutcome::Handled,
    }
}

fn insert_key(ctx: &mut AppContext, key: KeyInput) -> HandlerOutcome {
    match key.code {
        KeyCode::Esc => ctx.view.mode = Mode::Command,
        KeyCode::Backspace => {
            ctx.view.input.pop();
        }
        KeyCode::Enter => submit_input(ctx),
        _ => match key.text_char() {
            Some(c) => ctx.view.input.push(c),
            None => return HandlerOutcome::Handled,
        },
    }
    HandlerOutcome::Redraw
}

fn submit_input(ctx: &mut AppContext) {
    let text = ctx.view.input.trim().to_string();
    if text.is_empty() {
        return;
    }
    let Some(channel) = ctx.current_channel().cloned() else {
        ctx.view.set_status("No channel selected");
        return;
    };
    if !ctx.is_connected() {
        ctx.view.set_status("Not connected; message not sent");
        return;
    }

    match ctx.send(OutboundCommand::SendMessage {
        channel: channel.clone(),
        text,
    }) {
        Ok(()) => {
            debug!(channel = %channel, "Message handed to service");
            ctx.view.input.clear();
            ctx.view.status = None;
        }
        Err(err) => {
            warn!(channel = %channel, error = %err, "Failed to send message");
            ctx.view.set_status(format!("Send failed: {err}"));
        }
    }
}

fn search_key(ctx: &mut AppContext, key: KeyInput) -> HandlerOutcome {
    match key.code {
        KeyCode::Esc => {
            ctx.view.search.clear();
            ctx.view.mode = Mode::Command;
        }
        KeyCode::Backspace => {
            ctx.view.search.pop();
        }
        KeyCode::Enter => {
            let first = ctx
                .filter_channels(&ctx.view.search)
                .first()
                .map(|channel| channel.id.clone());
            match first {
                Some(id) => select_and_mark_read(ctx, &id),
                None => ctx.view.set_status("No matching channel"),
            }
            ctx.view.search.clear();
            ctx.view.mode = Mode::Command;
        }
        _ => match key.text_char() {
            Some(c) => ctx.view.search.push(c),
            None => return HandlerOutcome::Handled,
        },
    }
    HandlerOutcome::Redraw
}
