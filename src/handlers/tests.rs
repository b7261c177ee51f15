use std::sync::Arc;

use ratatui::crossterm::event::KeyCode;
use tokio::sync::mpsc;

use super::*;
use crate::bus::{EventEmitter, HandlerOutcome};
use crate::core::config::Config;
use crate::core::event::{Event, EventKind, EventPayload, KeyInput};
use crate::core::message::{ChannelUpdate, ChatMessage, Presence};
use crate::core::view::Mode;
use crate::service::{ConnectionTransport, ServiceConnection};

// None of the default handlers emit, so the receiving end can go away.
fn emitter() -> EventEmitter {
    let (tx, _rx) = mpsc::unbounded_channel();
    EventEmitter::new(tx)
}

fn connected(config: Config) -> (AppContext, ConnectionTransport) {
    let (connection, transport) = ServiceConnection::pair("me");
    let mut ctx = AppContext::new(Arc::new(config), "test").with_connection(connection);
    ctx.upsert_channel(ChannelId::new("C1"), "general".into());
    ctx.upsert_channel(ChannelId::new("C2"), "random".into());
    (ctx, transport)
}

fn key(ctx: &mut AppContext, input: KeyInput) -> HandlerOutcome {
    on_key(ctx, Event::key(input), &emitter())
}

fn type_text(ctx: &mut AppContext, text: &str) {
    for c in text.chars() {
        key(ctx, KeyInput::char(c));
    }
}

fn drain(transport: &mut ConnectionTransport) -> Vec<OutboundCommand> {
    let mut commands = Vec::new();
    while let Ok(command) = transport.outbound.try_recv() {
        commands.push(command);
    }
    commands
}

#[test]
fn keys_are_logged_in_order() {
    let (mut ctx, _transport) = connected(Config::default());
    key(&mut ctx, KeyInput::char('a'));
    key(&mut ctx, KeyInput::char('b'));
    key(&mut ctx, KeyInput::plain(KeyCode::Enter));
    assert_eq!(ctx.view.key_log().collect::<Vec<_>>(), vec!["a", "b", "<enter>"]);
}

#[test]
fn ctrl_c_quits_from_any_mode() {
    let (mut ctx, _transport) = connected(Config::default());
    for mode in [Mode::Command, Mode::Insert, Mode::Search] {
        ctx.view.mode = mode;
        assert_eq!(key(&mut ctx, KeyInput::ctrl('c')), HandlerOutcome::Quit);
    }
    ctx.view.mode = Mode::Command;
    assert_eq!(key(&mut ctx, KeyInput::char('q')), HandlerOutcome::Quit);
}

#[test]
fn insert_mode_sends_to_current_channel() {
    let (mut ctx, mut transport) = connected(Config::default());
    assert_eq!(key(&mut ctx, KeyInput::char('i')), HandlerOutcome::Redraw);
    assert_eq!(ctx.view.mode, Mode::Insert);

    type_text(&mut ctx, "hellp");
    key(&mut ctx, KeyInput::plain(KeyCode::Backspace));
    type_text(&mut ctx, "o");
    assert_eq!(ctx.view.input, "hello");

    key(&mut ctx, KeyInput::plain(KeyCode::Enter));
    assert!(ctx.view.input.is_empty());
    assert_eq!(
        drain(&mut transport),
        vec![OutboundCommand::SendMessage {
            channel: ChannelId::new("C1"),
            text: "hello".into(),
        }]
    );

    key(&mut ctx, KeyInput::plain(KeyCode::Esc));
    assert_eq!(ctx.view.mode, Mode::Command);
}

#[test]
fn sending_without_connection_keeps_input() {
    let (mut ctx, _transport) = connected(Config::default());
    ctx.release_connection();
    ctx.view.mode = Mode::Insert;
    type_text(&mut ctx, "lost");
    key(&mut ctx, KeyInput::plain(KeyCode::Enter));
    assert_eq!(ctx.view.input, "lost");
    assert!(ctx.view.status.is_some());
}

#[test]
fn navigation_marks_channels_read() {
    let (mut ctx, mut transport) = connected(Config::default());
    ctx.record_message(ChatMessage::new("C2", "ada", "ping"));
    assert_eq!(ctx.channel(&ChannelId::new("C2")).map(|c| c.unread), Some(1));

    assert_eq!(key(&mut ctx, KeyInput::char('j')), HandlerOutcome::Redraw);
    assert_eq!(ctx.current_channel(), Some(&ChannelId::new("C2")));
    assert_eq!(ctx.channel(&ChannelId::new("C2")).map(|c| c.unread), Some(0));
    assert_eq!(
        drain(&mut transport),
        vec![OutboundCommand::MarkRead {
            channel: ChannelId::new("C2")
        }]
    );

    key(&mut ctx, KeyInput::char('g'));
    assert_eq!(ctx.current_channel(), Some(&ChannelId::new("C1")));
    key(&mut ctx, KeyInput::char('G'));
    assert_eq!(ctx.current_channel(), Some(&ChannelId::new("C2")));
}

#[test]
fn search_selects_first_match() {
    let (mut ctx, _transport) = connected(Config::default());
    key(&mut ctx, KeyInput::char('/'));
    assert_eq!(ctx.view.mode, Mode::Search);
    type_text(&mut ctx, "RAN");
    key(&mut ctx, KeyInput::plain(KeyCode::Enter));

    assert_eq!(ctx.view.mode, Mode::Command);
    assert!(ctx.view.search.is_empty());
    assert_eq!(ctx.current_channel(), Some(&ChannelId::new("C2")));
}

#[test]
fn paste_goes_to_input_only_in_insert_mode() {
    let (mut ctx, _transport) = connected(Config::default());
    let paste = || Event::new(EventKind::Paste, EventPayload::Paste("pasted".into()));

    assert_eq!(on_paste(&mut ctx, paste(), &emitter()), HandlerOutcome::Handled);
    assert!(ctx.view.input.is_empty());

    ctx.view.mode = Mode::Insert;
    on_paste(&mut ctx, paste(), &emitter());
    assert_eq!(ctx.view.input, "pasted");
}

#[test]
fn disconnect_releases_connection_and_sets_banner() {
    let (mut ctx, transport) = connected(Config::default());
    on_message(
        &mut ctx,
        Event::message(ChatMessage::new("C1", "ada", "before")),
        &emitter(),
    );
    on_disconnect(&mut ctx, Event::disconnect("server restart"), &emitter());

    assert!(ctx.connection().is_none());
    assert!(transport.closed.is_cancelled());
    assert_eq!(ctx.view.banner.as_deref(), Some("Disconnected: server restart"));
    assert_eq!(ctx.view.message_count(&ChannelId::new("C1")), 1);

    // A second disconnect changes nothing about the already released connection.
    on_disconnect(&mut ctx, Event::disconnect("again"), &emitter());
    assert!(ctx.connection().is_none());
}

#[test]
fn leaving_current_channel_clears_selection() {
    let (mut ctx, _transport) = connected(Config::default());
    let left = Event::new(
        EventKind::ServiceChannel,
        EventPayload::Channel(ChannelUpdate::Left {
            id: ChannelId::new("C1"),
        }),
    );
    assert_eq!(on_channel(&mut ctx, left, &emitter()), HandlerOutcome::Redraw);
    assert_eq!(ctx.current_channel(), None);
    assert!(ctx.channel(&ChannelId::new("C1")).is_none());
}

#[test]
fn typing_indicators_expire_on_tick() {
    let config = Config {
        typing_timeout_secs: Some(0),
        ..Config::default()
    };
    let (mut ctx, _transport) = connected(config);
    let typing = Event::new(
        EventKind::ServiceTyping,
        EventPayload::Typing {
            channel: ChannelId::new("C1"),
            user: "ada".into(),
        },
    );
    on_typing(&mut ctx, typing, &emitter());
    assert_eq!(ctx.view.typing_users(&ChannelId::new("C1")), vec!["ada"]);

    assert_eq!(on_tick(&mut ctx, Event::tick(), &emitter()), HandlerOutcome::Redraw);
    assert!(!ctx.view.has_typing());
    assert_eq!(on_tick(&mut ctx, Event::tick(), &emitter()), HandlerOutcome::Handled);
}

#[test]
fn presence_redraws_only_on_change() {
    let (mut ctx, _transport) = connected(Config::default());
    let away = || {
        Event::new(
            EventKind::ServicePresence,
            EventPayload::Presence {
                user: "ada".into(),
                presence: Presence::Away,
            },
        )
    };
    assert_eq!(on_presence(&mut ctx, away(), &emitter()), HandlerOutcome::Redraw);
    assert_eq!(on_presence(&mut ctx, away(), &emitter()), HandlerOutcome::Handled);
    assert_eq!(ctx.presence_of("ada"), Some(Presence::Away));
}

#[test]
fn resize_records_terminal_size() {
    let (mut ctx, _transport) = connected(Config::default());
    on_resize(&mut ctx, Event::resize(120, 40), &emitter());
    assert_eq!((ctx.view.term_width, ctx.view.term_height), (120, 40));
    assert_eq!(on_quit(&mut ctx, Event::quit(), &emitter()), HandlerOutcome::Quit);
}
