//! Terminal input producer.
//!
//! Polling the terminal blocks, so the loop runs on a blocking thread with a
//! short poll timeout and checks for cancellation between polls.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use ratatui::crossterm::event::{self, Event as TermEvent, KeyEventKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Producer;
use crate::bus::{EventEmitter, SnapshotReader};
use crate::core::event::{Event, EventKind, EventPayload};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Source of raw terminal events.
pub trait InputSource: Send + 'static {
    /// Waits up to `timeout` for the next event; `Ok(None)` on timeout.
    fn next_event(&mut self, timeout: Duration) -> io::Result<Option<TermEvent>>;
}

/// Reads from the process terminal through crossterm.
pub struct CrosstermInput;

impl InputSource for CrosstermInput {
    fn next_event(&mut self, timeout: Duration) -> io::Result<Option<TermEvent>> {
        if event::poll(timeout)? {
            event::read().map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Scripted source that replays a fixed sequence, then idles.
pub struct ScriptedInput {
    events: VecDeque<io::Result<TermEvent>>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = io::Result<TermEvent>>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn next_event(&mut self, timeout: Duration) -> io::Result<Option<TermEvent>> {
        match self.events.pop_front() {
            Some(result) => result.map(Some),
            None => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

pub struct TerminalInputProducer<S: InputSource> {
    source: S,
}

impl<S: InputSource> TerminalInputProducer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl TerminalInputProducer<CrosstermInput> {
    pub fn crossterm() -> Self {
        Self::new(CrosstermInput)
    }
}

#[async_trait]
impl<S: InputSource> Producer for TerminalInputProducer<S> {
    fn name(&self) -> &'static str {
        "terminal-input"
    }

    async fn run(
        self: Box<Self>,
        emitter: EventEmitter,
        _snapshot: SnapshotReader,
        cancel: CancellationToken,
    ) {
        let mut source = self.source;
        let worker = tokio::task::spawn_blocking(move || {
            let mut failing = false;
            while !cancel.is_cancelled() {
                match source.next_event(POLL_INTERVAL) {
                    Ok(Some(raw)) => {
                        failing = false;
                        if let Some(event) = translate(raw) {
                            if !emitter.emit(event) {
                                break;
                            }
                        }
                    }
                    Ok(None) => failing = false,
                    Err(err) => {
                        if failing {
                            debug!(error = %err, "Terminal poll still failing");
                        } else {
                            warn!(error = %err, "Terminal poll failed");
                        }
                        failing = true;
                        std::thread::sleep(POLL_INTERVAL);
                    }
                }
            }
        });

        if let Err(err) = worker.await {
            warn!(error = %err, "Terminal input worker ended abnormally");
        }
        debug!("Terminal input producer stopped");
    }
}

/// Maps one raw terminal event to at most one bus event.
pub fn translate(raw: TermEvent) -> Option<Event> {
    match raw {
        TermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::key(key.into())),
        TermEvent::Key(_) => None,
        TermEvent::Resize(width, height) => Some(Event::resize(width, height)),
        TermEvent::Paste(text) => {
            let text = sanitize_pasted_text(&text);
            if text.is_empty() {
                None
            } else {
                Some(Event::new(EventKind::Paste, EventPayload::Paste(text)))
            }
        }
        _ => None,
    }
}

pub(crate) fn sanitize_pasted_text(text: &str) -> String {
    let without_crlf = text.replace("\r\n", "\n");
    let without_cr = without_crlf.replace('\r', "\n");
    let expanded_tabs = without_cr.replace('\t', "    ");
    expanded_tabs
        .chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::KeyInput;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers};
    use tokio::sync::mpsc;

    fn press(c: char) -> TermEvent {
        TermEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn release(c: char) -> TermEvent {
        TermEvent::Key(KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn sanitize_paste_text_removes_control_characters() {
        let input = "Hello\tworld\r\nThis is\x01fine";
        let sanitized = sanitize_pasted_text(input);
        assert_eq!(sanitized, "Hello    world\nThis isfine");
    }

    #[test]
    fn translate_ignores_key_releases_and_focus() {
        assert!(translate(release('a')).is_none());
        assert!(translate(TermEvent::FocusGained).is_none());
        assert!(translate(TermEvent::Paste("\x01".into())).is_none());

        let event = translate(press('a')).expect("press");
        assert_eq!(event.payload(), &EventPayload::Key(KeyInput::char('a')));

        let resize = translate(TermEvent::Resize(100, 40)).expect("resize");
        assert_eq!(resize.kind(), &EventKind::Resize);
    }

    #[tokio::test]
    async fn emits_in_source_order_and_survives_errors() {
        let source = ScriptedInput::new([
            Ok(press('a')),
            Err(io::Error::new(io::ErrorKind::Other, "glitch")),
            Ok(release('a')),
            Ok(TermEvent::Resize(80, 24)),
            Ok(press('b')),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let producer = Box::new(TerminalInputProducer::new(source));
        let handle = tokio::spawn(producer.run(
            EventEmitter::new(tx),
            SnapshotReader::detached(),
            cancel.clone(),
        ));

        let mut kinds = Vec::new();
        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("event in time")
                .expect("channel open");
            kinds.push(event.kind().as_str().to_string());
        }
        cancel.cancel();
        handle.await.expect("join");

        assert_eq!(kinds, vec!["key", "resize", "key"]);
    }
}
