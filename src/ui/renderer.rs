use std::io;

use ratatui::layout::Size;
use tracing::debug;

use super::layout;
use super::lifecycle::{restore_terminal, setup_terminal, StdoutTerminal};
use crate::core::context::AppContext;

/// Draws the context to whatever display the session owns.
///
/// The bus calls [`render`](Renderer::render) at most once per dispatched
/// event and [`restore`](Renderer::restore) once on every exit path; restore
/// must tolerate being called again.
pub trait Renderer: Send {
    fn render(&mut self, ctx: &AppContext) -> io::Result<()>;

    fn restore(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Renderer for headless runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _ctx: &AppContext) -> io::Result<()> {
        Ok(())
    }
}

pub struct TerminalRenderer {
    terminal: StdoutTerminal,
    restored: bool,
}

impl TerminalRenderer {
    /// Takes over the process terminal.
    pub fn stdout() -> io::Result<Self> {
        Ok(Self {
            terminal: setup_terminal()?,
            restored: false,
        })
    }

    pub fn size(&self) -> io::Result<Size> {
        self.terminal.size()
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, ctx: &AppContext) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.terminal.draw(|frame| layout::draw(frame, ctx))?;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        let terminal = &mut self.terminal;
        restore_once(&mut self.restored, || {
            debug!("Restoring terminal");
            restore_terminal(terminal)
        })
    }
}

/// Runs `restore` unless an earlier call succeeded. A failed attempt leaves
/// `restored` unset so the next call (or `Drop`) tries again.
fn restore_once(
    restored: &mut bool,
    restore: impl FnOnce() -> io::Result<()>,
) -> io::Result<()> {
    if *restored {
        return Ok(());
    }
    restore()?;
    *restored = true;
    Ok(())
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
