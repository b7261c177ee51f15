use std::io::{self, Stdout};

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::Terminal;

pub type StdoutTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Enters raw mode and the alternate screen with bracketed paste enabled.
///
/// On failure the terminal is put back the way it was before returning.
pub fn setup_terminal() -> io::Result<StdoutTerminal> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableBracketedPaste) {
        let _ = disable_raw_mode();
        return Err(err);
    }

    Terminal::new(CrosstermBackend::new(io::stdout())).inspect_err(|_| {
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste);
        let _ = disable_raw_mode();
    })
}

pub fn restore_terminal(terminal: &mut StdoutTerminal) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()
}
