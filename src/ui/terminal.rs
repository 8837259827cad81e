use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{debug, info};

use super::app::App;

/// How long to wait for input before redrawing.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Raw-mode alternate screen owned for the lifetime of the UI.
struct Session {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Session {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))
            .context("failed to create terminal backend")?;
        debug!("entered alternate screen");
        Ok(Self { terminal })
    }

    /// Next key press, or `None` when nothing arrived within the poll window.
    fn next_key(&self) -> Result<Option<KeyEvent>> {
        if !event::poll(POLL_INTERVAL).context("event polling failed")? {
            return Ok(None);
        }
        match event::read().context("failed to read event")? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key)),
            _ => Ok(None),
        }
    }

    fn leave(mut self) -> Result<()> {
        disable_raw_mode().context("failed to disable raw mode")?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .context("failed to leave alternate screen")?;
        self.terminal
            .show_cursor()
            .context("failed to restore cursor visibility")
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Take over the terminal, draw and dispatch keys until the app asks to quit
/// or Ctrl-C is pressed, then hand the terminal back.
pub fn run_app(app: &mut App) -> Result<()> {
    let mut session = Session::enter()?;

    let outcome = (|| -> Result<()> {
        loop {
            session
                .terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;

            let Some(key) = session.next_key()? else {
                continue;
            };
            if is_interrupt(&key) || app.handle_key(key.code)? {
                return Ok(());
            }
        }
    })();

    session.leave()?;
    info!("terminal restored");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ctrl_c_interrupts() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert!(is_interrupt(&ctrl_c));
        assert!(!is_interrupt(&plain_c));
        assert!(!is_interrupt(&ctrl_d));
    }
}
