//! Injected confirmation capability guarding destructive operations.

use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

/// Synchronous yes/no prompt. Blocking is acceptable here: this models a
/// native modal dialog and is the single exception to the engine's
/// non-blocking rule.
pub trait ConfirmPrompt {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Fixed answer, for tests and headless embedders.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl ConfirmPrompt for AutoConfirm {
    fn confirm(&mut self, _message: &str) -> bool {
        self.0
    }
}

/// Terminal-backed prompt: writes the question to stderr and blocks until a
/// `y`/`n` (or Esc) keypress arrives on the event stream.
#[derive(Debug, Default)]
pub struct TerminalConfirm;

impl ConfirmPrompt for TerminalConfirm {
    fn confirm(&mut self, message: &str) -> bool {
        let mut err = io::stderr();
        let _ = write!(err, "{message} [y/n] ");
        let _ = err.flush();

        loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => return true,
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => return false,
                    _ => {}
                },
                Ok(_) => {}
                Err(_) => return false,
            }
        }
    }
}
