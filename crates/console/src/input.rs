use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

/// Input events that the application can handle
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Display controls
    NextInterface,
    CycleUnit,
    ToggleSystemStats,

    // Application control
    ShowHelp,
    Quit,

    // System
    Resize,
    Tick,

    // Unknown/unhandled
    Unknown,
}

/// Converts crossterm events to application events
#[derive(Debug, Default)]
pub struct InputHandler;

impl InputHandler {
    pub fn new() -> Self {
        Self
    }

    /// Poll for input events with a timeout
    pub fn poll_event(&mut self, timeout: Duration) -> anyhow::Result<Option<InputEvent>> {
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
                    Ok(Some(self.handle_key_event(key_event)))
                }
                Event::Resize(_, _) => Ok(Some(InputEvent::Resize)),
                _ => Ok(Some(InputEvent::Unknown)),
            }
        } else {
            Ok(Some(InputEvent::Tick))
        }
    }

    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> InputEvent {
        if key_event.modifiers.contains(KeyModifiers::CONTROL) {
            return match key_event.code {
                KeyCode::Char('c') => InputEvent::Quit,
                _ => InputEvent::Unknown,
            };
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => InputEvent::Quit,
            KeyCode::Char('i') | KeyCode::Char('I') => InputEvent::NextInterface,
            KeyCode::Char('u') | KeyCode::Char('U') => InputEvent::CycleUnit,
            KeyCode::Char('s') | KeyCode::Char('S') => InputEvent::ToggleSystemStats,
            KeyCode::Char('?') | KeyCode::F(1) => InputEvent::ShowHelp,
            _ => InputEvent::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        let mut handler = InputHandler::new();
        assert_eq!(handler.handle_key_event(key(KeyCode::Char('q'))), InputEvent::Quit);
        assert_eq!(handler.handle_key_event(key(KeyCode::Esc)), InputEvent::Quit);
        assert_eq!(
            handler.handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            InputEvent::Quit
        );
    }

    #[test]
    fn test_display_keys() {
        let mut handler = InputHandler::new();
        assert_eq!(handler.handle_key_event(key(KeyCode::Char('i'))), InputEvent::NextInterface);
        assert_eq!(handler.handle_key_event(key(KeyCode::Char('u'))), InputEvent::CycleUnit);
        assert_eq!(
            handler.handle_key_event(key(KeyCode::Char('s'))),
            InputEvent::ToggleSystemStats
        );
        assert_eq!(handler.handle_key_event(key(KeyCode::Char('?'))), InputEvent::ShowHelp);
        assert_eq!(handler.handle_key_event(key(KeyCode::Char('x'))), InputEvent::Unknown);
    }

    #[test]
    fn test_plain_c_is_not_quit() {
        let mut handler = InputHandler::new();
        assert_eq!(handler.handle_key_event(key(KeyCode::Char('c'))), InputEvent::Unknown);
    }
}
