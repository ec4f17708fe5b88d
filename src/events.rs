//! Keyboard handling for the full-screen dashboard.
//!
//! Raw mode turns Ctrl-C into an ordinary key press, so a blocking thread
//! watches the keyboard and fires the shutdown signal itself.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::watch;
use tracing::{debug, warn};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// `q`, `Esc` or Ctrl-C.
pub fn is_quit_key(key: KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Watch the keyboard until a quit key is pressed or shutdown fires
/// elsewhere.
pub fn spawn_quit_listener(shutdown: watch::Sender<bool>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("quit-listener".to_string())
        .spawn(move || {
            while !*shutdown.borrow() {
                match poll_event(POLL_TIMEOUT) {
                    Ok(Some(Event::Key(key))) if is_quit_key(key) => {
                        debug!("quit key pressed");
                        shutdown.send_replace(true);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("keyboard polling failed: {}", e);
                        shutdown.send_replace(true);
                    }
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_quit_keys() {
        assert!(is_quit_key(key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_other_keys_ignored() {
        assert!(!is_quit_key(key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(key(KeyCode::Char('x'), KeyModifiers::NONE)));
        assert!(!is_quit_key(key(KeyCode::Enter, KeyModifiers::NONE)));
    }

    #[test]
    fn test_release_is_ignored() {
        let mut release = key(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(!is_quit_key(release));
    }
}
