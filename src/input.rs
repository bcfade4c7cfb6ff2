use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PlayPause,
    Next,
    Previous,
    Quit,
    ToggleSecondaryInfo,
}

pub trait InputSource {
    /// Waits at most `timeout` for the next event.
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>>;
}

/// Reads key presses from the terminal.
#[derive(Debug, Default)]
pub struct KeyboardInput;

impl InputSource for KeyboardInput {
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        Ok(map_key(key))
    }
}

pub fn map_key(key: KeyEvent) -> Option<InputEvent> {
    let event = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => InputEvent::Quit,
        KeyCode::Char(' ') | KeyCode::Char('p') => InputEvent::PlayPause,
        KeyCode::Char('n') | KeyCode::Char('l') | KeyCode::Right => InputEvent::Next,
        KeyCode::Char('b') | KeyCode::Char('h') | KeyCode::Left => InputEvent::Previous,
        KeyCode::Char('q') | KeyCode::Esc => InputEvent::Quit,
        KeyCode::Char('i') | KeyCode::Tab => InputEvent::ToggleSecondaryInfo,
        _ => return None,
    };
    Some(event)
}

/// Events fed from another thread. A dropped sender reads as `Quit`.
#[derive(Debug)]
pub struct ChannelInput {
    events: Receiver<InputEvent>,
}

impl ChannelInput {
    pub fn new(events: Receiver<InputEvent>) -> Self {
        Self { events }
    }
}

impl InputSource for ChannelInput {
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Ok(Some(InputEvent::Quit)),
        }
    }
}
