/// Terminal input collected once per frame.
///
/// The quiz is turn based, so only edges matter: each Press/Repeat is one
/// action, Release events are dropped. Left mouse presses are kept with
/// their terminal cell for option picking and the Level 3 picture.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

pub struct InputState {
    /// Key presses collected during the most recent drain_events() call.
    pub keys: Vec<KeyEvent>,

    /// Left-button presses as (col, row).
    pub clicks: Vec<(u16, u16)>,

    /// Terminal was resized; the renderer must repaint everything.
    pub resized: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            keys: Vec::with_capacity(8),
            clicks: Vec::with_capacity(4),
            resized: false,
        }
    }

    /// Drain all pending terminal events without blocking.
    pub fn drain_events(&mut self) {
        self.keys.clear();
        self.clicks.clear();
        self.resized = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    self.keys.push(key);
                }
                Ok(Event::Mouse(m)) if m.kind == MouseEventKind::Down(MouseButton::Left) => {
                    self.clicks.push((m.column, m.row));
                }
                Ok(Event::Resize(_, _)) => self.resized = true,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("terminal event read failed: {e}");
                    break;
                }
            }
        }
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.keys.iter().any(|k| k.code == code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Letter keys, case-insensitive.
    pub fn letter_pressed(&self, c: char) -> bool {
        self.keys.iter().any(|k| matches!(k.code, KeyCode::Char(x) if x.eq_ignore_ascii_case(&c)))
    }

    /// First digit 1-9 pressed this frame, as a 0-based index.
    pub fn digit_pressed(&self) -> Option<usize> {
        self.keys.iter().find_map(|k| match k.code {
            KeyCode::Char(c @ '1'..='9') => Some(c as usize - '1' as usize),
            _ => None,
        })
    }

    /// Printable characters typed this frame, in order. Control chords are skipped.
    pub fn typed_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.keys.iter().filter_map(|k| match k.code {
            KeyCode::Char(c)
                if !k.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => Some(c),
            _ => None,
        })
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.keys.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}
