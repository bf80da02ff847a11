/// Gamepad input via gilrs, reduced to menu-style actions.
///
/// Mapping (confirm/cancel configurable under `[gamepad]`):
///   D-pad / Left Stick    →  Up / Down / Left / Right (edge-triggered)
///   A / Start             →  Confirm
///   B / Select            →  Cancel / back to menu
///
/// Without the `gamepad` feature every query returns false.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,
    B,
    X,
    Y,
    Start,
    Select,
}

const BTN_COUNT: usize = 6;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

const DIRS: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

struct ActionMap {
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            confirm: vec![Btn::A, Btn::Start],
            cancel: vec![Btn::B, Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Buttons pressed since the last update(), indexed by `Btn as usize`.
    pressed: [bool; BTN_COUNT],
    /// D-pad held per direction, and pressed since the last update().
    dpad_held: [bool; 4],
    dir_pressed: [bool; 4],
    stick: (f32, f32),
    stick_held: [bool; 4],

    action_map: ActionMap,
}

fn dir_index(d: Dir) -> usize {
    d as usize
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                if g.gamepads().next().is_some() {
                    log::info!("gamepad detected");
                }
                Some(g)
            }
            Err(e) => {
                log::warn!("gamepad support unavailable: {e}");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            pressed: [false; BTN_COUNT],
            dpad_held: [false; 4],
            dir_pressed: [false; 4],
            stick: (0.0, 0.0),
            stick_held: [false; 4],
            action_map: ActionMap::default(),
        }
    }

    /// Apply `[gamepad]` config. Empty or unknown lists keep the defaults.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let confirm = parse_list(&cfg.confirm);
        if !confirm.is_empty() {
            self.action_map.confirm = confirm;
        }
        let cancel = parse_list(&cfg.cancel);
        if !cancel.is_empty() {
            self.action_map.cancel = cancel;
        }
    }

    pub fn update(&mut self) {
        self.pressed = [false; BTN_COUNT];
        self.dir_pressed = [false; 4];

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };
        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(Axis::LeftStickX, v, _) => self.stick.0 = v,
                EventType::AxisChanged(Axis::LeftStickY, v, _) => self.stick.1 = v,
                EventType::Connected => log::info!("gamepad connected"),
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.dpad_held = [false; 4];
                    self.stick = (0.0, 0.0);
                }
                _ => {}
            }
        }

        // Stick crossing the deadzone counts as one press.
        let (x, y) = self.stick;
        let now = [y > STICK_DEADZONE, y < -STICK_DEADZONE, x < -STICK_DEADZONE, x > STICK_DEADZONE];
        for i in 0..4 {
            if now[i] && !self.stick_held[i] {
                self.dir_pressed[i] = true;
            }
        }
        self.stick_held = now;
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, btn: Button, down: bool) {
        let dir = match btn {
            Button::DPadUp => Some(Dir::Up),
            Button::DPadDown => Some(Dir::Down),
            Button::DPadLeft => Some(Dir::Left),
            Button::DPadRight => Some(Dir::Right),
            _ => None,
        };
        if let Some(d) = dir {
            let i = dir_index(d);
            if down && !self.dpad_held[i] {
                self.dir_pressed[i] = true;
            }
            self.dpad_held[i] = down;
            return;
        }
        if let (true, Some(b)) = (down, Btn::from_gilrs(btn)) {
            self.pressed[b as usize] = true;
        }
    }

    // ── Action queries ──

    fn any_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.pressed[b as usize])
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_pressed(&self.action_map.confirm)
    }

    pub fn cancel_pressed(&self) -> bool {
        self.any_pressed(&self.action_map.cancel)
    }

    pub fn dir_pressed(&self, d: Dir) -> bool {
        self.dir_pressed[dir_index(d)]
    }

    /// First direction pressed this frame, in Up/Down/Left/Right order.
    pub fn any_dir(&self) -> Option<Dir> {
        DIRS.into_iter().find(|&d| self.dir_pressed(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("South"), Some(Btn::A));
        assert_eq!(Btn::from_name("back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("Z"), None);
    }

    #[test]
    fn unknown_names_keep_defaults() {
        let mut gp = GamepadState::new();
        gp.load_button_config(&GamepadConfig {
            confirm: vec!["nope".into()],
            cancel: vec!["Y".into()],
        });
        assert_eq!(gp.action_map.confirm, vec![Btn::A, Btn::Start]);
        assert_eq!(gp.action_map.cancel, vec![Btn::Y]);
    }

    #[test]
    fn nothing_pressed_after_update() {
        let mut gp = GamepadState::new();
        gp.pressed[Btn::A as usize] = true;
        gp.dir_pressed[dir_index(Dir::Left)] = true;
        assert!(gp.confirm_pressed());
        assert_eq!(gp.any_dir(), Some(Dir::Left));
        gp.update();
        assert!(!gp.confirm_pressed());
        assert_eq!(gp.any_dir(), None);
    }
}
