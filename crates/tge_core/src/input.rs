//! Double-buffered input snapshot.
//!
//! Window callbacks write into a [`RawInput`] as events arrive. Once per frame,
//! before any script hook runs, [`InputState::update`] copies the previous
//! `new` snapshot into `old` and takes the raw state as the new `new`. All
//! queries are pure functions of those two snapshots:
//!
//! - `down    = new`
//! - `pressed = new && !old`
//! - `released = old && !new`
//!
//! There is no event queue, so a press and release that both land between two
//! updates are never observed.

use glam::Vec2;

/// Number of key slots. Codes follow GLFW numbering; the highest is Menu (348).
pub const KEY_COUNT: usize = 349;
pub const MOUSE_BUTTON_COUNT: usize = 8;

/// Live device state written by the platform event handlers.
#[derive(Debug, Clone)]
pub struct RawInput {
    keys: [bool; KEY_COUNT],
    mouse: [bool; MOUSE_BUTTON_COUNT],
    pub mouse_position: Vec2,
}

impl RawInput {
    pub fn new() -> Self {
        Self {
            keys: [false; KEY_COUNT],
            mouse: [false; MOUSE_BUTTON_COUNT],
            mouse_position: Vec2::ZERO,
        }
    }

    pub fn set_key(&mut self, code: u32, pressed: bool) {
        if let Some(slot) = self.keys.get_mut(code as usize) {
            *slot = pressed;
        }
    }

    pub fn set_mouse_button(&mut self, button: u32, pressed: bool) {
        if let Some(slot) = self.mouse.get_mut(button as usize) {
            *slot = pressed;
        }
    }
}

impl Default for RawInput {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InputState {
    keys_old: [bool; KEY_COUNT],
    keys_new: [bool; KEY_COUNT],
    mouse_old: [bool; MOUSE_BUTTON_COUNT],
    mouse_new: [bool; MOUSE_BUTTON_COUNT],
    mouse_position: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_old: [false; KEY_COUNT],
            keys_new: [false; KEY_COUNT],
            mouse_old: [false; MOUSE_BUTTON_COUNT],
            mouse_new: [false; MOUSE_BUTTON_COUNT],
            mouse_position: Vec2::ZERO,
        }
    }

    /// Advance one frame boundary.
    pub fn update(&mut self, raw: &RawInput) {
        self.keys_old = self.keys_new;
        self.mouse_old = self.mouse_new;
        self.keys_new = raw.keys;
        self.mouse_new = raw.mouse;
        self.mouse_position = raw.mouse_position;
    }

    pub fn key_down(&self, code: u32) -> bool {
        slot(&self.keys_new, code)
    }

    pub fn key_pressed(&self, code: u32) -> bool {
        slot(&self.keys_new, code) && !slot(&self.keys_old, code)
    }

    pub fn key_released(&self, code: u32) -> bool {
        slot(&self.keys_old, code) && !slot(&self.keys_new, code)
    }

    pub fn mouse_down(&self, button: u32) -> bool {
        slot(&self.mouse_new, button)
    }

    pub fn mouse_pressed(&self, button: u32) -> bool {
        slot(&self.mouse_new, button) && !slot(&self.mouse_old, button)
    }

    pub fn mouse_released(&self, button: u32) -> bool {
        slot(&self.mouse_old, button) && !slot(&self.mouse_new, button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

// Out-of-range codes read as "not down".
fn slot(states: &[bool], code: u32) -> bool {
    states.get(code as usize).copied().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: u32 = 65;
    const KEY_SPACE: u32 = 32;
    const KEY_MENU: u32 = 348;

    fn step(input: &mut InputState, raw: &RawInput) {
        input.update(raw);
    }

    #[test]
    fn test_press_sets_down_and_pressed() {
        let mut input = InputState::new();
        let mut raw = RawInput::new();
        raw.set_key(KEY_A, true);
        step(&mut input, &raw);
        assert!(input.key_down(KEY_A));
        assert!(input.key_pressed(KEY_A));
        assert!(!input.key_released(KEY_A));
    }

    #[test]
    fn test_pressed_lasts_one_frame() {
        let mut input = InputState::new();
        let mut raw = RawInput::new();
        raw.set_key(KEY_A, true);
        step(&mut input, &raw);
        step(&mut input, &raw);
        assert!(input.key_down(KEY_A));
        assert!(!input.key_pressed(KEY_A));
    }

    #[test]
    fn test_release_sets_released_once() {
        let mut input = InputState::new();
        let mut raw = RawInput::new();
        raw.set_key(KEY_SPACE, true);
        step(&mut input, &raw);
        raw.set_key(KEY_SPACE, false);
        step(&mut input, &raw);
        assert!(!input.key_down(KEY_SPACE));
        assert!(input.key_released(KEY_SPACE));
        step(&mut input, &raw);
        assert!(!input.key_released(KEY_SPACE));
    }

    #[test]
    fn test_press_and_release_between_updates_is_collapsed() {
        let mut input = InputState::new();
        let mut raw = RawInput::new();
        raw.set_key(KEY_A, true);
        raw.set_key(KEY_A, false);
        step(&mut input, &raw);
        assert!(!input.key_pressed(KEY_A));
        assert!(!input.key_released(KEY_A));
    }

    #[test]
    fn test_update_without_events_clears_all_edges() {
        let mut input = InputState::new();
        let mut raw = RawInput::new();
        for code in [KEY_A, KEY_SPACE, KEY_MENU] {
            raw.set_key(code, true);
        }
        raw.set_mouse_button(0, true);
        step(&mut input, &raw);
        step(&mut input, &raw);
        for code in 0..KEY_COUNT as u32 {
            assert!(!input.key_pressed(code), "key {code} should not be pressed");
            assert!(!input.key_released(code), "key {code} should not be released");
        }
        for button in 0..MOUSE_BUTTON_COUNT as u32 {
            assert!(!input.mouse_pressed(button));
            assert!(!input.mouse_released(button));
        }
    }

    #[test]
    fn test_edge_queries_match_snapshots() {
        let mut input = InputState::new();
        let mut raw = RawInput::new();
        let pattern = [
            [true, false, true],
            [true, true, false],
            [false, true, false],
            [false, false, true],
        ];
        let codes = [KEY_A, KEY_SPACE, KEY_MENU];
        let mut previous = [false; 3];
        for frame in pattern {
            for (i, &code) in codes.iter().enumerate() {
                raw.set_key(code, frame[i]);
            }
            step(&mut input, &raw);
            for (i, &code) in codes.iter().enumerate() {
                assert_eq!(input.key_down(code), frame[i]);
                assert_eq!(input.key_pressed(code), frame[i] && !previous[i]);
                assert_eq!(input.key_released(code), previous[i] && !frame[i]);
            }
            previous = frame;
        }
    }

    #[test]
    fn test_mouse_buttons_and_position() {
        let mut input = InputState::new();
        let mut raw = RawInput::new();
        raw.set_mouse_button(1, true);
        raw.mouse_position = Vec2::new(100.0, 200.0);
        step(&mut input, &raw);
        assert!(input.mouse_down(1));
        assert!(input.mouse_pressed(1));
        assert_eq!(input.mouse_position(), Vec2::new(100.0, 200.0));

        raw.set_mouse_button(1, false);
        step(&mut input, &raw);
        assert!(input.mouse_released(1));
        assert!(!input.mouse_down(1));
    }

    #[test]
    fn test_out_of_range_codes_are_ignored() {
        let mut input = InputState::new();
        let mut raw = RawInput::new();
        raw.set_key(10_000, true);
        raw.set_mouse_button(42, true);
        step(&mut input, &raw);
        assert!(!input.key_down(10_000));
        assert!(!input.key_pressed(10_000));
        assert!(!input.mouse_down(42));
    }

    #[test]
    fn test_default_state_is_empty() {
        let input = InputState::default();
        assert!(!input.key_down(KEY_A));
        assert!(!input.mouse_down(0));
        assert_eq!(input.mouse_position(), Vec2::ZERO);
    }
}
