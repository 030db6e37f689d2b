//! Constant tables published to scripts as `Keys.*` and `Mouse.*`.

/// Key names and their codes (GLFW numbering).
pub const KEYS: &[(&str, u32)] = &[
    ("Space", 32),
    ("Apostrophe", 39),
    ("Comma", 44),
    ("Minus", 45),
    ("Period", 46),
    ("Slash", 47),
    ("D0", 48),
    ("D1", 49),
    ("D2", 50),
    ("D3", 51),
    ("D4", 52),
    ("D5", 53),
    ("D6", 54),
    ("D7", 55),
    ("D8", 56),
    ("D9", 57),
    ("Semicolon", 59),
    ("Equal", 61),
    ("A", 65),
    ("B", 66),
    ("C", 67),
    ("D", 68),
    ("E", 69),
    ("F", 70),
    ("G", 71),
    ("H", 72),
    ("I", 73),
    ("J", 74),
    ("K", 75),
    ("L", 76),
    ("M", 77),
    ("N", 78),
    ("O", 79),
    ("P", 80),
    ("Q", 81),
    ("R", 82),
    ("S", 83),
    ("T", 84),
    ("U", 85),
    ("V", 86),
    ("W", 87),
    ("X", 88),
    ("Y", 89),
    ("Z", 90),
    ("LeftBracket", 91),
    ("Backslash", 92),
    ("RightBracket", 93),
    ("GraveAccent", 96),
    ("World1", 161),
    ("World2", 162),
    ("Escape", 256),
    ("Enter", 257),
    ("Tab", 258),
    ("Backspace", 259),
    ("Insert", 260),
    ("Delete", 261),
    ("Right", 262),
    ("Left", 263),
    ("Down", 264),
    ("Up", 265),
    ("PageUp", 266),
    ("PageDown", 267),
    ("Home", 268),
    ("End", 269),
    ("CapsLock", 280),
    ("ScrollLock", 281),
    ("NumLock", 282),
    ("PrintScreen", 283),
    ("Pause", 284),
    ("F1", 290),
    ("F2", 291),
    ("F3", 292),
    ("F4", 293),
    ("F5", 294),
    ("F6", 295),
    ("F7", 296),
    ("F8", 297),
    ("F9", 298),
    ("F10", 299),
    ("F11", 300),
    ("F12", 301),
    ("F13", 302),
    ("F14", 303),
    ("F15", 304),
    ("F16", 305),
    ("F17", 306),
    ("F18", 307),
    ("F19", 308),
    ("F20", 309),
    ("F21", 310),
    ("F22", 311),
    ("F23", 312),
    ("F24", 313),
    ("F25", 314),
    ("Keypad0", 320),
    ("Keypad1", 321),
    ("Keypad2", 322),
    ("Keypad3", 323),
    ("Keypad4", 324),
    ("Keypad5", 325),
    ("Keypad6", 326),
    ("Keypad7", 327),
    ("Keypad8", 328),
    ("Keypad9", 329),
    ("KeypadDecimal", 330),
    ("KeypadDivide", 331),
    ("KeypadMultiply", 332),
    ("KeypadSubtract", 333),
    ("KeypadAdd", 334),
    ("KeypadEnter", 335),
    ("KeypadEqual", 336),
    ("LeftShift", 340),
    ("LeftControl", 341),
    ("LeftAlt", 342),
    ("LeftSuper", 343),
    ("RightShift", 344),
    ("RightControl", 345),
    ("RightAlt", 346),
    ("RightSuper", 347),
    ("Menu", 348),
];

pub const MOUSE_BUTTONS: &[(&str, u32)] = &[
    ("Button1", 0),
    ("Button2", 1),
    ("Button3", 2),
    ("Button4", 3),
    ("Button5", 4),
    ("Button6", 5),
    ("Button7", 6),
    ("Button8", 7),
    ("Left", 0),
    ("Right", 1),
    ("Middle", 2),
];

pub const KEY_F1: u32 = 290;
pub const KEY_F4: u32 = 293;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KEY_COUNT, MOUSE_BUTTON_COUNT};
    use std::collections::HashSet;

    #[test]
    fn key_names_are_unique() {
        let mut seen = HashSet::new();
        for (name, _) in KEYS {
            assert!(seen.insert(*name), "duplicate key name {name}");
        }
    }

    #[test]
    fn key_codes_fit_input_arrays() {
        for &(name, code) in KEYS {
            assert!((code as usize) < KEY_COUNT, "{name} = {code} out of range");
        }
        for &(name, button) in MOUSE_BUTTONS {
            assert!((button as usize) < MOUSE_BUTTON_COUNT, "{name} out of range");
        }
    }

    #[test]
    fn glfw_numbering() {
        let code = |name: &str| KEYS.iter().find(|(n, _)| *n == name).map(|&(_, c)| c);
        assert_eq!(code("Space"), Some(32));
        assert_eq!(code("A"), Some(65));
        assert_eq!(code("F1"), Some(KEY_F1));
        assert_eq!(code("F4"), Some(KEY_F4));
        assert_eq!(code("F25"), Some(314));
        assert_eq!(code("Menu"), Some(348));
    }
}
