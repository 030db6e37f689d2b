pub mod keymap;
pub mod window;

pub use keymap::{key_code, mouse_button_index};
pub use window::{create_window, fatal_error, is_fullscreen, set_fullscreen, PlatformConfig};
