use std::sync::Arc;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Fullscreen, Window, WindowAttributes};

pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "TGE".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
        }
    }
}

pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> Result<Arc<Window>, String> {
    let attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_resizable(false)
        .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
        .with_fullscreen(fullscreen_mode(config.fullscreen));

    let window = event_loop
        .create_window(attrs)
        .map_err(|e| format!("Failed to create window: {e}"))?;
    Ok(Arc::new(window))
}

/// Borderless fullscreen on the current monitor, or windowed.
pub fn fullscreen_mode(enabled: bool) -> Option<Fullscreen> {
    if enabled {
        Some(Fullscreen::Borderless(None))
    } else {
        None
    }
}

pub fn set_fullscreen(window: &Window, enabled: bool) {
    log::info!("Fullscreen: {}", if enabled { "ON" } else { "OFF" });
    window.set_fullscreen(fullscreen_mode(enabled));
}

pub fn is_fullscreen(window: &Window) -> bool {
    window.fullscreen().is_some()
}

/// Report an unrecoverable native failure and terminate the process.
///
/// Used only for failures that leave nothing to run on: no event loop, no
/// window, no GPU device, no audio output.
pub fn fatal_error(message: &str) -> ! {
    log::error!("Fatal error: {}", message);
    eprintln!("\n=== Fatal Error ===\n{}\n", message);
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_windowed_720p() {
        let config = PlatformConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(!config.fullscreen);
        assert_eq!(config.title, "TGE");
    }

    #[test]
    fn fullscreen_mode_maps_flag() {
        assert!(fullscreen_mode(false).is_none());
        assert!(matches!(
            fullscreen_mode(true),
            Some(Fullscreen::Borderless(None))
        ));
    }
}
