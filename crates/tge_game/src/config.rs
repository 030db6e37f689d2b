//! Engine options loaded from `resource/options.json`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tge_core::input::KEY_COUNT;
use tge_core::keys::{KEY_F1, KEY_F4};
use tge_render::BatchCapacity;

pub const OPTIONS_PATH: &str = "resource/options.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub display_width: u32,
    pub display_height: u32,
    pub fullscreen: bool,
    /// Present on vertical blank; otherwise use the lowest-latency mode offered.
    pub vsync: bool,
    pub resource_root: PathBuf,
    pub entry_script: String,
    pub default_sprite: String,
    pub default_font: String,
    pub default_shader: String,
    pub reload_key: u32,
    pub fullscreen_key: u32,
    /// Quads per batch before an automatic flush. `None` grows without limit.
    pub batch_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "TGE".to_string(),
            display_width: 1280,
            display_height: 720,
            fullscreen: false,
            vsync: true,
            resource_root: PathBuf::from("resource"),
            entry_script: "main.lua".to_string(),
            default_sprite: "default".to_string(),
            default_font: "Verdana-20".to_string(),
            default_shader: "sprite_fs".to_string(),
            reload_key: KEY_F1,
            fullscreen_key: KEY_F4,
            batch_capacity: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.display_width == 0 || self.display_height == 0 {
            return Err(format!(
                "display size must be positive, got {}x{}",
                self.display_width, self.display_height
            ));
        }
        if self.batch_capacity == Some(0) {
            return Err("batch_capacity must be positive or null".to_string());
        }
        for (label, key) in [
            ("reload_key", self.reload_key),
            ("fullscreen_key", self.fullscreen_key),
        ] {
            if key as usize >= KEY_COUNT {
                return Err(format!("{label} {key} is outside the key table"));
            }
        }
        if self.entry_script.trim().is_empty() {
            return Err("entry_script must not be empty".to_string());
        }
        Ok(())
    }

    pub fn batch_capacity(&self) -> BatchCapacity {
        match self.batch_capacity {
            Some(quads) => BatchCapacity::Fixed(quads),
            None => BatchCapacity::Dynamic,
        }
    }

    pub fn paths(&self) -> ResourcePaths {
        ResourcePaths::new(&self.resource_root)
    }
}

pub fn parse_config(json: &str) -> Result<EngineConfig, String> {
    let config: EngineConfig =
        serde_json::from_str(json).map_err(|e| format!("Failed to parse options: {e}"))?;
    config.validate()?;
    Ok(config)
}

/// Load options, falling back to defaults. Configuration problems are never fatal.
pub fn load_config(path: &Path) -> EngineConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!(
                "No options file at {} ({e}), using defaults",
                path.display()
            );
            return EngineConfig::default();
        }
    };
    match parse_config(&text) {
        Ok(config) => {
            log::info!("Loaded options from {}", path.display());
            config
        }
        Err(e) => {
            log::error!("Invalid options file {}: {e}. Using defaults.", path.display());
            EngineConfig::default()
        }
    }
}

/// Resource directories under the configured root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    pub root: PathBuf,
}

impl ResourcePaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn texture_dir(&self) -> PathBuf {
        self.root.join("texture")
    }

    pub fn font_dir(&self) -> PathBuf {
        self.root.join("font")
    }

    pub fn shader_dir(&self) -> PathBuf {
        self.root.join("shader")
    }

    pub fn script_dir(&self) -> PathBuf {
        self.root.join("script")
    }

    pub fn sound_dir(&self) -> PathBuf {
        self.root.join("sound")
    }
}
