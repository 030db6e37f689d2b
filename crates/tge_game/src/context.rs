use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use tge_core::clock::FrameClock;
use tge_core::input::InputState;

use crate::audio::{AudioEngine, SoundHandle};
use crate::config::ResourcePaths;
use crate::graphics::Graphics;

/// Engine state reachable from native bindings.
pub struct EngineContext {
    pub graphics: Graphics,
    pub audio: Option<Box<dyn AudioEngine>>,
    pub input: InputState,
    pub clock: FrameClock,
    pub paths: ResourcePaths,
    pub exit_requested: bool,
    pub fullscreen: bool,
    /// Fullscreen state the window should switch to before the next frame.
    pub fullscreen_request: Option<bool>,
}

pub type SharedContext = Rc<RefCell<EngineContext>>;

impl EngineContext {
    pub fn new(graphics: Graphics, paths: ResourcePaths, fullscreen: bool) -> Self {
        Self {
            graphics,
            audio: None,
            input: InputState::new(),
            clock: FrameClock::new(),
            paths,
            exit_requested: false,
            fullscreen,
            fullscreen_request: None,
        }
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn request_fullscreen(&mut self, enabled: bool) {
        self.fullscreen_request = Some(enabled);
    }

    fn sound_path(&self, file: &str) -> std::path::PathBuf {
        self.paths.sound_dir().join(Path::new(file))
    }

    pub fn play_sound(&mut self, file: &str) {
        let path = self.sound_path(file);
        if let Some(audio) = self.audio.as_mut() {
            audio.play(&path);
        }
    }

    pub fn load_sound(&mut self, file: &str) -> Option<SoundHandle> {
        let path = self.sound_path(file);
        self.audio.as_mut().map(|audio| audio.load(&path))
    }

    pub fn start_sound(&mut self, sound: SoundHandle, looping: bool) {
        if let Some(audio) = self.audio.as_mut() {
            audio.start(sound, looping);
        }
    }

    pub fn stop_sound(&mut self, sound: SoundHandle) {
        if let Some(audio) = self.audio.as_mut() {
            audio.stop(sound);
        }
    }
}
