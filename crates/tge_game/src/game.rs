//! Frame lifecycle.
//!
//! `Game` owns the shared engine context and the optional script host and
//! drives one frame at a time:
//!
//!   1. `input.update(raw)` -- old = new, new = raw
//!   2. debug hotkeys: fullscreen toggle, full reload
//!   3. clock tick, `begin_frame` (clear, default shader and sprite)
//!   4. publish `Game`/`Mouse` values, then the guarded `on_frame` hook
//!   5. `end_frame` (flush, present)
//!
//! A failing hook discards the script host for good; the loop keeps running
//! without scripting until the reload key builds a new host.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use tge_core::input::RawInput;
use tge_render::GpuBackend;

use crate::audio::AudioEngine;
use crate::config::EngineConfig;
use crate::context::{EngineContext, SharedContext};
use crate::graphics::Graphics;
use crate::script_host::ScriptHost;

pub type AudioFactory = Box<dyn Fn() -> Result<Box<dyn AudioEngine>, String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Running,
    Exiting,
    TornDown,
}

impl LifecycleState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Exiting => "exiting",
            Self::TornDown => "torn down",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub struct Game {
    ctx: SharedContext,
    script: Option<ScriptHost>,
    state: LifecycleState,
    audio_factory: AudioFactory,
    script_dir: PathBuf,
    entry_script: String,
    reload_key: u32,
    fullscreen_key: u32,
}

impl Game {
    pub fn new(
        config: &EngineConfig,
        gpu: Box<dyn GpuBackend>,
        audio_factory: AudioFactory,
    ) -> Self {
        let paths = config.paths();
        let graphics = Graphics::new(gpu, config);
        let ctx = EngineContext::new(graphics, paths.clone(), config.fullscreen);
        Self {
            ctx: Rc::new(RefCell::new(ctx)),
            script: None,
            state: LifecycleState::Uninitialized,
            audio_factory,
            script_dir: paths.script_dir(),
            entry_script: config.entry_script.clone(),
            reload_key: config.reload_key,
            fullscreen_key: config.fullscreen_key,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    pub fn exit_requested(&self) -> bool {
        self.ctx.borrow().exit_requested
    }

    /// Bring up graphics, audio, input and the script host, then run `on_init`.
    pub fn start(&mut self) -> Result<(), String> {
        if self.state != LifecycleState::Uninitialized {
            return Ok(());
        }
        self.init_systems()?;
        self.state = LifecycleState::Running;
        Ok(())
    }

    pub fn frame(&mut self, raw: &RawInput) -> Result<(), String> {
        if self.state != LifecycleState::Running {
            return Ok(());
        }
        // `exit()` from `on_init` ends the loop before any frame runs.
        if self.check_exit() {
            return Ok(());
        }

        let (toggle_fullscreen, reload) = {
            let mut ctx = self.ctx.borrow_mut();
            ctx.input.update(raw);
            (
                ctx.input.key_pressed(self.fullscreen_key),
                ctx.input.key_pressed(self.reload_key),
            )
        };
        if toggle_fullscreen {
            let mut ctx = self.ctx.borrow_mut();
            let enabled = !ctx.fullscreen;
            ctx.request_fullscreen(enabled);
        }
        if reload {
            self.reload()?;
            if self.check_exit() {
                return Ok(());
            }
        }

        {
            let mut ctx = self.ctx.borrow_mut();
            ctx.clock.tick();
            ctx.graphics.begin_frame();
        }
        self.publish();
        self.run_hook("on_frame");
        self.ctx.borrow_mut().graphics.end_frame();
        self.check_exit();
        Ok(())
    }

    fn check_exit(&mut self) -> bool {
        if self.exit_requested() {
            log::info!("Exit requested");
            self.state = LifecycleState::Exiting;
            return true;
        }
        false
    }

    /// Run `on_exit` and release everything in reverse order of acquisition.
    pub fn shutdown(&mut self) {
        if self.state == LifecycleState::TornDown {
            return;
        }
        self.state = LifecycleState::Exiting;
        self.run_hook("on_exit");
        self.teardown_systems();
        self.state = LifecycleState::TornDown;
        log::info!("Engine {}", self.state);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.borrow_mut().graphics.resize(width, height);
        self.publish();
    }

    /// Fullscreen state requested by the script or hotkey since the last call.
    pub fn take_fullscreen_request(&mut self) -> Option<bool> {
        self.ctx.borrow_mut().fullscreen_request.take()
    }

    pub fn set_fullscreen_state(&mut self, enabled: bool) {
        self.ctx.borrow_mut().fullscreen = enabled;
    }

    fn reload(&mut self) -> Result<(), String> {
        log::info!("Reloading script, audio and graphics");
        self.teardown_systems();
        self.init_systems()
    }

    fn init_systems(&mut self) -> Result<(), String> {
        self.init_graphics();
        self.init_audio()?;
        self.init_input();
        self.init_script();
        Ok(())
    }

    fn teardown_systems(&mut self) {
        self.cleanup_script();
        self.cleanup_audio();
        self.cleanup_graphics();
        self.cleanup_input();
    }

    fn init_graphics(&mut self) {
        self.ctx.borrow_mut().graphics.init();
    }

    fn init_audio(&mut self) -> Result<(), String> {
        let audio = (self.audio_factory)()?;
        self.ctx.borrow_mut().audio = Some(audio);
        Ok(())
    }

    fn init_input(&mut self) {}

    fn init_script(&mut self) {
        match ScriptHost::new(&self.ctx, &self.script_dir, &self.entry_script) {
            Ok(host) => {
                log::info!("Script loaded: {}", host.entry_path().display());
                self.script = Some(host);
                self.publish();
                self.run_hook("on_init");
            }
            Err(e) => {
                log::error!("Script error: {e}");
                self.script = None;
            }
        }
    }

    fn cleanup_script(&mut self) {
        if self.script.take().is_some() {
            log::info!("Script host dropped");
        }
    }

    fn cleanup_audio(&mut self) {
        self.ctx.borrow_mut().audio = None;
    }

    fn cleanup_graphics(&mut self) {
        self.ctx.borrow_mut().graphics.cleanup();
    }

    // Input state survives a reload so a held reload key does not retrigger.
    fn cleanup_input(&mut self) {}

    fn publish(&mut self) {
        let Some(host) = &self.script else {
            return;
        };
        if let Err(e) = host.publish(&self.ctx) {
            log::error!("Script error while publishing frame state: {e}");
            self.script = None;
        }
    }

    /// Call a hook. A failure is logged and the script host is discarded.
    fn run_hook(&mut self, name: &str) {
        let Some(host) = &self.script else {
            return;
        };
        if let Err(e) = host.call_hook(name) {
            log::error!("Script error in {name}: {e}");
            log::warn!("Scripting disabled until reload");
            self.script = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioCall, SilentAudio};
    use std::cell::Cell;
    use tge_core::keys::{KEY_F1, KEY_F4};
    use tge_render::{CommandLog, GpuCommand, HeadlessBackend};

    type AudioLog = Rc<RefCell<Vec<AudioCall>>>;

    struct Harness {
        game: Game,
        gpu_log: CommandLog,
        audio_log: AudioLog,
        /// GPU log length when the last audio engine was dropped.
        audio_dropped_at: Rc<Cell<Option<usize>>>,
        root: PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    fn temp_root(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "tge_game_{}_{}_{}",
            name,
            std::process::id(),
            nanos
        ))
    }

    fn harness(name: &str, script: &str) -> Harness {
        let root = temp_root(name);
        std::fs::create_dir_all(root.join("script")).unwrap();
        std::fs::write(root.join("script/main.lua"), script).unwrap();
        std::fs::create_dir_all(root.join("texture")).unwrap();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 255, 255, 255]))
            .save(root.join("texture/default.png"))
            .unwrap();

        let config = EngineConfig {
            resource_root: root.clone(),
            ..EngineConfig::default()
        };
        let gpu = HeadlessBackend::new();
        let gpu_log = gpu.log();
        let audio_log: AudioLog = Rc::new(RefCell::new(Vec::new()));
        let audio_dropped_at = Rc::new(Cell::new(None));
        let calls = audio_log.clone();
        let drop_gpu_log = gpu_log.clone();
        let drop_slot = audio_dropped_at.clone();
        let factory: AudioFactory = Box::new(move || {
            let mut audio = SilentAudio::new();
            audio.calls = calls.clone();
            let gpu_log = drop_gpu_log.clone();
            let slot = drop_slot.clone();
            audio.on_drop = Some(Box::new(move || slot.set(Some(gpu_log.borrow().len()))));
            Ok(Box::new(audio) as Box<dyn AudioEngine>)
        });
        let mut game = Game::new(&config, Box::new(gpu), factory);
        game.start().unwrap();
        Harness {
            game,
            gpu_log,
            audio_log,
            audio_dropped_at,
            root,
        }
    }

    /// Draw commands issued in each completed frame.
    fn draws_per_frame(log: &[GpuCommand]) -> Vec<usize> {
        let mut frames = Vec::new();
        let mut current = 0;
        for command in log {
            match command {
                GpuCommand::BeginFrame(_) => current = 0,
                GpuCommand::Draw { .. } => current += 1,
                GpuCommand::EndFrame => frames.push(current),
                _ => {}
            }
        }
        frames
    }

    fn played(audio_log: &AudioLog) -> Vec<String> {
        audio_log
            .borrow()
            .iter()
            .filter_map(|call| match call {
                AudioCall::Play(path) => path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    }

    fn pressed(code: u32) -> RawInput {
        let mut raw = RawInput::new();
        raw.set_key(code, true);
        raw
    }

    #[test]
    fn failing_on_frame_disables_scripting_but_keeps_running() {
        let mut h = harness(
            "contain",
            r#"
            calls = 0
            function on_frame()
                calls = calls + 1
                if calls == 3 then error("boom") end
                draw_sprite(0, 0)
            end
            function on_exit() play_sound("bye.wav") end
            "#,
        );
        let raw = RawInput::new();
        for frame in 1..=5 {
            h.game.frame(&raw).unwrap();
            assert_eq!(h.game.has_script(), frame < 3, "frame {frame}");
        }
        assert_eq!(draws_per_frame(&h.gpu_log.borrow()), vec![1, 1, 0, 0, 0]);
        assert_eq!(h.game.state(), LifecycleState::Running);

        h.game.shutdown();
        assert_eq!(h.game.state(), LifecycleState::TornDown);
        assert!(played(&h.audio_log).is_empty());
    }

    #[test]
    fn broken_entry_script_runs_without_scripting() {
        let mut h = harness("broken", "this is not valid lua !@#$");
        assert!(!h.game.has_script());
        h.game.frame(&RawInput::new()).unwrap();
        assert_eq!(draws_per_frame(&h.gpu_log.borrow()), vec![0]);
    }

    #[test]
    fn missing_entry_script_is_not_fatal() {
        let root = temp_root("missing_entry");
        let config = EngineConfig {
            resource_root: root,
            ..EngineConfig::default()
        };
        let factory: AudioFactory =
            Box::new(|| Ok(Box::new(SilentAudio::new()) as Box<dyn AudioEngine>));
        let mut game = Game::new(&config, Box::new(HeadlessBackend::new()), factory);
        game.start().unwrap();
        assert!(!game.has_script());
        assert_eq!(game.state(), LifecycleState::Running);
    }

    #[test]
    fn hooks_run_in_lifecycle_order() {
        let mut h = harness(
            "order",
            r#"
            function on_init() play_sound("init.wav") end
            function on_frame() play_sound("frame.wav") end
            function on_exit() play_sound("exit.wav") end
            "#,
        );
        h.game.frame(&RawInput::new()).unwrap();
        h.game.shutdown();
        h.game.shutdown();
        assert_eq!(played(&h.audio_log), vec!["init.wav", "frame.wav", "exit.wav"]);
    }

    #[test]
    fn exit_from_script_moves_to_exiting() {
        let mut h = harness("exit", "function on_frame() exit() end");
        h.game.frame(&RawInput::new()).unwrap();
        assert!(h.game.exit_requested());
        assert_eq!(h.game.state(), LifecycleState::Exiting);

        // No more frames once exiting.
        h.game.frame(&RawInput::new()).unwrap();
        assert_eq!(draws_per_frame(&h.gpu_log.borrow()).len(), 1);
    }

    #[test]
    fn exit_from_on_init_skips_every_frame() {
        let mut h = harness(
            "exit_init",
            r#"
            function on_init() exit() end
            function on_frame() play_sound("frame.wav") end
            "#,
        );
        h.game.frame(&RawInput::new()).unwrap();
        assert_eq!(h.game.state(), LifecycleState::Exiting);
        assert!(played(&h.audio_log).is_empty());
        assert!(draws_per_frame(&h.gpu_log.borrow()).is_empty());
    }

    #[test]
    fn exit_from_on_init_after_reload_skips_the_frame() {
        let mut h = harness(
            "exit_reload",
            r#"function on_frame() play_sound("frame.wav") end"#,
        );
        h.game.frame(&RawInput::new()).unwrap();
        assert_eq!(played(&h.audio_log), vec!["frame.wav"]);

        std::fs::write(
            h.root.join("script/main.lua"),
            r#"
            function on_init() exit() end
            function on_frame() play_sound("frame.wav") end
            "#,
        )
        .unwrap();
        h.game.frame(&pressed(KEY_F1)).unwrap();
        assert_eq!(h.game.state(), LifecycleState::Exiting);
        assert_eq!(played(&h.audio_log), vec!["frame.wav"]);
    }

    #[test]
    fn reload_key_rebuilds_script_once_per_press() {
        let mut h = harness(
            "reload",
            r#"
            function on_init() play_sound("init.wav") end
            function on_frame() if frame_error then error("x") end end
            "#,
        );
        assert_eq!(played(&h.audio_log), vec!["init.wav"]);

        let held = pressed(KEY_F1);
        h.game.frame(&held).unwrap();
        h.game.frame(&held).unwrap();
        h.game.frame(&held).unwrap();
        assert_eq!(played(&h.audio_log), vec!["init.wav", "init.wav"]);

        h.game.frame(&RawInput::new()).unwrap();
        h.game.frame(&held).unwrap();
        assert_eq!(played(&h.audio_log).len(), 3);
        assert!(h.game.has_script());
    }

    #[test]
    fn reload_restores_a_discarded_script() {
        let mut h = harness(
            "revive",
            r#"
            function on_frame()
                if key_down(Keys.Space) then error("space is cursed") end
                draw_sprite(0, 0)
            end
            "#,
        );
        h.game.frame(&pressed(32)).unwrap();
        assert!(!h.game.has_script());
        h.game.frame(&RawInput::new()).unwrap();
        h.game.frame(&pressed(KEY_F1)).unwrap();
        assert!(h.game.has_script());
        assert_eq!(draws_per_frame(&h.gpu_log.borrow()), vec![0, 0, 1]);
    }

    #[test]
    fn fullscreen_key_requests_toggle() {
        let mut h = harness("fullscreen", "");
        h.game.frame(&pressed(KEY_F4)).unwrap();
        assert_eq!(h.game.take_fullscreen_request(), Some(true));
        assert_eq!(h.game.take_fullscreen_request(), None);

        h.game.set_fullscreen_state(true);
        h.game.frame(&RawInput::new()).unwrap();
        h.game.frame(&pressed(KEY_F4)).unwrap();
        assert_eq!(h.game.take_fullscreen_request(), Some(false));
    }

    #[test]
    fn frame_values_reach_the_script() {
        let mut h = harness(
            "publish",
            r#"
            function on_frame()
                seen_frame = Game.frame
                seen_mouse = Mouse.x
                seen_width = Game.display_width
                seen_fps = Game.fps
            end
            "#,
        );
        let mut raw = RawInput::new();
        raw.mouse_position = glam::Vec2::new(12.0, 34.0);
        h.game.frame(&raw).unwrap();
        h.game.frame(&raw).unwrap();
        h.game.resize(640, 480);

        let host = h.game.script.as_ref().unwrap();
        assert_eq!(host.global::<i64>("seen_frame").unwrap(), 2);
        assert_eq!(host.global::<f64>("seen_mouse").unwrap(), 12.0);
        assert_eq!(host.global::<f64>("seen_width").unwrap(), 1280.0);
        assert!(host.global::<f64>("seen_fps").unwrap() > 0.0);
        let game_table: mlua::Table = host.global("Game").unwrap();
        assert_eq!(game_table.get::<f64>("display_width").unwrap(), 640.0);
    }

    #[test]
    fn shipped_demo_runs_and_selects_the_font_for_text() {
        let config = EngineConfig {
            resource_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../resource"),
            ..EngineConfig::default()
        };
        let gpu = HeadlessBackend::new();
        let gpu_log = gpu.log();
        let factory: AudioFactory =
            Box::new(|| Ok(Box::new(SilentAudio::new()) as Box<dyn AudioEngine>));
        let mut game = Game::new(&config, Box::new(gpu), factory);
        game.start().unwrap();
        for _ in 0..3 {
            game.frame(&RawInput::new()).unwrap();
        }
        assert!(game.has_script());
        assert_eq!(game.state(), LifecycleState::Running);

        // No font ships, so the text pass binds the invalid font texture last.
        let last_bind = gpu_log.borrow().iter().rev().find_map(|command| match command {
            GpuCommand::BindTexture { slot: 0, texture } => Some(*texture),
            _ => None,
        });
        assert_eq!(last_bind, Some(tge_render::TextureId::INVALID));
    }

    #[test]
    fn teardown_releases_script_then_audio_then_graphics() {
        // The finalizer runs when the Lua state closes; audio must still be up.
        let mut h = harness(
            "teardown",
            r#"keep = setmetatable({}, { __gc = function() play_sound("collected.wav") end })"#,
        );
        h.game.shutdown();
        assert!(!h.game.has_script());
        assert!(h.game.ctx.borrow().audio.is_none());
        assert_eq!(played(&h.audio_log), vec!["collected.wav"]);

        let dropped_at = h.audio_dropped_at.get().unwrap();
        let gpu_log = h.gpu_log.borrow();
        let first_delete = gpu_log
            .iter()
            .position(|command| matches!(command, GpuCommand::DeleteTexture(_)))
            .unwrap();
        assert!(dropped_at <= first_delete);
    }
}
