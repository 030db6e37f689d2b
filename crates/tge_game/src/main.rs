//! TGE -- a scriptable 2D sprite engine.
//!
//! winit drives the event loop via `ApplicationHandler`. Window events write
//! into a [`RawInput`]; every `RedrawRequested` runs one engine frame (input
//! snapshot, hotkeys, `on_frame`, present) through [`Game::frame`].
//!
//! Scripts live under `resource/script/`; `main.lua` may define `on_init`,
//! `on_frame` and `on_exit`. F1 tears everything down and reloads it, F4
//! toggles fullscreen.

mod audio;
mod bridge;
mod config;
mod context;
mod game;
mod graphics;
mod resources;
mod script_host;
mod script_value;

use std::path::Path;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use audio::{AudioEngine, RodioAudio};
use config::{load_config, EngineConfig, OPTIONS_PATH};
use game::{AudioFactory, Game};
use tge_core::input::RawInput;
use tge_platform::{create_window, fatal_error, key_code, mouse_button_index, PlatformConfig};
use tge_render::WgpuBackend;

struct EngineState {
    window: Arc<Window>,
    game: Game,
    raw_input: RawInput,
}

struct App {
    config: EngineConfig,
    state: Option<EngineState>,
}

impl App {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    fn platform_config(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.config.title.clone(),
            width: self.config.display_width,
            height: self.config.display_height,
            fullscreen: self.config.fullscreen,
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.game.shutdown();
        }
        event_loop.exit();
    }
}

fn rodio_factory() -> AudioFactory {
    Box::new(|| RodioAudio::new().map(|audio| Box::new(audio) as Box<dyn AudioEngine>))
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = create_window(event_loop, &self.platform_config())
            .unwrap_or_else(|e| fatal_error(&e));
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let backend = WgpuBackend::new(window.clone(), self.config.vsync).unwrap_or_else(|e| fatal_error(&e));
        let mut game = Game::new(&self.config, Box::new(backend), rodio_factory());
        let size = window.inner_size();
        if size.width > 0 && size.height > 0 {
            game.resize(size.width, size.height);
        }
        if let Err(e) = game.start() {
            fatal_error(&e);
        }
        game.set_fullscreen_state(tge_platform::is_fullscreen(&window));

        self.state = Some(EngineState {
            window,
            game,
            raw_input: RawInput::new(),
        });
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(physical_size) => {
                let (w, h) = (physical_size.width, physical_size.height);
                if w > 0 && h > 0 {
                    state.game.resize(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = key_code(code) {
                        let pressed = event.state == ElementState::Pressed;
                        state.raw_input.set_key(key, pressed);
                    }
                }
            }

            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                if let Some(index) = mouse_button_index(button) {
                    let pressed = button_state == ElementState::Pressed;
                    state.raw_input.set_mouse_button(index, pressed);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.raw_input.mouse_position =
                    glam::Vec2::new(position.x as f32, position.y as f32);
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = state.game.frame(&state.raw_input) {
                    fatal_error(&e);
                }
                if let Some(enabled) = state.game.take_fullscreen_request() {
                    tge_platform::set_fullscreen(&state.window, enabled);
                    state.game.set_fullscreen_state(enabled);
                }
                if state.game.exit_requested() {
                    self.shutdown(event_loop);
                }
            }

            _ => {}
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("TGE starting...");

    let config = load_config(Path::new(OPTIONS_PATH));
    let event_loop = EventLoop::new()
        .unwrap_or_else(|e| fatal_error(&format!("Failed to create event loop: {e}")));
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        fatal_error(&format!("Event loop error: {e}"));
    }
}
