//! Graphics state shared by the bridge and the frame lifecycle.
//!
//! Owns the GPU backend, the draw batcher and the resource registries, and
//! tracks the current sprite/font/shader selection. Every change of program or
//! texture binding flushes the batch first so a batch never spans two states.

use glam::Vec2;
use tge_render::{
    BatchCapacity, DrawBatcher, GpuBackend, SpriteQuad, TextureId, UniformValue, TEXTURE_SLOTS,
};

use crate::config::{EngineConfig, ResourcePaths};
use crate::resources::{Registries, SpriteFont};

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Pick `handle` if it names an entry, otherwise the default.
fn resolve(handle: Option<usize>, len: usize, default: usize) -> usize {
    match handle {
        Some(h) if h < len => h,
        _ => default,
    }
}

pub struct Graphics {
    gpu: Box<dyn GpuBackend>,
    batch: DrawBatcher,
    registries: Registries,
    paths: ResourcePaths,
    default_names: [String; 3],
    default_sprite: usize,
    default_font: usize,
    default_shader: usize,
    current_sprite: usize,
    current_font: usize,
    current_shader: usize,
    is_text: bool,
    display_size: Vec2,
}

impl Graphics {
    pub fn new(gpu: Box<dyn GpuBackend>, config: &EngineConfig) -> Self {
        Self::with_capacity(gpu, config, config.batch_capacity())
    }

    pub fn with_capacity(
        gpu: Box<dyn GpuBackend>,
        config: &EngineConfig,
        capacity: BatchCapacity,
    ) -> Self {
        Self {
            gpu,
            batch: DrawBatcher::new(capacity),
            registries: Registries::new(),
            paths: config.paths(),
            default_names: [
                config.default_font.clone(),
                config.default_sprite.clone(),
                config.default_shader.clone(),
            ],
            default_sprite: 0,
            default_font: 0,
            default_shader: 0,
            current_sprite: 0,
            current_font: 0,
            current_shader: 0,
            is_text: false,
            display_size: Vec2::new(
                config.display_width as f32,
                config.display_height as f32,
            ),
        }
    }

    /// Load the default font, sprite sheet and shader and select them.
    pub fn init(&mut self) {
        log::info!("Initializing graphics");
        let [font, sprite, shader] = self.default_names.clone();
        self.default_font = self.load_font(&font);
        self.set_font(Some(self.default_font));
        self.default_sprite = self.load_sprite(&sprite);
        self.set_sprite(Some(self.default_sprite));
        self.default_shader = self.load_shader(&shader);
        self.set_shader(Some(self.default_shader));
    }

    /// Drop queued geometry and release every loaded resource.
    pub fn cleanup(&mut self) {
        log::info!("Cleaning up graphics");
        self.batch.clear();
        self.registries.clear(self.gpu.as_mut());
        self.default_sprite = 0;
        self.default_font = 0;
        self.default_shader = 0;
        self.current_sprite = 0;
        self.current_font = 0;
        self.current_shader = 0;
    }

    pub fn display_size(&self) -> Vec2 {
        self.display_size
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.display_size = Vec2::new(width as f32, height as f32);
    }

    pub fn begin_frame(&mut self) {
        if let Some((width, height)) = self.gpu.surface_size() {
            if width > 0 && height > 0 {
                self.display_size = Vec2::new(width as f32, height as f32);
            }
        }
        self.gpu.begin_frame(CLEAR_COLOR);
        self.is_text = false;
        self.set_shader(Some(self.default_shader));
        self.set_sprite(Some(self.default_sprite));
    }

    pub fn end_frame(&mut self) {
        self.flush();
        self.gpu.end_frame();
    }

    pub fn flush(&mut self) -> bool {
        self.batch.flush(self.gpu.as_mut())
    }

    pub fn load_sprite(&mut self, name: &str) -> usize {
        self.registries
            .load_sprite(self.gpu.as_mut(), &self.paths, name)
    }

    pub fn load_font(&mut self, name: &str) -> usize {
        self.registries.load_font(self.gpu.as_mut(), &self.paths, name)
    }

    pub fn load_shader(&mut self, name: &str) -> usize {
        self.registries
            .load_shader(self.gpu.as_mut(), &self.paths, name)
    }

    fn sprite_texture(&self, sprite: usize) -> TextureId {
        self.registries
            .sprites
            .get(sprite)
            .map_or(TextureId::INVALID, |s| s.texture)
    }

    fn current_texture(&self) -> TextureId {
        if self.is_text {
            self.registries
                .fonts
                .get(self.current_font)
                .map_or(TextureId::INVALID, |f| f.texture)
        } else {
            self.sprite_texture(self.current_sprite)
        }
    }

    pub fn set_sprite(&mut self, sprite: Option<usize>) {
        self.flush();
        self.is_text = false;
        self.current_sprite = resolve(sprite, self.registries.sprites.len(), self.default_sprite);
        let texture = self.current_texture();
        self.gpu.bind_texture(0, texture);
    }

    pub fn set_font(&mut self, font: Option<usize>) {
        self.flush();
        self.is_text = true;
        self.current_font = resolve(font, self.registries.fonts.len(), self.default_font);
        let texture = self.current_texture();
        self.gpu.bind_texture(0, texture);
    }

    pub fn set_shader(&mut self, shader: Option<usize>) {
        self.flush();
        self.current_shader = resolve(shader, self.registries.shaders.len(), self.default_shader);
        if let Some(entry) = self.registries.shaders.get(self.current_shader) {
            self.gpu.use_program(entry.program);
        }
        let size = self.display_size;
        self.gpu
            .set_uniform("DisplaySize", UniformValue::Vec2([size.x, size.y]));
        let texture = self.current_texture();
        self.gpu.bind_texture(0, texture);
    }

    /// Bind a sprite sheet's texture to `Texture<slot>`. Unknown sheets bind
    /// the default sheet; slots past the last one are ignored.
    pub fn set_shader_texture(&mut self, slot: u32, sprite: Option<usize>) {
        if slot >= TEXTURE_SLOTS {
            return;
        }
        self.flush();
        let sprite = resolve(sprite, self.registries.sprites.len(), self.default_sprite);
        let texture = self.sprite_texture(sprite);
        self.gpu.bind_texture(slot, texture);
    }

    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.flush();
        self.gpu.set_uniform(name, value);
    }

    pub fn draw_sprite_part(&mut self, quad: SpriteQuad) {
        self.batch.push(self.gpu.as_mut(), &quad);
    }

    /// Draw the whole current sheet texture.
    pub fn draw_sprite(&mut self, pos: Vec2, origin: Vec2, angle: f32, scale: Vec2, color: u32) {
        let size = self
            .registries
            .sprites
            .get(self.current_sprite)
            .map_or(Vec2::ZERO, |s| Vec2::new(s.width as f32, s.height as f32));
        self.draw_sprite_part(SpriteQuad {
            position: pos,
            origin,
            angle,
            scale,
            tex_pos: Vec2::ZERO,
            tex_size: size,
            color,
        });
    }

    /// Draw a named region of the current sheet. Unknown names draw nothing.
    pub fn draw_sprite_sheet(
        &mut self,
        name: &str,
        pos: Vec2,
        origin: Vec2,
        angle: f32,
        scale: Vec2,
        color: u32,
    ) {
        let Some(rect) = self
            .registries
            .sprites
            .get(self.current_sprite)
            .and_then(|s| s.sprites.get(name))
            .copied()
        else {
            return;
        };
        self.draw_sprite_part(SpriteQuad {
            position: pos,
            origin,
            angle,
            scale,
            tex_pos: rect.pos,
            tex_size: rect.size,
            color,
        });
    }

    pub fn draw_text(&mut self, text: &str, pos: Vec2, color: u32) {
        let Some(font) = self.registries.fonts.get(self.current_font) else {
            return;
        };
        for quad in text_quads(font, text, pos, color) {
            self.batch.push(self.gpu.as_mut(), &quad);
        }
    }

    pub fn measure_text(&self, text: &str) -> Vec2 {
        self.registries
            .fonts
            .get(self.current_font)
            .map_or(Vec2::ZERO, |font| measure_text(font, text))
    }
}

/// Quads for `text` starting at `pos`. Non-ASCII bytes are skipped.
pub fn text_quads(font: &SpriteFont, text: &str, pos: Vec2, color: u32) -> Vec<SpriteQuad> {
    let space = font.glyph(b' ').xadvance;
    let mut cursor = pos;
    let mut quads = Vec::new();
    for byte in text.bytes().filter(u8::is_ascii) {
        match byte {
            b' ' => cursor.x += space,
            b'\t' => cursor.x += space * 4.0,
            b'\n' => {
                cursor.y += font.line_height;
                cursor.x = pos.x;
            }
            b'\r' | 0x0b | 0x0c => {}
            _ => {
                let glyph = font.glyph(byte);
                quads.push(SpriteQuad {
                    position: cursor,
                    origin: Vec2::new(-glyph.off1.x, -glyph.off1.y - font.line_height),
                    angle: 0.0,
                    scale: Vec2::ONE,
                    tex_pos: glyph.pos1,
                    tex_size: glyph.size(),
                    color,
                });
                cursor.x += glyph.xadvance;
            }
        }
    }
    quads
}

/// Width of the widest line and the height of all lines.
pub fn measure_text(font: &SpriteFont, text: &str) -> Vec2 {
    let mut cursor = Vec2::ZERO;
    let mut max_x = 0.0f32;
    for byte in text.bytes().filter(u8::is_ascii) {
        match byte {
            b'\t' => cursor.x += font.glyph(b' ').xadvance * 4.0,
            b'\n' => {
                cursor.y += font.line_height;
                cursor.x = 0.0;
            }
            _ => cursor.x += font.glyph(byte).xadvance,
        }
        max_x = max_x.max(cursor.x);
    }
    cursor.y += font.line_height;
    Vec2::new(max_x, cursor.y)
}
