//! GPU resource API consumed by the resource registries and the draw batcher.
//!
//! Handles are plain indices owned by the backend. `INVALID` marks a resource
//! that failed to load; binding it falls back to a 1x1 white texture (or no
//! program) instead of failing the frame.

use crate::vertex::SpriteVertex;

/// Number of texture slots a shader can sample (`Texture0`..`Texture3`).
pub const TEXTURE_SLOTS: u32 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

impl TextureId {
    pub const INVALID: TextureId = TextureId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

impl ProgramId {
    pub const INVALID: ProgramId = ProgramId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
}

pub trait GpuBackend {
    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId;
    fn delete_texture(&mut self, texture: TextureId);

    /// Compile a complete shader program. Errors carry the compiler output.
    fn create_program(&mut self, label: &str, source: &str) -> Result<ProgramId, String>;
    fn delete_program(&mut self, program: ProgramId);

    fn use_program(&mut self, program: ProgramId);
    fn bind_texture(&mut self, slot: u32, texture: TextureId);

    /// Write a named uniform of the active program. Unknown names are ignored.
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Upload and draw one batch with the current program, textures and uniforms.
    fn draw_indexed(&mut self, vertices: &[SpriteVertex], indices: &[u32]);

    fn resize(&mut self, width: u32, height: u32);
    /// Current drawable size in pixels, if the backend has a surface.
    fn surface_size(&self) -> Option<(u32, u32)>;
    fn begin_frame(&mut self, clear: [f32; 4]);
    fn end_frame(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_handles_are_flagged() {
        assert!(!TextureId::INVALID.is_valid());
        assert!(TextureId(0).is_valid());
        assert!(!ProgramId::INVALID.is_valid());
    }
}
