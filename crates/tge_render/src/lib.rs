pub mod backend;
pub mod batch;
pub mod gpu_context;
pub mod headless;
pub mod sprite_pipeline;
pub mod texture;
pub mod uniforms;
pub mod vertex;
pub mod wgpu_backend;

pub use backend::{GpuBackend, ProgramId, TextureId, UniformValue, TEXTURE_SLOTS};
pub use batch::{quad_corners, BatchCapacity, DrawBatcher, SpriteQuad, WHITE};
pub use gpu_context::GpuContext;
pub use headless::{draw_count, CommandLog, GpuCommand, HeadlessBackend};
pub use texture::{load_rgba, RgbaImage};
pub use vertex::SpriteVertex;
pub use wgpu_backend::WgpuBackend;
