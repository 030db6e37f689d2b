//! Draw batcher: queued quads sharing one (program, texture) state.
//!
//! Quads are appended in call order and drawn with a single indexed draw on
//! `flush`. The owner must flush before changing program or texture bindings.

use glam::Vec2;

use crate::backend::GpuBackend;
use crate::vertex::{texel_coord, SpriteVertex};

pub const WHITE: u32 = 0xffff_ffff;

/// Index pattern of one quad relative to its first vertex.
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 1, 3, 2];

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpriteQuad {
    pub position: Vec2,
    pub origin: Vec2,
    pub angle: f32,
    pub scale: Vec2,
    pub tex_pos: Vec2,
    pub tex_size: Vec2,
    pub color: u32,
}

impl SpriteQuad {
    /// Untransformed quad covering `tex_size` at `position`.
    pub fn at(position: Vec2, tex_pos: Vec2, tex_size: Vec2, color: u32) -> Self {
        Self {
            position,
            origin: Vec2::ZERO,
            angle: 0.0,
            scale: Vec2::ONE,
            tex_pos,
            tex_size,
            color,
        }
    }
}

/// Screen-space corners in top-left, top-right, bottom-left, bottom-right order.
pub fn quad_corners(quad: &SpriteQuad) -> [Vec2; 4] {
    let (s, c) = quad.angle.sin_cos();
    // Rows of the rotation-scale matrix: x' = p . basis_x, y' = p . basis_y.
    let basis_x = Vec2::new(c * quad.scale.x, s * quad.scale.x);
    let basis_y = Vec2::new(-s * quad.scale.y, c * quad.scale.y);

    let min = -quad.origin;
    let max = quad.tex_size - quad.origin;
    let local = [
        Vec2::new(min.x, min.y),
        Vec2::new(max.x, min.y),
        Vec2::new(min.x, max.y),
        Vec2::new(max.x, max.y),
    ];
    local.map(|p| quad.position + Vec2::new(p.dot(basis_x), p.dot(basis_y)))
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BatchCapacity {
    /// Buffers grow without limit; flushes happen only on state change or frame end.
    #[default]
    Dynamic,
    /// Flush automatically once this many quads are queued.
    Fixed(usize),
}

pub struct DrawBatcher {
    capacity: BatchCapacity,
    vertices: Vec<SpriteVertex>,
    indices: Vec<u32>,
}

impl DrawBatcher {
    pub fn new(capacity: BatchCapacity) -> Self {
        let mut batcher = Self {
            capacity,
            vertices: Vec::new(),
            indices: Vec::new(),
        };
        if let BatchCapacity::Fixed(quads) = capacity {
            batcher.vertices.reserve(quads * 4);
            batcher.indices.reserve(quads * 6);
        }
        batcher
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertices(&self) -> &[SpriteVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Queue one quad. In fixed-capacity mode a full batch is flushed first.
    pub fn push(&mut self, gpu: &mut dyn GpuBackend, quad: &SpriteQuad) {
        if let BatchCapacity::Fixed(max_quads) = self.capacity {
            if self.quad_count() >= max_quads.max(1) {
                self.flush(gpu);
            }
        }

        let base = self.vertices.len() as u32;
        let corners = quad_corners(quad);
        let t0 = quad.tex_pos;
        let t1 = quad.tex_pos + quad.tex_size;
        let tex = [
            [texel_coord(t0.x), texel_coord(t0.y)],
            [texel_coord(t1.x), texel_coord(t0.y)],
            [texel_coord(t0.x), texel_coord(t1.y)],
            [texel_coord(t1.x), texel_coord(t1.y)],
        ];
        for (corner, tex_coords) in corners.iter().zip(tex) {
            self.vertices.push(SpriteVertex {
                position: corner.to_array(),
                tex_coords,
                color: quad.color,
            });
        }
        self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }

    /// Draw everything queued and clear the batch. Returns whether a draw was issued.
    pub fn flush(&mut self, gpu: &mut dyn GpuBackend) -> bool {
        if self.indices.is_empty() {
            return false;
        }
        gpu.draw_indexed(&self.vertices, &self.indices);
        self.vertices.clear();
        self.indices.clear();
        true
    }

    /// Drop queued geometry without drawing it.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }
}
