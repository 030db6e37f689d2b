//! `GpuBackend` on top of wgpu.
//!
//! Each `draw_indexed` call records and submits its own render pass that loads
//! the existing frame contents, so uploads for consecutive batches can reuse
//! the same buffers. The first pass of a frame clears; a frame with no draws
//! is cleared in `end_frame`.

use std::sync::Arc;

use winit::window::Window;

use crate::backend::{GpuBackend, ProgramId, TextureId, UniformValue, TEXTURE_SLOTS};
use crate::gpu_context::GpuContext;
use crate::sprite_pipeline::{SpritePipeline, SpriteProgram};
use crate::texture::GpuTexture;
use crate::vertex::SpriteVertex;

struct Frame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    pending_clear: Option<wgpu::Color>,
}

pub struct WgpuBackend {
    gpu: GpuContext,
    pipeline: SpritePipeline,
    white: GpuTexture,
    textures: Vec<Option<GpuTexture>>,
    programs: Vec<Option<SpriteProgram>>,
    current_program: Option<usize>,
    bound: [TextureId; TEXTURE_SLOTS as usize],
    frame: Option<Frame>,

    // Streamed mesh buffers. They grow (power-of-two) but never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>, vsync: bool) -> Result<Self, String> {
        let gpu = GpuContext::new(window, vsync)?;
        let pipeline = SpritePipeline::new(&gpu.device, gpu.format());
        let white = GpuTexture::white(&gpu.device, &gpu.queue);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);
        Ok(Self {
            gpu,
            pipeline,
            white,
            textures: Vec::new(),
            programs: Vec::new(),
            current_program: None,
            bound: [TextureId::INVALID; TEXTURE_SLOTS as usize],
            frame: None,
            vertex_buffer,
            index_buffer,
            mesh_vertex_capacity: 1,
            mesh_index_capacity: 1,
        })
    }

    fn texture(&self, id: TextureId) -> &GpuTexture {
        self.textures
            .get(id.0 as usize)
            .and_then(|t| t.as_ref())
            .unwrap_or(&self.white)
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn clear_only(&mut self) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let Some(clear) = frame.pending_clear.take() else {
            return;
        };
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl GpuBackend for WgpuBackend {
    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId {
        let texture = GpuTexture::from_rgba(
            &self.gpu.device,
            &self.gpu.queue,
            label,
            width,
            height,
            rgba,
        );
        self.textures.push(Some(texture));
        TextureId((self.textures.len() - 1) as u32)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(slot) = self.textures.get_mut(texture.0 as usize) {
            if let Some(tex) = slot.take() {
                tex.texture.destroy();
            }
        }
    }

    fn create_program(&mut self, label: &str, source: &str) -> Result<ProgramId, String> {
        let program = self.pipeline.create_program(&self.gpu.device, label, source)?;
        self.programs.push(Some(program));
        Ok(ProgramId((self.programs.len() - 1) as u32))
    }

    fn delete_program(&mut self, program: ProgramId) {
        let index = program.0 as usize;
        if let Some(slot) = self.programs.get_mut(index) {
            *slot = None;
        }
        if self.current_program == Some(index) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        let index = program.0 as usize;
        self.current_program = match self.programs.get(index) {
            Some(Some(_)) => Some(index),
            _ => None,
        };
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        if let Some(bound) = self.bound.get_mut(slot as usize) {
            *bound = texture;
        }
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(index) = self.current_program else {
            return;
        };
        if let Some(Some(program)) = self.programs.get_mut(index) {
            program.set_uniform(name, value);
        }
    }

    fn draw_indexed(&mut self, vertices: &[SpriteVertex], indices: &[u32]) {
        if indices.is_empty() || self.frame.is_none() {
            return;
        }
        let Some(program_index) = self.current_program else {
            log::warn!("Dropping batch of {} indices: no shader bound", indices.len());
            return;
        };

        self.ensure_mesh_capacity(vertices.len(), indices.len());
        self.gpu
            .queue
            .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        self.gpu
            .queue
            .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(indices));

        let textures = [
            self.texture(self.bound[0]),
            self.texture(self.bound[1]),
            self.texture(self.bound[2]),
            self.texture(self.bound[3]),
        ];
        let texture_bind_group = self
            .pipeline
            .create_texture_bind_group(&self.gpu.device, textures);

        let Some(Some(program)) = self.programs.get_mut(program_index) else {
            return;
        };
        if program.uniforms_dirty {
            self.gpu
                .queue
                .write_buffer(&program.uniform_buffer, 0, &program.uniform_data);
            program.uniforms_dirty = false;
        }

        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let load = match frame.pending_clear.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Batch Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Batch Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            render_pass.set_pipeline(&program.render_pipeline);
            render_pass.set_bind_group(0, &program.params_bind_group, &[]);
            render_pass.set_bind_group(1, &texture_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..indices.len() as u32, 0, 0..1);
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    fn surface_size(&self) -> Option<(u32, u32)> {
        Some(self.gpu.size())
    }

    fn begin_frame(&mut self, clear: [f32; 4]) {
        if self.frame.is_some() {
            self.end_frame();
        }
        self.frame = self.gpu.acquire().map(|(output, view)| Frame {
            output,
            view,
            pending_clear: Some(wgpu::Color {
                r: clear[0] as f64,
                g: clear[1] as f64,
                b: clear[2] as f64,
                a: clear[3] as f64,
            }),
        });
    }

    fn end_frame(&mut self) {
        self.clear_only();
        if let Some(frame) = self.frame.take() {
            frame.output.present();
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Batch Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Batch Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
