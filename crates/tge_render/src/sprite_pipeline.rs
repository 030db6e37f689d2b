//! Shared pipeline state for sprite programs.
//!
//! Every program uses the same bind group layouts: group 0 holds the `Params`
//! uniform block, group 1 holds `Texture0`..`Texture3` at bindings 0..3 and a
//! sampler at binding 4.

use crate::backend::{UniformValue, TEXTURE_SLOTS};
use crate::texture::GpuTexture;
use crate::uniforms::{encode_uniform, parse_params_layout, UniformLayout};
use crate::vertex::SpriteVertex;

pub struct SpritePipeline {
    pub params_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub sampler: wgpu::Sampler,
    pub surface_format: wgpu::TextureFormat,
}

/// A compiled shader program with its own uniform buffer.
pub struct SpriteProgram {
    pub render_pipeline: wgpu::RenderPipeline,
    pub layout: UniformLayout,
    pub uniform_data: Vec<u8>,
    pub uniform_buffer: wgpu::Buffer,
    pub params_bind_group: wgpu::BindGroup,
    pub uniforms_dirty: bool,
}

impl SpritePipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Params Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let mut texture_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..TEXTURE_SLOTS)
            .map(|slot| wgpu::BindGroupLayoutEntry {
                binding: slot,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            })
            .collect();
        texture_entries.push(wgpu::BindGroupLayoutEntry {
            binding: TEXTURE_SLOTS,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &texture_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&params_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            params_layout,
            texture_layout,
            pipeline_layout,
            sampler,
            surface_format,
        }
    }

    /// Compile `source` into a program. Validation errors are captured and
    /// returned instead of aborting the device.
    pub fn create_program(
        &self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
    ) -> Result<SpriteProgram, String> {
        let layout = parse_params_layout(source).map_err(|e| format!("Shader '{label}': {e}"))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[SpriteVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(format!("Shader '{label}' failed to compile: {err}"));
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Params Uniform Buffer"),
            size: layout.size.max(16) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Params Bind Group"),
            layout: &self.params_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(SpriteProgram {
            render_pipeline,
            uniform_data: vec![0; layout.size.max(16)],
            layout,
            uniform_buffer,
            params_bind_group,
            uniforms_dirty: true,
        })
    }

    pub fn create_texture_bind_group(
        &self,
        device: &wgpu::Device,
        textures: [&GpuTexture; TEXTURE_SLOTS as usize],
    ) -> wgpu::BindGroup {
        let mut entries: Vec<wgpu::BindGroupEntry> = textures
            .iter()
            .enumerate()
            .map(|(slot, tex)| wgpu::BindGroupEntry {
                binding: slot as u32,
                resource: wgpu::BindingResource::TextureView(&tex.view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: TEXTURE_SLOTS,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &entries,
        })
    }
}

impl SpriteProgram {
    /// Store `value` in the named field. Unknown names are ignored.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(field) = self.layout.find(name) else {
            return;
        };
        let bytes = encode_uniform(field.kind, value);
        let len = bytes.len().min(field.size);
        self.uniform_data[field.offset..field.offset + len].copy_from_slice(&bytes[..len]);
        self.uniforms_dirty = true;
    }
}
