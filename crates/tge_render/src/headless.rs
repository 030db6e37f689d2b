use std::cell::RefCell;
use std::rc::Rc;

use crate::backend::{GpuBackend, ProgramId, TextureId, UniformValue};
use crate::vertex::SpriteVertex;

/// One call made against a [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum GpuCommand {
    CreateTexture {
        id: TextureId,
        label: String,
        width: u32,
        height: u32,
    },
    DeleteTexture(TextureId),
    CreateProgram {
        id: ProgramId,
        label: String,
    },
    DeleteProgram(ProgramId),
    UseProgram(ProgramId),
    BindTexture {
        slot: u32,
        texture: TextureId,
    },
    SetUniform {
        name: String,
        value: UniformValue,
    },
    Draw {
        vertices: Vec<SpriteVertex>,
        indices: Vec<u32>,
    },
    Resize {
        width: u32,
        height: u32,
    },
    BeginFrame([f32; 4]),
    EndFrame,
}

pub type CommandLog = Rc<RefCell<Vec<GpuCommand>>>;

/// Backend without a device. Every call is appended to a shared log so
/// callers can inspect what would have reached the GPU.
pub struct HeadlessBackend {
    log: CommandLog,
    next_texture: u32,
    next_program: u32,
    surface_size: Option<(u32, u32)>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_log(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn with_log(log: CommandLog) -> Self {
        Self {
            log,
            next_texture: 0,
            next_program: 0,
            surface_size: None,
        }
    }

    /// Report a fixed drawable size, as a window would before any resize.
    pub fn with_surface_size(mut self, width: u32, height: u32) -> Self {
        self.surface_size = Some((width, height));
        self
    }

    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    fn record(&self, command: GpuCommand) {
        self.log.borrow_mut().push(command);
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_texture(&mut self, label: &str, width: u32, height: u32, _rgba: &[u8]) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.record(GpuCommand::CreateTexture {
            id,
            label: label.to_string(),
            width,
            height,
        });
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.record(GpuCommand::DeleteTexture(texture));
    }

    fn create_program(&mut self, label: &str, source: &str) -> Result<ProgramId, String> {
        if !source.contains("fs_main") {
            return Err(format!("Shader '{label}' has no fs_main entry point"));
        }
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.record(GpuCommand::CreateProgram {
            id,
            label: label.to_string(),
        });
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.record(GpuCommand::DeleteProgram(program));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.record(GpuCommand::UseProgram(program));
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        self.record(GpuCommand::BindTexture { slot, texture });
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.record(GpuCommand::SetUniform {
            name: name.to_string(),
            value,
        });
    }

    fn draw_indexed(&mut self, vertices: &[SpriteVertex], indices: &[u32]) {
        self.record(GpuCommand::Draw {
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
        });
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.record(GpuCommand::Resize { width, height });
        if self.surface_size.is_some() {
            self.surface_size = Some((width, height));
        }
    }

    fn surface_size(&self) -> Option<(u32, u32)> {
        self.surface_size
    }

    fn begin_frame(&mut self, clear: [f32; 4]) {
        self.record(GpuCommand::BeginFrame(clear));
    }

    fn end_frame(&mut self) {
        self.record(GpuCommand::EndFrame);
    }
}

/// Count the `Draw` commands in a log.
pub fn draw_count(log: &[GpuCommand]) -> usize {
    log.iter()
        .filter(|c| matches!(c, GpuCommand::Draw { .. }))
        .count()
}
