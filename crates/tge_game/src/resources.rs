//! Resource registries: sprite sheets, sprite fonts and shader programs.
//!
//! Registries are append-only. Every load allocates a new entry and returns
//! its index, even when the same name was loaded before or the files are
//! missing. Missing manifests log a warning and leave the entry empty; a
//! missing image leaves `TextureId::INVALID`.

use std::collections::HashMap;
use std::path::Path;

use glam::Vec2;
use tge_render::{load_rgba, GpuBackend, ProgramId, TextureId};

use crate::config::ResourcePaths;

pub const GLYPH_COUNT: usize = 128;
pub const VERTEX_SHADER: &str = "sprite_vs.wgsl";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteRect {
    pub pos: Vec2,
    pub size: Vec2,
}

#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub name: String,
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
    pub sprites: HashMap<String, SpriteRect>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Glyph {
    pub pos1: Vec2,
    pub pos2: Vec2,
    pub off1: Vec2,
    pub off2: Vec2,
    pub xadvance: f32,
}

impl Glyph {
    pub fn size(&self) -> Vec2 {
        self.pos2 - self.pos1
    }
}

#[derive(Debug, Clone)]
pub struct SpriteFont {
    pub name: String,
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
    pub glyphs: Vec<Glyph>,
    pub line_height: f32,
}

impl SpriteFont {
    /// Glyph for an ASCII byte; anything else maps to an empty glyph.
    pub fn glyph(&self, byte: u8) -> Glyph {
        self.glyphs.get(byte as usize).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct Shader {
    pub name: String,
    pub program: ProgramId,
}

/// Parse a manifest cell as a float. Unparseable cells read as zero.
pub fn parse_float(cell: &str) -> f32 {
    cell.trim().parse::<f32>().unwrap_or(0.0)
}

/// Data rows of a CSV manifest: the header row is skipped and the first
/// empty line ends the table.
pub fn manifest_rows(text: &str) -> Vec<Vec<&str>> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .take_while(|line| !line.is_empty())
        .skip(1)
        .map(|line| line.split(',').collect())
        .collect()
}

pub fn parse_spritesheet(text: &str) -> HashMap<String, SpriteRect> {
    let mut sprites = HashMap::new();
    for row in manifest_rows(text) {
        let cell = |i: usize| row.get(i).copied().unwrap_or("");
        sprites.insert(
            cell(0).trim().to_string(),
            SpriteRect {
                pos: Vec2::new(parse_float(cell(1)), parse_float(cell(2))),
                size: Vec2::new(parse_float(cell(3)), parse_float(cell(4))),
            },
        );
    }
    sprites
}

/// Parse a font manifest into 128 glyphs and the tallest glyph height.
pub fn parse_spritefont(text: &str) -> (Vec<Glyph>, f32) {
    let mut glyphs = vec![Glyph::default(); GLYPH_COUNT];
    let mut line_height = 0.0f32;
    for row in manifest_rows(text) {
        let value = |i: usize| parse_float(row.get(i).copied().unwrap_or(""));
        let code = value(0);
        if !(0.0..GLYPH_COUNT as f32).contains(&code) {
            log::warn!("Skipping font glyph with code {code}");
            continue;
        }
        let glyph = Glyph {
            pos1: Vec2::new(value(1), value(2)),
            pos2: Vec2::new(value(3), value(4)),
            off1: Vec2::new(value(5), value(6)),
            off2: Vec2::new(value(7), value(8)),
            xadvance: value(9).round(),
        };
        line_height = line_height.max(glyph.pos2.y - glyph.pos1.y);
        glyphs[code as usize] = glyph;
    }
    (glyphs, line_height)
}

fn read_manifest(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read manifest {}: {e}", path.display()))
}

fn load_texture(gpu: &mut dyn GpuBackend, path: &Path) -> (TextureId, u32, u32) {
    match load_rgba(path) {
        Ok(image) => {
            let label = path.display().to_string();
            let id = gpu.create_texture(&label, image.width, image.height, &image.pixels);
            (id, image.width, image.height)
        }
        Err(e) => {
            log::warn!("{e}");
            (TextureId::INVALID, 0, 0)
        }
    }
}

#[derive(Default)]
pub struct Registries {
    pub sprites: Vec<SpriteSheet>,
    pub fonts: Vec<SpriteFont>,
    pub shaders: Vec<Shader>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_sprite(
        &mut self,
        gpu: &mut dyn GpuBackend,
        paths: &ResourcePaths,
        name: &str,
    ) -> usize {
        log::info!("Loading spritesheet: {name}");
        let dir = paths.texture_dir();
        let sprites = match read_manifest(&dir.join(format!("{name}.spritesheet"))) {
            Ok(text) => parse_spritesheet(&text),
            Err(e) => {
                log::warn!("No spritesheet for '{name}': {e}");
                HashMap::new()
            }
        };
        let (texture, width, height) = load_texture(gpu, &dir.join(format!("{name}.png")));
        self.sprites.push(SpriteSheet {
            name: name.to_string(),
            texture,
            width,
            height,
            sprites,
        });
        self.sprites.len() - 1
    }

    pub fn load_font(
        &mut self,
        gpu: &mut dyn GpuBackend,
        paths: &ResourcePaths,
        name: &str,
    ) -> usize {
        log::info!("Loading font: {name}");
        let dir = paths.font_dir();
        let (glyphs, line_height) = match read_manifest(&dir.join(format!("{name}.spritefont"))) {
            Ok(text) => parse_spritefont(&text),
            Err(e) => {
                log::warn!("Failed to load font '{name}': {e}");
                (vec![Glyph::default(); GLYPH_COUNT], 0.0)
            }
        };
        let (texture, width, height) = load_texture(gpu, &dir.join(format!("{name}.png")));
        self.fonts.push(SpriteFont {
            name: name.to_string(),
            texture,
            width,
            height,
            glyphs,
            line_height,
        });
        self.fonts.len() - 1
    }

    /// Compile `<shader>/sprite_vs.wgsl` followed by `<shader>/<name>.wgsl`.
    pub fn load_shader(
        &mut self,
        gpu: &mut dyn GpuBackend,
        paths: &ResourcePaths,
        name: &str,
    ) -> usize {
        log::info!("Loading shader: {name}");
        let program = match shader_source(paths, name) {
            Ok(source) => match gpu.create_program(name, &source) {
                Ok(program) => program,
                Err(e) => {
                    log::error!("{e}");
                    ProgramId::INVALID
                }
            },
            Err(e) => {
                log::error!("{e}");
                ProgramId::INVALID
            }
        };
        self.shaders.push(Shader {
            name: name.to_string(),
            program,
        });
        self.shaders.len() - 1
    }

    /// Release every GPU resource and empty the registries. Textures go first.
    pub fn clear(&mut self, gpu: &mut dyn GpuBackend) {
        let textures = self
            .sprites
            .iter()
            .map(|s| s.texture)
            .chain(self.fonts.iter().map(|f| f.texture));
        for texture in textures.filter(|t| t.is_valid()) {
            gpu.delete_texture(texture);
        }
        for shader in self.shaders.iter().filter(|s| s.program.is_valid()) {
            gpu.delete_program(shader.program);
        }
        self.sprites.clear();
        self.fonts.clear();
        self.shaders.clear();
    }
}

fn shader_source(paths: &ResourcePaths, name: &str) -> Result<String, String> {
    let dir = paths.shader_dir();
    let mut source = String::new();
    for file in [VERTEX_SHADER.to_string(), format!("{name}.wgsl")] {
        let path = dir.join(&file);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read shader {}: {e}", path.display()))?;
        source.push_str(&text);
        source.push('\n');
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tge_render::{GpuCommand, HeadlessBackend};

    fn temp_root(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let root = std::env::temp_dir().join(format!(
            "tge_resources_{}_{}_{}",
            name,
            std::process::id(),
            nanos
        ));
        for dir in ["texture", "font", "shader"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        root
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn manifest_skips_header_and_stops_at_blank_line() {
        let rows = manifest_rows("name,x\r\na,1\r\nb,2\r\n\r\nc,3\n");
        assert_eq!(rows, vec![vec!["a", "1"], vec!["b", "2"]]);
    }

    #[test]
    fn bad_numbers_read_as_zero() {
        assert_eq!(parse_float("12.5"), 12.5);
        assert_eq!(parse_float("abc"), 0.0);
        assert_eq!(parse_float(""), 0.0);
    }

    #[test]
    fn font_manifest_rounds_advance_and_tracks_line_height() {
        let text = "char,x0,y0,x1,y1,xoff,yoff,xoff2,yoff2,xadvance\n\
                    65,0,0,10,14,1,-12,11,2,10.6\n\
                    103,10,0,18,18,0,-9,8,9,8.2\n\
                    300,0,0,50,50,0,0,0,0,1\n";
        let (glyphs, line_height) = parse_spritefont(text);
        assert_eq!(glyphs.len(), GLYPH_COUNT);
        assert_eq!(glyphs[65].xadvance, 11.0);
        assert_eq!(glyphs[103].xadvance, 8.0);
        assert_eq!(glyphs[65].off1, Vec2::new(1.0, -12.0));
        assert_eq!(line_height, 18.0);
        assert_eq!(glyphs[32], Glyph::default());
    }

    #[test]
    fn spritesheet_manifest_round_trip() {
        let root = temp_root("sheet");
        std::fs::write(
            root.join("texture/tiles.spritesheet"),
            "name,x,y,width,height\na,0,0,16,16\nb,16,0,8,8\n",
        )
        .unwrap();
        write_png(&root.join("texture/tiles.png"), 24, 16);

        let mut gpu = HeadlessBackend::new();
        let mut registries = Registries::new();
        let handle = registries.load_sprite(&mut gpu, &ResourcePaths::new(&root), "tiles");
        let sheet = &registries.sprites[handle];
        assert_eq!(sheet.sprites["a"].size, Vec2::new(16.0, 16.0));
        assert_eq!(sheet.sprites["b"].pos, Vec2::new(16.0, 0.0));
        assert_eq!((sheet.width, sheet.height), (24, 16));
        assert!(sheet.texture.is_valid());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn repeated_loads_allocate_new_handles() {
        let root = temp_root("handles");
        write_png(&root.join("texture/x.png"), 2, 2);
        let paths = ResourcePaths::new(&root);

        let mut gpu = HeadlessBackend::new();
        let mut registries = Registries::new();
        let handles: Vec<usize> = ["x", "x", "y", "x"]
            .iter()
            .map(|name| registries.load_sprite(&mut gpu, &paths, name))
            .collect();
        assert_eq!(handles, vec![0, 1, 2, 3]);
        assert_ne!(registries.sprites[0].texture, registries.sprites[1].texture);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn missing_files_still_create_entries() {
        let root = temp_root("missing");
        let paths = ResourcePaths::new(&root);
        let mut gpu = HeadlessBackend::new();
        let mut registries = Registries::new();

        assert_eq!(registries.load_sprite(&mut gpu, &paths, "nope"), 0);
        assert_eq!(registries.load_font(&mut gpu, &paths, "nope"), 0);
        assert_eq!(registries.load_shader(&mut gpu, &paths, "nope"), 0);
        assert!(registries.sprites[0].sprites.is_empty());
        assert_eq!(registries.sprites[0].texture, TextureId::INVALID);
        assert_eq!(registries.fonts[0].glyphs.len(), GLYPH_COUNT);
        assert_eq!(registries.shaders[0].program, ProgramId::INVALID);
        assert!(gpu.log().borrow().is_empty());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn shader_joins_vertex_and_fragment_sources() {
        let root = temp_root("shader");
        std::fs::write(root.join("shader/sprite_vs.wgsl"), "fn vs_main() {}").unwrap();
        std::fs::write(root.join("shader/glow.wgsl"), "fn fs_main() {}").unwrap();
        let source = shader_source(&ResourcePaths::new(&root), "glow").unwrap();
        assert!(source.starts_with("fn vs_main"));
        assert!(source.contains("fn fs_main"));

        let mut gpu = HeadlessBackend::new();
        let mut registries = Registries::new();
        registries.load_shader(&mut gpu, &ResourcePaths::new(&root), "glow");
        assert!(registries.shaders[0].program.is_valid());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn clear_deletes_textures_before_programs() {
        let root = temp_root("clear");
        write_png(&root.join("texture/s.png"), 1, 1);
        write_png(&root.join("font/f.png"), 1, 1);
        std::fs::write(root.join("shader/sprite_vs.wgsl"), "").unwrap();
        std::fs::write(root.join("shader/p.wgsl"), "fn fs_main() {}").unwrap();
        let paths = ResourcePaths::new(&root);

        let mut gpu = HeadlessBackend::new();
        let mut registries = Registries::new();
        registries.load_shader(&mut gpu, &paths, "p");
        registries.load_sprite(&mut gpu, &paths, "s");
        registries.load_font(&mut gpu, &paths, "f");
        gpu.log().borrow_mut().clear();

        registries.clear(&mut gpu);
        let log = gpu.log();
        let log = log.borrow();
        assert!(matches!(log[0], GpuCommand::DeleteTexture(_)));
        assert!(matches!(log[1], GpuCommand::DeleteTexture(_)));
        assert!(matches!(log[2], GpuCommand::DeleteProgram(_)));
        assert!(registries.sprites.is_empty() && registries.shaders.is_empty());

        let _ = std::fs::remove_dir_all(root);
    }
}
