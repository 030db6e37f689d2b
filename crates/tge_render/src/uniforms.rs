//! Uniform layout reflection for the `struct Params` block of a WGSL program.
//!
//! Programs declare their script-settable uniforms as fields of one struct
//! bound at group 0. Field offsets follow the WGSL uniform address space rules
//! so a name can be resolved to a byte range on every call.

use crate::backend::UniformValue;

const PARAMS_STRUCT: &str = "struct Params";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UniformKind {
    F32,
    I32,
    U32,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    fn parse(ty: &str) -> Option<Self> {
        match ty.trim() {
            "f32" => Some(UniformKind::F32),
            "i32" => Some(UniformKind::I32),
            "u32" => Some(UniformKind::U32),
            "vec2<f32>" | "vec2f" => Some(UniformKind::Vec2),
            "vec3<f32>" | "vec3f" => Some(UniformKind::Vec3),
            "vec4<f32>" | "vec4f" => Some(UniformKind::Vec4),
            _ => None,
        }
    }

    /// (size, alignment) in bytes.
    fn size_align(self) -> (usize, usize) {
        match self {
            UniformKind::F32 | UniformKind::I32 | UniformKind::U32 => (4, 4),
            UniformKind::Vec2 => (8, 8),
            UniformKind::Vec3 => (12, 16),
            UniformKind::Vec4 => (16, 16),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
    pub size: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UniformLayout {
    pub fields: Vec<UniformField>,
    /// Buffer size, rounded up to 16 bytes.
    pub size: usize,
}

impl UniformLayout {
    pub fn find(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Convert `value` to the bytes of a field of type `kind`. Components are
/// truncated or zero-filled to the field's width.
pub fn encode_uniform(kind: UniformKind, value: UniformValue) -> Vec<u8> {
    let floats: Vec<f32> = match value {
        UniformValue::Float(v) => vec![v],
        UniformValue::Int(v) => vec![v as f32],
        UniformValue::Vec2(v) => v.to_vec(),
        UniformValue::Vec3(v) => v.to_vec(),
        UniformValue::Vec4(v) => v.to_vec(),
    };
    let scalar_int = match value {
        UniformValue::Int(v) => v,
        _ => floats[0] as i32,
    };
    match kind {
        UniformKind::I32 => scalar_int.to_le_bytes().to_vec(),
        UniformKind::U32 => (scalar_int.max(0) as u32).to_le_bytes().to_vec(),
        _ => {
            let width = kind.size_align().0 / 4;
            (0..width)
                .flat_map(|i| floats.get(i).copied().unwrap_or(0.0).to_le_bytes())
                .collect()
        }
    }
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Extract the `Params` layout from WGSL source. A program without the struct
/// has an empty layout.
pub fn parse_params_layout(source: &str) -> Result<UniformLayout, String> {
    let Some(start) = source.find(PARAMS_STRUCT) else {
        return Ok(UniformLayout::default());
    };
    let rest = &source[start + PARAMS_STRUCT.len()..];
    let open = rest
        .find('{')
        .ok_or_else(|| "Params struct has no body".to_string())?;
    let close = rest[open..]
        .find('}')
        .ok_or_else(|| "Params struct is not closed".to_string())?;
    let body = strip_comments(&rest[open + 1..open + close]);

    let mut layout = UniformLayout::default();
    let mut offset = 0usize;
    let mut max_align = 16usize;
    for field in body.split(',') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let (name, ty) = field
            .split_once(':')
            .ok_or_else(|| format!("Malformed Params field '{field}'"))?;
        let name = name.trim();
        let kind = UniformKind::parse(ty)
            .ok_or_else(|| format!("Unsupported Params field type '{}' for '{name}'", ty.trim()))?;
        let (size, align) = kind.size_align();
        offset = round_up(offset, align);
        max_align = max_align.max(align);
        layout.fields.push(UniformField {
            name: name.to_string(),
            kind,
            offset,
            size,
        });
        offset += size;
    }
    layout.size = round_up(offset.max(16), max_align);
    Ok(layout)
}

fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| match line.find("//") {
            Some(i) => &line[..i],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
