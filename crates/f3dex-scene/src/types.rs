use crate::command::Command;
use crate::diagnostics::Diagnostics;
use std::path::PathBuf;

/// Default bound on the number of commands one decode pass executes.
pub const DEFAULT_MAX_COMMANDS: usize = 1 << 20;

/// Configuration for a full model conversion (used by the CLI).
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Model binary to read.
    pub input: PathBuf,
    /// Output file; its extension selects the interchange format.
    pub output: PathBuf,
    /// Maximum commands a decode pass may execute.
    pub max_commands: usize,
    /// Write decoded textures next to the scene file.
    pub write_textures: bool,
}

impl ConvertConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            max_commands: DEFAULT_MAX_COMMANDS,
            write_textures: true,
        }
    }

    pub fn decode_config(&self) -> DecodeConfig {
        DecodeConfig {
            max_commands: self.max_commands,
        }
    }
}

/// Configuration for a single decode pass.
#[derive(Debug, Clone, Copy)]
pub struct DecodeConfig {
    pub max_commands: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_commands: DEFAULT_MAX_COMMANDS,
        }
    }
}

/// Summary of a finished conversion.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub mesh_count: usize,
    pub face_count: usize,
    /// Includes the null material.
    pub material_count: usize,
    /// Every file the writer produced.
    pub written: Vec<PathBuf>,
    pub diagnostics: Diagnostics,
}

/// One entry of the model's global vertex array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position (x, y, z) in model space.
    pub position: [f32; 3],
    /// Vertex color (r, g, b, a), 0-255.
    pub color: [f32; 4],
    /// Raw texture coordinates in microcode units (10.5 fixed point, unscaled).
    pub uv: [f32; 2],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            color: [255.0; 4],
            uv: [0.0; 2],
        }
    }
}

/// Texel layouts understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexelFormat {
    Rgba16,
    Rgba32,
    Ci4,
    Ci8,
    Ia4,
    Ia8,
    Ia16,
    I4,
    I8,
}

impl TexelFormat {
    /// Decode the format code stored in a model's texture header.
    pub const fn from_model_code(code: u16) -> Option<Self> {
        match code {
            0x01 => Some(Self::Ci4),
            0x02 => Some(Self::Ci8),
            0x04 => Some(Self::Rgba16),
            0x08 => Some(Self::Rgba32),
            0x10 => Some(Self::Ia8),
            _ => None,
        }
    }

    /// Decode the microcode's 3-bit format and 2-bit size fields.
    pub const fn from_fmt_siz(fmt: u8, siz: u8) -> Option<Self> {
        match (fmt, siz) {
            (0, 2) => Some(Self::Rgba16),
            (0, 3) => Some(Self::Rgba32),
            (2, 0) => Some(Self::Ci4),
            (2, 1) => Some(Self::Ci8),
            (3, 0) => Some(Self::Ia4),
            (3, 1) => Some(Self::Ia8),
            (3, 2) => Some(Self::Ia16),
            (4, 0) => Some(Self::I4),
            (4, 1) => Some(Self::I8),
            _ => None,
        }
    }

    pub const fn bits_per_texel(&self) -> usize {
        match self {
            Self::Ci4 | Self::Ia4 | Self::I4 => 4,
            Self::Ci8 | Self::Ia8 | Self::I8 => 8,
            Self::Rgba16 | Self::Ia16 => 16,
            Self::Rgba32 => 32,
        }
    }

    /// Bytes of RGBA16 palette stored ahead of the texels in model texture data.
    pub const fn embedded_palette_len(&self) -> usize {
        match self {
            Self::Ci4 => 16 * 2,
            Self::Ci8 => 256 * 2,
            _ => 0,
        }
    }
}

/// Texture addressing per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    Wrap,
    Clamp,
}

impl WrapMode {
    /// Decode a 2-bit clamp/mirror field; bit 1 selects clamping.
    pub const fn from_cm_bits(bits: u8) -> Self {
        if bits & 0b10 != 0 {
            Self::Clamp
        } else {
            Self::Wrap
        }
    }
}

/// Tile fields taken from a texture-format-and-size command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileFormat {
    /// 3-bit texel format.
    pub fmt: u8,
    /// 2-bit texel size.
    pub siz: u8,
    /// Clamp/mirror bits for the S axis.
    pub cms: u8,
    /// Clamp/mirror bits for the T axis.
    pub cmt: u8,
}

/// Decoded RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// One texture referenced by the display list.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Offset of the texture's data (palette first for CI formats) within the texture data section.
    pub data_offset: u32,
    pub format: TexelFormat,
    pub width: u32,
    pub height: u32,
    /// Last tile configuration applied while this texture was active.
    pub tile: Option<TileFormat>,
    /// Factor mapping raw U units to normalized texture space.
    pub u_ratio: f32,
    /// Factor mapping raw V units to normalized texture space.
    pub v_ratio: f32,
    /// Filled the first time a batch references this texture.
    pub pixels: Option<PixelBuffer>,
    /// RGBA16 palette loaded by a palette command, if any.
    pub palette: Option<Vec<u8>>,
}

impl TextureDescriptor {
    pub fn new(data_offset: u32, format: TexelFormat, width: u32, height: u32) -> Self {
        Self {
            data_offset,
            format,
            width,
            height,
            tile: None,
            u_ratio: 0.0,
            v_ratio: 0.0,
            pixels: None,
            palette: None,
        }
    }

    /// Offset of the first texel, past any embedded palette.
    pub fn texel_offset(&self) -> u32 {
        self.data_offset + self.format.embedded_palette_len() as u32
    }

    /// Record a tile configuration; its format/size fields replace the texel format.
    ///
    /// Field combinations with no texel format leave the format unchanged.
    pub fn apply_tile(&mut self, tile: TileFormat) {
        self.tile = Some(tile);
        if let Some(format) = TexelFormat::from_fmt_siz(tile.fmt, tile.siz) {
            self.format = format;
        }
    }

    /// Bytes of texel data implied by the dimensions and format.
    pub fn texel_len(&self) -> usize {
        (self.width as usize * self.height as usize * self.format.bits_per_texel()).div_ceil(8)
    }
}

/// Everything the decoder needs from a model binary.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub vertices: Vec<Vertex>,
    pub textures: Vec<TextureDescriptor>,
    pub commands: Vec<Command>,
    /// Raw texture data section that descriptor offsets point into.
    pub texture_data: Vec<u8>,
}

/// Surface description exported with a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Index into [`Scene::textures`]; `None` for the null material.
    pub texture: Option<usize>,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl Material {
    pub const NULL_INDEX: usize = 0;

    /// Placeholder material for triangles drawn with no texture bound.
    pub fn null() -> Self {
        Self {
            name: "NullMaterial".to_string(),
            texture: None,
            wrap_s: WrapMode::Wrap,
            wrap_t: WrapMode::Wrap,
        }
    }

    pub fn for_texture(texture: usize, wrap_s: WrapMode, wrap_t: WrapMode) -> Self {
        Self {
            name: format!("Material_{:04}", texture),
            texture: Some(texture),
            wrap_s,
            wrap_t,
        }
    }
}

/// A triangle batch re-indexed into compact local arrays.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub material: usize,
    /// Global index that maps to local index 0.
    pub index_offset: u32,
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub uvs: Vec<[f32; 2]>,
    /// Triangles of local indices into the parallel arrays above.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Decoded model, ready for export.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Index 0 is always the null material.
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub textures: Vec<TextureDescriptor>,
}

impl Scene {
    pub fn face_count(&self) -> usize {
        self.meshes.iter().map(|m| m.faces.len()).sum()
    }
}
