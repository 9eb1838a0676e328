//! Texture selection, palette loading and first-reference material creation.

use crate::codec::TextureCodec;
use crate::command::Command;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{Material, TexelFormat, TextureDescriptor, TileFormat, WrapMode};

/// Raw texture coordinates carry 5 fractional bits.
const TEXCOORD_UNITS_PER_TEXEL: f32 = 32.0;

/// Mask for the segment offset in a texture image address.
const SEGMENT_OFFSET_MASK: u32 = 0x00FF_FFFF;

/// Read the tile fields of a texture-format-and-size command.
pub fn parse_tile(command: &Command) -> TileFormat {
    let b1 = command.byte(1);
    let w1 = command.width();
    TileFormat {
        fmt: b1 >> 5,
        siz: (b1 >> 3) & 0b11,
        cmt: ((w1 >> 18) & 0b11) as u8,
        cms: ((w1 >> 8) & 0b11) as u8,
    }
}

/// Factor mapping raw coordinates to normalized texture space along one axis.
///
/// A scale of zero means no scale command was seen and counts as 1.0.
pub fn uv_ratio(scale: f32, dimension: u32) -> f32 {
    if dimension == 0 {
        return 0.0;
    }
    let scale = if scale == 0.0 { 1.0 } else { scale };
    scale / (TEXCOORD_UNITS_PER_TEXEL * dimension as f32)
}

/// Owns the texture descriptors and materials of one decode pass.
pub struct TextureResolver<'a> {
    textures: Vec<TextureDescriptor>,
    texture_data: &'a [u8],
    codec: &'a dyn TextureCodec,
    materials: Vec<Material>,
    material_for_texture: Vec<Option<usize>>,
}

impl<'a> TextureResolver<'a> {
    pub fn new(
        textures: Vec<TextureDescriptor>,
        texture_data: &'a [u8],
        codec: &'a dyn TextureCodec,
    ) -> Self {
        let material_for_texture = vec![None; textures.len()];
        Self {
            textures,
            texture_data,
            codec,
            materials: vec![Material::null()],
            material_for_texture,
        }
    }

    pub fn texture(&self, index: usize) -> Option<&TextureDescriptor> {
        self.textures.get(index)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// UV ratios of a texture, or zero when it does not exist.
    pub fn ratios(&self, index: usize) -> (f32, f32) {
        self.textures
            .get(index)
            .map_or((0.0, 0.0), |t| (t.u_ratio, t.v_ratio))
    }

    /// Select the texture a bind command points at and refresh its UV ratios.
    ///
    /// An address that matches no descriptor grows the descriptor array.
    pub fn bind(
        &mut self,
        command_index: usize,
        command: &Command,
        tile: Option<TileFormat>,
        s_scale: f32,
        t_scale: f32,
        diagnostics: &mut Diagnostics,
    ) -> usize {
        let offset = command.width() & SEGMENT_OFFSET_MASK;
        let index = match self
            .textures
            .iter()
            .position(|t| t.data_offset == offset || t.texel_offset() == offset)
        {
            Some(index) => index,
            None => {
                let b1 = command.byte(1);
                let format = TexelFormat::from_fmt_siz(b1 >> 5, (b1 >> 3) & 0b11)
                    .unwrap_or(TexelFormat::Rgba16);
                diagnostics.push(Diagnostic::UnknownTexture {
                    command: command_index,
                    offset,
                });
                self.textures.push(TextureDescriptor::new(offset, format, 0, 0));
                self.material_for_texture.push(None);
                self.textures.len() - 1
            }
        };

        let texture = &mut self.textures[index];
        if let Some(tile) = tile {
            texture.apply_tile(tile);
        }
        texture.u_ratio = uv_ratio(s_scale, texture.width);
        texture.v_ratio = uv_ratio(t_scale, texture.height);
        index
    }

    /// Apply a tile command's format, size and clamp fields to the active texture.
    pub fn set_tile(&mut self, index: usize, tile: TileFormat) {
        if let Some(texture) = self.textures.get_mut(index) {
            texture.apply_tile(tile);
        }
    }

    /// Load `size` bytes of palette from the start of the active texture's data.
    pub fn load_palette(
        &mut self,
        command_index: usize,
        index: usize,
        size: usize,
        diagnostics: &mut Diagnostics,
    ) {
        let data = self.texture_data;
        let palette = self.textures.get(index).and_then(|t| {
            let start = t.data_offset as usize;
            data.get(start..start + size)
        });
        match palette {
            Some(bytes) => self.textures[index].palette = Some(bytes.to_vec()),
            None => diagnostics.push(Diagnostic::PaletteOutOfRange {
                command: command_index,
                texture: index,
            }),
        }
    }

    /// Material for a texture, decoding its pixels and creating the material
    /// the first time the texture is referenced.
    pub fn material_for(
        &mut self,
        index: usize,
        wrap_s: WrapMode,
        wrap_t: WrapMode,
        diagnostics: &mut Diagnostics,
    ) -> Option<usize> {
        if let Some(material) = *self.material_for_texture.get(index)? {
            return Some(material);
        }

        let texture = &mut self.textures[index];
        if texture.pixels.is_none() {
            let raw = self
                .texture_data
                .get(texture.data_offset as usize..)
                .unwrap_or(&[]);
            match self.codec.decode(texture, raw) {
                Ok(pixels) => texture.pixels = Some(pixels),
                Err(e) => diagnostics.push(Diagnostic::TextureDecode {
                    texture: index,
                    message: e.to_string(),
                }),
            }
        }

        let material = self.materials.len();
        log::debug!("Material {} created for texture {}", material, index);
        self.materials.push(Material::for_texture(index, wrap_s, wrap_t));
        self.material_for_texture[index] = Some(material);
        Some(material)
    }

    pub fn into_parts(self) -> (Vec<Material>, Vec<TextureDescriptor>) {
        (self.materials, self.textures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::N64Codec;
    use crate::command::Opcode;

    fn bind_command(offset: u32) -> Command {
        Command::with_width(Opcode::TextureStart.byte(), 0x10, 0, 0, 0x0200_0000 | offset)
    }

    #[test]
    fn test_uv_ratio() {
        assert_eq!(uv_ratio(1.0, 32), 1.0 / 1024.0);
        assert_eq!(uv_ratio(0.0, 32), 1.0 / 1024.0);
        assert_eq!(uv_ratio(0.5, 16), 0.5 / 512.0);
        assert_eq!(uv_ratio(1.0, 0), 0.0);
    }

    #[test]
    fn test_parse_tile() {
        // fmt=2 (CI), siz=0; cmt=2 (clamp), cms=1 (mirror)
        let cmd = Command::with_width(245, 0x40, 0, 0, (2 << 18) | (1 << 8));
        let tile = parse_tile(&cmd);
        assert_eq!(tile.fmt, 2);
        assert_eq!(tile.siz, 0);
        assert_eq!(tile.cmt, 2);
        assert_eq!(tile.cms, 1);
    }

    #[test]
    fn test_bind_by_data_or_texel_offset() {
        let textures = vec![
            TextureDescriptor::new(0, TexelFormat::Rgba16, 32, 32),
            TextureDescriptor::new(0x800, TexelFormat::Ci4, 16, 16),
        ];
        let codec = N64Codec;
        let mut r = TextureResolver::new(textures, &[], &codec);
        let mut diags = Diagnostics::new();

        assert_eq!(r.bind(0, &bind_command(0x800), None, 1.0, 1.0, &mut diags), 1);
        assert_eq!(r.bind(1, &bind_command(0x820), None, 1.0, 1.0, &mut diags), 1);
        assert_eq!(r.bind(2, &bind_command(0), None, 1.0, 0.5, &mut diags), 0);
        assert!(diags.is_empty());
        assert_eq!(r.ratios(0), (1.0 / 1024.0, 0.5 / 1024.0));
    }

    #[test]
    fn test_set_tile_replaces_format() {
        let textures = vec![TextureDescriptor::new(0, TexelFormat::Rgba16, 16, 16)];
        let codec = N64Codec;
        let mut r = TextureResolver::new(textures, &[], &codec);

        r.set_tile(0, parse_tile(&Command::with_width(245, 0x48, 0, 0, 0)));
        assert_eq!(r.texture(0).map(|t| t.format), Some(TexelFormat::Ci8));

        // fmt = 1 (YUV) has no texel format; only the tile is recorded
        r.set_tile(0, parse_tile(&Command::with_width(245, 0x30, 0, 0, 0)));
        let texture = r.texture(0).unwrap();
        assert_eq!(texture.format, TexelFormat::Ci8);
        assert_eq!(texture.tile.map(|t| t.fmt), Some(1));

        // Out-of-range index is ignored
        r.set_tile(5, TileFormat::default());
    }

    #[test]
    fn test_bind_unknown_offset_grows() {
        let codec = N64Codec;
        let mut r = TextureResolver::new(Vec::new(), &[], &codec);
        let mut diags = Diagnostics::new();
        let index = r.bind(4, &bind_command(0x40), None, 1.0, 1.0, &mut diags);
        assert_eq!(index, 0);
        assert_eq!(r.texture(0).map(|t| t.data_offset), Some(0x40));
        assert_eq!(diags.len(), 1);
        assert_eq!(r.ratios(0), (0.0, 0.0));
    }

    #[test]
    fn test_material_created_once_in_reference_order() {
        let data = vec![0xFFu8; 2 * 2 * 2 * 2];
        let textures = vec![
            TextureDescriptor::new(0, TexelFormat::Rgba16, 2, 2),
            TextureDescriptor::new(8, TexelFormat::Rgba16, 2, 2),
        ];
        let codec = N64Codec;
        let mut r = TextureResolver::new(textures, &data, &codec);
        let mut diags = Diagnostics::new();

        assert_eq!(r.material_for(1, WrapMode::Clamp, WrapMode::Wrap, &mut diags), Some(1));
        assert_eq!(r.material_for(0, WrapMode::Wrap, WrapMode::Wrap, &mut diags), Some(2));
        assert_eq!(r.material_for(1, WrapMode::Wrap, WrapMode::Wrap, &mut diags), Some(1));
        assert_eq!(r.materials().len(), 3);
        assert_eq!(r.materials()[1].texture, Some(1));
        assert_eq!(r.materials()[1].wrap_s, WrapMode::Clamp);
        assert!(r.texture(1).and_then(|t| t.pixels.as_ref()).is_some());
        assert!(diags.is_empty());
        assert_eq!(r.material_for(9, WrapMode::Wrap, WrapMode::Wrap, &mut diags), None);
    }

    #[test]
    fn test_decode_failure_still_creates_material() {
        let textures = vec![TextureDescriptor::new(0, TexelFormat::Rgba32, 8, 8)];
        let codec = N64Codec;
        let mut r = TextureResolver::new(textures, &[0; 4], &codec);
        let mut diags = Diagnostics::new();
        assert_eq!(r.material_for(0, WrapMode::Wrap, WrapMode::Wrap, &mut diags), Some(1));
        assert_eq!(diags.len(), 1);
        assert!(r.texture(0).and_then(|t| t.pixels.as_ref()).is_none());
    }

    #[test]
    fn test_palette_bounds() {
        let textures = vec![TextureDescriptor::new(4, TexelFormat::Ci4, 4, 4)];
        let data = [0u8, 0, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD];
        let codec = N64Codec;
        let mut r = TextureResolver::new(textures, &data, &codec);
        let mut diags = Diagnostics::new();

        r.load_palette(0, 0, 4, &mut diags);
        assert_eq!(r.texture(0).and_then(|t| t.palette.clone()), Some(vec![0xAA, 0xBB, 0xCC, 0xDD]));

        r.load_palette(1, 0, 32, &mut diags);
        assert_eq!(diags.len(), 1);
    }
}
