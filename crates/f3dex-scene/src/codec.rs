use crate::error::CodecError;
use crate::types::{PixelBuffer, TexelFormat, TextureDescriptor};

/// Turns a texture's raw bytes into RGBA8 pixels.
pub trait TextureCodec {
    /// Decode `raw`, the texture data section starting at `descriptor.data_offset`.
    fn decode(&self, descriptor: &TextureDescriptor, raw: &[u8])
        -> Result<PixelBuffer, CodecError>;
}

/// Decoder for the N64 texel formats found in model binaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct N64Codec;

/// Expand a 5-bit channel to 8 bits.
fn expand5(c: u16) -> u8 {
    let c = (c & 0x1F) as u8;
    (c << 3) | (c >> 2)
}

/// Convert one big-endian RGBA5551 texel to RGBA8.
pub fn rgba5551_to_rgba8(texel: u16) -> [u8; 4] {
    [
        expand5(texel >> 11),
        expand5(texel >> 6),
        expand5(texel >> 1),
        if texel & 1 != 0 { 255 } else { 0 },
    ]
}

/// Read the `index`-th 4-bit value, high nibble first.
fn nibble(bytes: &[u8], index: usize) -> u8 {
    let byte = bytes[index / 2];
    if index % 2 == 0 {
        byte >> 4
    } else {
        byte & 0x0F
    }
}

fn palette_color(palette: &[u8], index: u8) -> [u8; 4] {
    let at = index as usize * 2;
    match palette.get(at..at + 2) {
        Some(pair) => rgba5551_to_rgba8(u16::from_be_bytes([pair[0], pair[1]])),
        None => [0, 0, 0, 0],
    }
}

impl TextureCodec for N64Codec {
    fn decode(
        &self,
        descriptor: &TextureDescriptor,
        raw: &[u8],
    ) -> Result<PixelBuffer, CodecError> {
        let (width, height) = (descriptor.width, descriptor.height);
        if width == 0 || height == 0 {
            return Err(CodecError::EmptyDimensions { width, height });
        }

        let format = descriptor.format;
        let embedded = format.embedded_palette_len();
        let needed = embedded + descriptor.texel_len();
        if raw.len() < needed {
            return Err(CodecError::ShortData {
                needed,
                available: raw.len(),
            });
        }

        let palette: &[u8] = match &descriptor.palette {
            Some(loaded) => loaded,
            None => &raw[..embedded],
        };
        let texels = &raw[embedded..needed];
        let count = width as usize * height as usize;
        let mut rgba = Vec::with_capacity(count * 4);

        for i in 0..count {
            let px = match format {
                TexelFormat::Rgba16 => {
                    rgba5551_to_rgba8(u16::from_be_bytes([texels[i * 2], texels[i * 2 + 1]]))
                }
                TexelFormat::Rgba32 => [
                    texels[i * 4],
                    texels[i * 4 + 1],
                    texels[i * 4 + 2],
                    texels[i * 4 + 3],
                ],
                TexelFormat::Ci4 => palette_color(palette, nibble(texels, i)),
                TexelFormat::Ci8 => palette_color(palette, texels[i]),
                TexelFormat::Ia4 => {
                    let n = nibble(texels, i);
                    let intensity = ((n >> 1) as u16 * 255 / 7) as u8;
                    [
                        intensity,
                        intensity,
                        intensity,
                        if n & 1 != 0 { 255 } else { 0 },
                    ]
                }
                TexelFormat::Ia8 => {
                    let intensity = (texels[i] >> 4) * 17;
                    [intensity, intensity, intensity, (texels[i] & 0x0F) * 17]
                }
                TexelFormat::Ia16 => {
                    let intensity = texels[i * 2];
                    [intensity, intensity, intensity, texels[i * 2 + 1]]
                }
                TexelFormat::I4 => {
                    let intensity = nibble(texels, i) * 17;
                    [intensity; 4]
                }
                TexelFormat::I8 => [texels[i]; 4],
            };
            rgba.extend_from_slice(&px);
        }

        Ok(PixelBuffer {
            width,
            height,
            rgba,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(format: TexelFormat, width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor::new(0, format, width, height)
    }

    #[test]
    fn test_rgba5551_white_and_clear() {
        assert_eq!(rgba5551_to_rgba8(0xFFFF), [255, 255, 255, 255]);
        assert_eq!(rgba5551_to_rgba8(0x0000), [0, 0, 0, 0]);
        // Pure red, opaque
        assert_eq!(rgba5551_to_rgba8(0xF801), [255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_rgba16() {
        let raw = [0xF8, 0x01, 0x07, 0xC1, 0x00, 0x3F, 0xFF, 0xFE];
        let px = N64Codec
            .decode(&descriptor(TexelFormat::Rgba16, 2, 2), &raw)
            .unwrap();
        assert_eq!(px.rgba.len(), 16);
        assert_eq!(&px.rgba[0..4], &[255, 0, 0, 255]);
        assert_eq!(&px.rgba[4..8], &[0, 255, 0, 255]);
        assert_eq!(&px.rgba[8..12], &[0, 0, 255, 255]);
        assert_eq!(&px.rgba[12..16], &[255, 255, 255, 0]);
    }

    #[test]
    fn test_decode_ci4_embedded_palette() {
        let mut raw = vec![0u8; 32];
        raw[2] = 0xF8; // palette[1] = red
        raw[3] = 0x01;
        raw.extend_from_slice(&[0x10, 0x01]);
        let px = N64Codec
            .decode(&descriptor(TexelFormat::Ci4, 2, 2), &raw)
            .unwrap();
        assert_eq!(&px.rgba[0..4], &[255, 0, 0, 255]);
        assert_eq!(&px.rgba[4..8], &[0, 0, 0, 0]);
        assert_eq!(&px.rgba[12..16], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_ci8_loaded_palette_wins() {
        let mut d = descriptor(TexelFormat::Ci8, 1, 1);
        d.palette = Some(vec![0xFF, 0xFF]);
        let mut raw = vec![0u8; 512];
        raw.push(0);
        let px = N64Codec.decode(&d, &raw).unwrap();
        assert_eq!(px.rgba, vec![255, 255, 255, 255]);
    }

    #[test]
    fn test_decode_ia8_and_i4() {
        let px = N64Codec
            .decode(&descriptor(TexelFormat::Ia8, 1, 1), &[0xF0])
            .unwrap();
        assert_eq!(px.rgba, vec![255, 255, 255, 0]);

        let px = N64Codec
            .decode(&descriptor(TexelFormat::I4, 2, 1), &[0x0F])
            .unwrap();
        assert_eq!(px.rgba, vec![0, 0, 0, 0, 255, 255, 255, 255]);
    }

    #[test]
    fn test_short_data() {
        let err = N64Codec
            .decode(&descriptor(TexelFormat::Rgba32, 4, 4), &[0; 10])
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::ShortData {
                needed: 64,
                available: 10
            }
        );
    }

    #[test]
    fn test_empty_dimensions() {
        let err = N64Codec
            .decode(&descriptor(TexelFormat::I8, 0, 4), &[])
            .unwrap_err();
        assert!(matches!(err, CodecError::EmptyDimensions { .. }));
    }
}
