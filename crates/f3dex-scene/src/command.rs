//! Fixed-width display list records and the opcodes the decoder acts on.

/// Size in bytes of one display list command.
pub const COMMAND_SIZE: usize = 8;

/// Opcodes with a meaning to the decoder. Anything else is skipped.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Load consecutive global vertex indices into the vertex window.
    LoadIndices = 4,
    /// Structural marker (nested display list call).
    GroupStart = 6,
    /// Two triangles from two slot triples.
    QuadFace = 177,
    /// Material boundary with no texture bound.
    EmptyMaterialStart = 182,
    /// Marker looked for after a palette load.
    NewTexture = 186,
    /// S/T texture coordinate scale.
    TextureScale = 187,
    /// One triangle from a slot triple.
    TriangleFace = 191,
    /// Palette load.
    TextureColorPalette = 240,
    /// Tile format, size and clamp/wrap bits.
    TextureFormatAndSize = 245,
    /// Texture image address (texture bind).
    TextureStart = 253,
}

impl Opcode {
    /// Decode an opcode byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            4 => Some(Self::LoadIndices),
            6 => Some(Self::GroupStart),
            177 => Some(Self::QuadFace),
            182 => Some(Self::EmptyMaterialStart),
            186 => Some(Self::NewTexture),
            187 => Some(Self::TextureScale),
            191 => Some(Self::TriangleFace),
            240 => Some(Self::TextureColorPalette),
            245 => Some(Self::TextureFormatAndSize),
            253 => Some(Self::TextureStart),
            _ => None,
        }
    }

    /// The opcode byte.
    #[must_use]
    pub const fn byte(&self) -> u8 {
        *self as u8
    }
}

/// One 8-byte display list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Command(pub [u8; COMMAND_SIZE]);

impl Command {
    pub const fn new(bytes: [u8; COMMAND_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build a command from an opcode and the 32-bit word in bytes 4..8.
    pub const fn with_width(opcode: u8, b1: u8, b2: u8, b3: u8, width: u32) -> Self {
        let w = width.to_be_bytes();
        Self([opcode, b1, b2, b3, w[0], w[1], w[2], w[3]])
    }

    /// Raw opcode byte.
    pub const fn opcode_byte(&self) -> u8 {
        self.0[0]
    }

    pub const fn opcode(&self) -> Option<Opcode> {
        Opcode::from_byte(self.0[0])
    }

    pub const fn byte(&self, index: usize) -> u8 {
        self.0[index]
    }

    /// Big-endian word packed from bytes 4..8.
    pub const fn width(&self) -> u32 {
        u32::from_be_bytes([self.0[4], self.0[5], self.0[6], self.0[7]])
    }

    /// Local slot numbers of a triangle command (bytes 5, 6, 7 halved).
    pub const fn triangle_slots(&self) -> [usize; 3] {
        [
            (self.0[5] / 2) as usize,
            (self.0[6] / 2) as usize,
            (self.0[7] / 2) as usize,
        ]
    }

    /// Local slot numbers of a quad command: bytes 1..4 halved, then bytes 5..8 halved.
    pub const fn quad_slots(&self) -> [[usize; 3]; 2] {
        [
            [
                (self.0[1] / 2) as usize,
                (self.0[2] / 2) as usize,
                (self.0[3] / 2) as usize,
            ],
            self.triangle_slots(),
        ]
    }
}

/// Split a byte slice into commands, ignoring a trailing partial record.
pub fn parse_commands(bytes: &[u8]) -> Vec<Command> {
    bytes
        .chunks_exact(COMMAND_SIZE)
        .map(|chunk| {
            let mut record = [0u8; COMMAND_SIZE];
            record.copy_from_slice(chunk);
            Command(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_round_trip() {
        for byte in 0..=255u8 {
            if let Some(op) = Opcode::from_byte(byte) {
                assert_eq!(op.byte(), byte);
            }
        }
        assert_eq!(Opcode::from_byte(253), Some(Opcode::TextureStart));
        assert_eq!(Opcode::from_byte(0), None);
    }

    #[test]
    fn test_width_is_big_endian() {
        let cmd = Command::new([0xBB, 0, 0, 0, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(cmd.width(), 0x1234_5678);
    }

    #[test]
    fn test_triangle_slots_halved() {
        let cmd = Command::new([191, 0, 0, 0, 0, 0x02, 0x04, 0x3E]);
        assert_eq!(cmd.triangle_slots(), [1, 2, 31]);
    }

    #[test]
    fn test_quad_slots() {
        let cmd = Command::new([177, 0x00, 0x02, 0x04, 0x00, 0x04, 0x06, 0x00]);
        assert_eq!(cmd.quad_slots(), [[0, 1, 2], [2, 3, 0]]);
    }

    #[test]
    fn test_parse_commands_drops_partial_record() {
        let bytes = [4u8, 0, 0, 0, 0, 0, 0, 0, 191, 1, 2];
        let cmds = parse_commands(&bytes);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].opcode(), Some(Opcode::LoadIndices));
    }
}
