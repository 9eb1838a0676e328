use std::path::PathBuf;

/// Errors raised while reading a model binary. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// I/O error reading the model file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blob does not start with the model magic word.
    #[error("Bad model magic: expected 0x0000000B, found {found:#010X}")]
    BadMagic { found: u32 },

    /// A region (header, setup block, command list...) runs past the end of the blob.
    #[error("{region} region at {offset:#X} (+{len} bytes) exceeds blob length {blob_len}")]
    OutOfBounds {
        region: &'static str,
        offset: usize,
        len: usize,
        blob_len: usize,
    },

    /// A region marker or count contradicts another one.
    #[error("Inconsistent model layout: {0}")]
    Inconsistent(String),
}

/// Fatal errors raised by the display list decoder.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A triangle or quad opcode appeared before any batch was opened.
    #[error("Face opcode {opcode} at command {command} with no open batch")]
    StrayFaceOpcode { command: usize, opcode: u8 },

    /// The stream did not finish within the configured command budget.
    #[error("Command limit of {limit} exceeded")]
    CommandLimitExceeded { limit: usize },
}

/// Errors raised by a texture codec. Recorded as diagnostics, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The texture data (or palette) is shorter than its dimensions require.
    #[error("Texture data too short: need {needed} bytes, have {available}")]
    ShortData { needed: usize, available: usize },

    /// Width or height is zero.
    #[error("Texture has empty dimensions {width}×{height}")]
    EmptyDimensions { width: u32, height: u32 },
}

/// Errors raised while writing a scene to disk.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// I/O error writing output files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output path's extension does not name a supported format.
    #[error("Unsupported output format for {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Failed to encode a texture image.
    #[error("Image encode error for {path}: {message}")]
    ImageEncode { path: PathBuf, message: String },
}

/// Errors from the full load → decode → export pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
