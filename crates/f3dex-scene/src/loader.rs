//! Reads the vertex store, texture setup and display list out of a model binary.
//!
//! All multi-byte fields are big-endian. Every region is bounds-checked before
//! it is read; a malformed blob is rejected before any decoding starts.

use crate::command::{parse_commands, Command, COMMAND_SIZE};
use crate::error::LoadError;
use crate::types::{ModelData, TexelFormat, TextureDescriptor, Vertex};
use std::fs;
use std::path::Path;

/// First word of every model binary.
pub const MODEL_MAGIC: u32 = 0x0000_000B;

/// Header bytes that must exist for the offsets below to be readable.
pub const HEADER_LEN: usize = 0x20;

const TEXTURE_SETUP_OFFSET: usize = 0x08;
const DISPLAY_LIST_SETUP_OFFSET: usize = 0x0C;
const VERTEX_SETUP_OFFSET: usize = 0x10;
const COLLISION_SETUP_OFFSET: usize = 0x1C;

const TEXTURE_SETUP_HEADER_LEN: usize = 8;
const TEXTURE_HEADER_LEN: usize = 16;
const DISPLAY_LIST_HEADER_LEN: usize = 8;
const VERTEX_SETUP_HEADER_LEN: usize = 0x18;
const VERTEX_COUNT_OFFSET: usize = 0x16;
const VERTEX_LEN: usize = 16;

/// Borrow `len` bytes at `offset`, or fail naming the region.
fn region<'a>(
    bytes: &'a [u8],
    offset: usize,
    len: usize,
    name: &'static str,
) -> Result<&'a [u8], LoadError> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(LoadError::OutOfBounds {
            region: name,
            offset,
            len,
            blob_len: bytes.len(),
        })
}

fn read_u16(bytes: &[u8], offset: usize, name: &'static str) -> Result<u16, LoadError> {
    let b = region(bytes, offset, 2, name)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], offset: usize, name: &'static str) -> Result<u32, LoadError> {
    let b = region(bytes, offset, 4, name)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_i16(bytes: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

/// Read a model file from disk and parse it.
pub fn load_model_file(path: &Path) -> Result<ModelData, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Read {} bytes from {}", bytes.len(), path.display());
    load_model(&bytes)
}

/// Parse a model binary into vertices, texture descriptors and commands.
pub fn load_model(bytes: &[u8]) -> Result<ModelData, LoadError> {
    let magic = read_u32(bytes, 0, "header")?;
    if magic != MODEL_MAGIC {
        return Err(LoadError::BadMagic { found: magic });
    }
    region(bytes, 0, HEADER_LEN, "header")?;

    let texture_setup = read_u16(bytes, TEXTURE_SETUP_OFFSET, "header")? as usize;
    let display_list_setup = read_u32(bytes, DISPLAY_LIST_SETUP_OFFSET, "header")? as usize;
    let vertex_setup = read_u32(bytes, VERTEX_SETUP_OFFSET, "header")? as usize;
    let collision_setup = read_u32(bytes, COLLISION_SETUP_OFFSET, "header")? as usize;

    if display_list_setup == 0 {
        return Err(LoadError::Inconsistent(
            "model has no display list setup".to_string(),
        ));
    }
    if vertex_setup == 0 {
        return Err(LoadError::Inconsistent(
            "model has no vertex store setup".to_string(),
        ));
    }

    let (textures, texture_data) = if texture_setup == 0 {
        (Vec::new(), Vec::new())
    } else {
        load_textures(bytes, texture_setup)?
    };
    let commands = load_commands(bytes, display_list_setup, collision_setup)?;
    let vertices = load_vertices(bytes, vertex_setup)?;

    log::info!(
        "Model: {} vertices, {} textures, {} commands",
        vertices.len(),
        textures.len(),
        commands.len()
    );

    Ok(ModelData {
        vertices,
        textures,
        commands,
        texture_data,
    })
}

fn load_textures(
    bytes: &[u8],
    setup: usize,
) -> Result<(Vec<TextureDescriptor>, Vec<u8>), LoadError> {
    let data_size = read_u32(bytes, setup, "texture setup")? as usize;
    let count = read_u16(bytes, setup + 4, "texture setup")? as usize;

    let headers_start = setup + TEXTURE_SETUP_HEADER_LEN;
    let headers = region(
        bytes,
        headers_start,
        count * TEXTURE_HEADER_LEN,
        "texture headers",
    )?;
    let data = region(
        bytes,
        headers_start + headers.len(),
        data_size,
        "texture data",
    )?;

    let mut textures = Vec::with_capacity(count);
    for (i, header) in headers.chunks_exact(TEXTURE_HEADER_LEN).enumerate() {
        let offset = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let code = u16::from_be_bytes([header[4], header[5]]);
        let format = TexelFormat::from_model_code(code).ok_or_else(|| {
            LoadError::Inconsistent(format!(
                "texture {} has unknown format code {:#X}",
                i, code
            ))
        })?;
        if offset as usize > data_size {
            return Err(LoadError::Inconsistent(format!(
                "texture {} offset {:#X} is past texture data ({} bytes)",
                i, offset, data_size
            )));
        }
        let width = header[8] as u32;
        let height = header[9] as u32;
        log::debug!(
            "Texture {}: {:?} {}×{} at {:#X}",
            i,
            format,
            width,
            height,
            offset
        );
        textures.push(TextureDescriptor::new(offset, format, width, height));
    }

    Ok((textures, data.to_vec()))
}

fn load_commands(
    bytes: &[u8],
    setup: usize,
    collision_setup: usize,
) -> Result<Vec<Command>, LoadError> {
    let count = read_u32(bytes, setup, "display list setup")? as usize;
    let start = setup + DISPLAY_LIST_HEADER_LEN;
    let len = count
        .checked_mul(COMMAND_SIZE)
        .ok_or_else(|| LoadError::Inconsistent(format!("command count {} overflows", count)))?;
    let list = region(bytes, start, len, "display list")?;

    if collision_setup != 0 && setup < collision_setup && start + len > collision_setup {
        return Err(LoadError::Inconsistent(format!(
            "display list ({} commands at {:#X}) overlaps collision setup at {:#X}",
            count, start, collision_setup
        )));
    }

    Ok(parse_commands(list))
}

fn load_vertices(bytes: &[u8], setup: usize) -> Result<Vec<Vertex>, LoadError> {
    region(bytes, setup, VERTEX_SETUP_HEADER_LEN, "vertex store setup")?;
    let count = read_u16(bytes, setup + VERTEX_COUNT_OFFSET, "vertex store setup")? as usize;
    let store = region(
        bytes,
        setup + VERTEX_SETUP_HEADER_LEN,
        count * VERTEX_LEN,
        "vertex store",
    )?;

    Ok(store
        .chunks_exact(VERTEX_LEN)
        .map(|v| Vertex {
            position: [
                read_i16(v, 0) as f32,
                read_i16(v, 2) as f32,
                read_i16(v, 4) as f32,
            ],
            uv: [read_i16(v, 8) as f32, read_i16(v, 10) as f32],
            color: [v[12] as f32, v[13] as f32, v[14] as f32, v[15] as f32],
        })
        .collect())
}
