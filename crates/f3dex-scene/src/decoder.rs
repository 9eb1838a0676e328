//! The display list state machine.
//!
//! Commands are consumed once, in order. Each opcode handler transforms an
//! explicit [`DecodeState`]; texture work is delegated to the
//! [`TextureResolver`] and triangles land in the [`BatchAccumulator`].

use crate::assembler;
use crate::batch::{compute_uv, Batch, BatchAccumulator, UvPool};
use crate::codec::TextureCodec;
use crate::command::{Command, Opcode};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::DecodeError;
use crate::resolver::{parse_tile, TextureResolver};
use crate::types::{
    DecodeConfig, Material, ModelData, Scene, TextureDescriptor, TileFormat, Vertex, WrapMode,
};
use crate::window::{SkippedSlot, VertexIndexWindow, MAX_START_SLOT};

/// Commands after a texture bind searched for its tile configuration.
const TILE_LOOKAHEAD: usize = 4;

/// Distance from a palette load to the command checked for the new-texture marker.
const PALETTE_MARKER_DISTANCE: usize = 4;

/// Palette byte size encoded in a palette command's word.
pub fn palette_size(width: u32) -> usize {
    (((width & 0x3F_FF00) >> 14) * 2 + 2) as usize
}

/// S and T texture coordinate scales encoded in a scale command's word.
pub fn texture_scales(width: u32) -> (f32, f32) {
    (
        (width >> 16) as f32 / 65536.0,
        (width & 0xFFFF) as f32 / 65536.0,
    )
}

/// Decoded fields of a load-indices command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadIndices {
    pub start: usize,
    pub count: usize,
    pub base: u32,
}

impl LoadIndices {
    pub fn from_command(command: &Command) -> Self {
        Self {
            start: ((command.byte(1) >> 1) as usize).min(MAX_START_SLOT),
            count: (command.byte(2) >> 2) as usize,
            base: (command.width() & 0x00FF_FFFF) / 16,
        }
    }
}

/// Material boundary taken by a load-indices command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Texture,
    Null,
}

/// Mutable decode state threaded through every opcode handler.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeState {
    pub active_texture: usize,
    pub pending_new_texture: bool,
    pub pending_null_material: bool,
    pub s_scale: f32,
    pub t_scale: f32,
    /// Clamp/wrap of the most recent tile configuration.
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    /// Incremented every time a boundary is taken; stamps window slots.
    pub epoch: u32,
    pub window: VertexIndexWindow,
}

impl Default for DecodeState {
    fn default() -> Self {
        Self {
            active_texture: 0,
            pending_new_texture: false,
            // Triangles drawn before any bind belong to the null material.
            pending_null_material: true,
            s_scale: 0.0,
            t_scale: 0.0,
            wrap_s: WrapMode::Wrap,
            wrap_t: WrapMode::Wrap,
            epoch: 0,
            window: VertexIndexWindow::new(),
        }
    }
}

impl DecodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty_material(&mut self) {
        self.pending_new_texture = false;
        self.pending_null_material = true;
    }

    pub fn texture_bound(&mut self, index: usize) {
        self.active_texture = index;
        self.pending_new_texture = true;
        self.pending_null_material = false;
    }

    pub fn set_scales(&mut self, width: u32) {
        (self.s_scale, self.t_scale) = texture_scales(width);
    }

    pub fn apply_tile(&mut self, tile: TileFormat) {
        self.wrap_s = WrapMode::from_cm_bits(tile.cms);
        self.wrap_t = WrapMode::from_cm_bits(tile.cmt);
    }

    /// Clear both pending flags, returning the boundary they asked for.
    ///
    /// A pending texture wins over a pending null material. Taking a boundary
    /// starts a new window epoch.
    pub fn take_boundary(&mut self) -> Option<Boundary> {
        let boundary = if self.pending_new_texture {
            Some(Boundary::Texture)
        } else if self.pending_null_material {
            Some(Boundary::Null)
        } else {
            None
        };
        self.pending_new_texture = false;
        self.pending_null_material = false;
        if boundary.is_some() {
            self.epoch += 1;
        }
        boundary
    }
}

/// Raw output of a decode pass, before re-indexing.
#[derive(Debug, Clone)]
pub struct DecodedBatches {
    pub batches: Vec<Batch>,
    pub uv_pool: UvPool,
    pub materials: Vec<Material>,
    pub textures: Vec<TextureDescriptor>,
    pub diagnostics: Diagnostics,
}

/// A finished scene plus the recoverable problems met on the way.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub scene: Scene,
    pub diagnostics: Diagnostics,
}

/// Walks a command list once and records per-material batches.
pub struct Decoder<'a> {
    vertices: &'a [Vertex],
    commands: &'a [Command],
    config: DecodeConfig,
    state: DecodeState,
    resolver: TextureResolver<'a>,
    batches: BatchAccumulator,
    diagnostics: Diagnostics,
}

impl<'a> Decoder<'a> {
    pub fn new(model: &'a ModelData, codec: &'a dyn TextureCodec, config: DecodeConfig) -> Self {
        Self {
            vertices: &model.vertices,
            commands: &model.commands,
            config,
            state: DecodeState::new(),
            resolver: TextureResolver::new(model.textures.clone(), &model.texture_data, codec),
            batches: BatchAccumulator::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Execute every command and return the recorded batches.
    pub fn run(mut self) -> Result<DecodedBatches, DecodeError> {
        let commands = self.commands;
        for (index, command) in commands.iter().enumerate() {
            if index >= self.config.max_commands {
                return Err(DecodeError::CommandLimitExceeded {
                    limit: self.config.max_commands,
                });
            }
            self.step(index, command)?;
        }

        let (batches, uv_pool) = self.batches.into_parts();
        let (materials, textures) = self.resolver.into_parts();
        log::info!(
            "Decoded {} commands into {} batches, {} materials",
            commands.len(),
            batches.len(),
            materials.len()
        );
        Ok(DecodedBatches {
            batches,
            uv_pool,
            materials,
            textures,
            diagnostics: self.diagnostics,
        })
    }

    /// Execute one command.
    pub fn step(&mut self, index: usize, command: &Command) -> Result<(), DecodeError> {
        let Some(opcode) = command.opcode() else {
            return Ok(());
        };

        match opcode {
            Opcode::EmptyMaterialStart => self.state.empty_material(),
            Opcode::GroupStart | Opcode::NewTexture => {}
            Opcode::TextureStart => self.texture_start(index, command),
            Opcode::TextureFormatAndSize => {
                let tile = parse_tile(command);
                self.state.apply_tile(tile);
                self.resolver.set_tile(self.state.active_texture, tile);
            }
            Opcode::TextureColorPalette => self.texture_palette(index, command),
            Opcode::TextureScale => self.state.set_scales(command.width()),
            Opcode::LoadIndices => self.load_indices(index, command),
            Opcode::TriangleFace => {
                let epoch = self.open_batch_epoch(index, opcode)?;
                self.emit_triangle(index, opcode, command.triangle_slots(), epoch)?;
            }
            Opcode::QuadFace => {
                let epoch = self.open_batch_epoch(index, opcode)?;
                for slots in command.quad_slots() {
                    self.emit_triangle(index, opcode, slots, epoch)?;
                }
            }
        }
        Ok(())
    }

    fn texture_start(&mut self, index: usize, command: &Command) {
        let tile = self
            .commands
            .iter()
            .skip(index + 1)
            .take(TILE_LOOKAHEAD)
            .find(|c| c.opcode() == Some(Opcode::TextureFormatAndSize))
            .map(parse_tile);
        if let Some(tile) = tile {
            self.state.apply_tile(tile);
        }

        let texture = self.resolver.bind(
            index,
            command,
            tile,
            self.state.s_scale,
            self.state.t_scale,
            &mut self.diagnostics,
        );
        self.state.texture_bound(texture);
    }

    fn texture_palette(&mut self, index: usize, command: &Command) {
        let size = palette_size(command.width());
        self.resolver.load_palette(
            index,
            self.state.active_texture,
            size,
            &mut self.diagnostics,
        );
        let marker = self.commands.get(index + PALETTE_MARKER_DISTANCE);
        if marker.and_then(Command::opcode) == Some(Opcode::NewTexture) {
            self.state.pending_new_texture = true;
        }
    }

    fn load_indices(&mut self, index: usize, command: &Command) {
        let load = LoadIndices::from_command(command);
        let boundary = self.state.take_boundary();

        let skipped = self.state.window.load(
            load.start,
            load.count,
            load.base,
            self.vertices.len(),
            self.state.epoch,
        );
        for skip in skipped {
            self.diagnostics.push(match skip {
                SkippedSlot::Overflow { slot, global } => Diagnostic::IndexOverflow {
                    command: index,
                    slot,
                    global,
                },
                SkippedSlot::OutOfWindow { slot } => Diagnostic::SlotOutOfWindow {
                    command: index,
                    slot,
                },
            });
        }

        let material = match boundary {
            None => return,
            Some(Boundary::Null) => Material::NULL_INDEX,
            Some(Boundary::Texture) => self
                .resolver
                .material_for(
                    self.state.active_texture,
                    self.state.wrap_s,
                    self.state.wrap_t,
                    &mut self.diagnostics,
                )
                .unwrap_or(Material::NULL_INDEX),
        };
        self.batches.open(material, self.state.epoch);
    }

    fn open_batch_epoch(&self, index: usize, opcode: Opcode) -> Result<u32, DecodeError> {
        self.batches
            .current()
            .map(|b| b.epoch)
            .ok_or(DecodeError::StrayFaceOpcode {
                command: index,
                opcode: opcode.byte(),
            })
    }

    /// Resolve a slot triple and append the triangle; drops it if any slot is unusable.
    fn emit_triangle(
        &mut self,
        index: usize,
        opcode: Opcode,
        slots: [usize; 3],
        epoch: u32,
    ) -> Result<(), DecodeError> {
        let mut globals = [0u32; 3];
        for (global, &slot) in globals.iter_mut().zip(&slots) {
            match self.state.window.resolve(slot, epoch) {
                Ok(g) => *global = g,
                Err(fault) => {
                    self.diagnostics.push(Diagnostic::UnresolvedSlot {
                        command: index,
                        slot,
                        fault,
                    });
                    return Ok(());
                }
            }
        }

        let (u_ratio, v_ratio) = self.resolver.ratios(self.state.active_texture);
        let uvs = globals.map(|g| compute_uv(&self.vertices[g as usize], u_ratio, v_ratio));
        self.batches
            .push_triangle(globals, uvs)
            .ok_or(DecodeError::StrayFaceOpcode {
                command: index,
                opcode: opcode.byte(),
            })
    }
}

/// Decode a model's display list and assemble the resulting scene.
pub fn decode_model(
    model: &ModelData,
    codec: &dyn TextureCodec,
    config: DecodeConfig,
) -> Result<Decoded, DecodeError> {
    let DecodedBatches {
        batches,
        uv_pool,
        materials,
        textures,
        mut diagnostics,
    } = Decoder::new(model, codec, config).run()?;

    let meshes = assembler::assemble(&batches, &uv_pool, &model.vertices, &mut diagnostics);
    let scene = Scene {
        materials,
        meshes,
        textures,
    };
    log::info!(
        "Assembled {} meshes, {} faces",
        scene.meshes.len(),
        scene.face_count()
    );
    Ok(Decoded { scene, diagnostics })
}
