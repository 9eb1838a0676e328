/// Error types for loading, decoding and export.
pub mod error;

/// Core data types: vertices, textures, materials, meshes, configuration.
pub mod types;

/// Display list command records and opcodes.
pub mod command;

/// Recoverable decode problems.
pub mod diagnostics;

/// The 32-slot vertex index window.
pub mod window;

/// Model binary parsing.
pub mod loader;

/// Texel format decoding.
pub mod codec;

/// Texture selection and material creation.
pub mod resolver;

/// Per-material triangle batches.
pub mod batch;

/// The display list state machine.
pub mod decoder;

/// Batch re-indexing into meshes.
pub mod assembler;

/// Scene export.
pub mod writer;

pub use decoder::{decode_model, Decoded};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{CodecError, ConvertError, DecodeError, ExportError, LoadError};
pub use types::{ConversionReport, ConvertConfig, DecodeConfig, Material, Mesh, ModelData, Scene};

use codec::N64Codec;

/// Load, decode and export one model as described by `config`.
pub fn convert_model(config: &ConvertConfig) -> Result<ConversionReport, ConvertError> {
    log::info!("Converting model: {}", config.input.display());
    let model = loader::load_model_file(&config.input)?;
    let Decoded { scene, diagnostics } = decode_model(&model, &N64Codec, config.decode_config())?;

    if diagnostics.has_recoverable_errors() {
        log::warn!(
            "{} recoverable problems while decoding {}",
            diagnostics.len(),
            config.input.display()
        );
    }

    let written = writer::write_scene(&scene, &config.output, config.write_textures)?;

    Ok(ConversionReport {
        mesh_count: scene.meshes.len(),
        face_count: scene.face_count(),
        material_count: scene.materials.len(),
        written,
        diagnostics,
    })
}

/// Load and decode a model without exporting it.
pub fn inspect_model(
    input: &std::path::Path,
    config: DecodeConfig,
) -> Result<(ModelData, Decoded), ConvertError> {
    let model = loader::load_model_file(input)?;
    let decoded = decode_model(&model, &N64Codec, config)?;
    Ok((model, decoded))
}
