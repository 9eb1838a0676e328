use clap::{Parser, Subcommand};
use f3dex_scene::types::DEFAULT_MAX_COMMANDS;
use f3dex_scene::{ConversionReport, ConvertConfig, DecodeConfig, DiagnosticKind};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "f3dex-scene")]
#[command(about = "Decode F3DEX display lists from model binaries into 3D scenes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress progress output (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a model binary to an interchange file
    Convert {
        /// Input model binary
        input: PathBuf,

        /// Output file; the extension selects the format
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum display list commands to execute
        #[arg(long, default_value_t = DEFAULT_MAX_COMMANDS)]
        max_commands: usize,

        /// Do not write decoded textures
        #[arg(long)]
        no_textures: bool,
    },
    /// Decode a model binary and print a summary
    Inspect {
        /// Input model binary
        input: PathBuf,

        /// Maximum display list commands to execute
        #[arg(long, default_value_t = DEFAULT_MAX_COMMANDS)]
        max_commands: usize,
    },
}

/// Lines printed after a successful conversion.
fn convert_summary(report: &ConversionReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Success: {} meshes, {} faces, {} materials, {} files written",
        report.mesh_count,
        report.face_count,
        report.material_count,
        report.written.len()
    )];
    if report.diagnostics.has_recoverable_errors() {
        lines.push(format!(
            "Warning: {} recoverable problems, see the warnings above",
            report.diagnostics.len()
        ));
    }
    lines
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging (suppressed if --quiet)
    if !cli.quiet {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            max_commands,
            no_textures,
        } => {
            let config = ConvertConfig {
                max_commands,
                write_textures: !no_textures,
                ..ConvertConfig::new(input, output)
            };
            f3dex_scene::convert_model(&config).map(|report| {
                if !cli.quiet {
                    for line in convert_summary(&report) {
                        eprintln!("{}", line);
                    }
                }
            })
        }
        Commands::Inspect {
            input,
            max_commands,
        } => f3dex_scene::inspect_model(&input, DecodeConfig { max_commands }).map(
            |(model, decoded)| {
                let scene = &decoded.scene;
                let diags = &decoded.diagnostics;
                println!("Model:       {}", input.display());
                println!("Vertices:    {}", model.vertices.len());
                println!("Textures:    {}", model.textures.len());
                println!("Commands:    {}", model.commands.len());
                println!("Materials:   {}", scene.materials.len());
                println!("Meshes:      {}", scene.meshes.len());
                println!("Faces:       {}", scene.face_count());
                println!("Diagnostics: {}", diags.len());
                for kind in [
                    DiagnosticKind::IndexOverflow,
                    DiagnosticKind::SlotOutOfWindow,
                    DiagnosticKind::UnresolvedSlot,
                    DiagnosticKind::NonMonotonicBatch,
                    DiagnosticKind::PaletteOutOfRange,
                    DiagnosticKind::UnknownTexture,
                    DiagnosticKind::TextureDecode,
                ] {
                    let count = diags.count(kind);
                    if count > 0 {
                        println!("  {:?}: {}", kind, count);
                    }
                }
            },
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use f3dex_scene::{Diagnostic, Diagnostics};

    fn report(diagnostics: Diagnostics) -> ConversionReport {
        ConversionReport {
            mesh_count: 2,
            face_count: 5,
            material_count: 3,
            written: vec!["scene.mtl".into(), "scene.obj".into()],
            diagnostics,
        }
    }

    #[test]
    fn test_summary_without_problems() {
        let lines = convert_summary(&report(Diagnostics::new()));
        assert_eq!(
            lines,
            vec!["Success: 2 meshes, 5 faces, 3 materials, 2 files written"]
        );
    }

    #[test]
    fn test_summary_points_at_logged_warnings() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::SlotOutOfWindow {
            command: 0,
            slot: 40,
        });
        let lines = convert_summary(&report(diagnostics));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "Warning: 1 recoverable problems, see the warnings above");
        assert!(!lines[1].contains("RUST_LOG"));
    }
}
