//! Scene export. The output path's extension selects the format.

use crate::error::ExportError;
use crate::types::{Material, Scene, WrapMode};
use std::fs;
use std::path::{Path, PathBuf};

/// Interchange formats the writer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Wavefront OBJ with an MTL library and PNG textures.
    Obj,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("obj") => Ok(Self::Obj),
            _ => Err(ExportError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Writes a scene to a target path.
pub trait SceneWriter {
    /// Write `scene` to `path`, returning every file produced.
    fn write(&self, scene: &Scene, path: &Path) -> Result<Vec<PathBuf>, ExportError>;
}

/// Write `scene` in the format named by `path`'s extension.
pub fn write_scene(
    scene: &Scene,
    path: &Path,
    write_textures: bool,
) -> Result<Vec<PathBuf>, ExportError> {
    match ExportFormat::from_path(path)? {
        ExportFormat::Obj => ObjWriter { write_textures }.write(scene, path),
    }
}

/// Wavefront OBJ + MTL writer.
#[derive(Debug, Clone, Copy)]
pub struct ObjWriter {
    /// Also write each decoded texture as a PNG referenced by the MTL file.
    pub write_textures: bool,
}

impl Default for ObjWriter {
    fn default() -> Self {
        Self {
            write_textures: true,
        }
    }
}

/// File name of a texture image written next to `stem`.
fn texture_file_name(stem: &str, texture: usize) -> String {
    format!("{}_tex_{:04}.png", stem, texture)
}

impl ObjWriter {
    /// Render the OBJ body; faces are 1-based and offset by the running vertex count.
    pub fn obj_source(&self, scene: &Scene, mtl_name: &str) -> String {
        let mut out = format!(
            "# Meshes: {}, Faces: {}\nmtllib {}\n",
            scene.meshes.len(),
            scene.face_count(),
            mtl_name
        );
        let mut base = 1usize;

        for (i, mesh) in scene.meshes.iter().enumerate() {
            let material = scene
                .materials
                .get(mesh.material)
                .map_or("NullMaterial", |m| m.name.as_str());
            out.push_str(&format!("o mesh_{:04}\nusemtl {}\n", i, material));

            for (p, c) in mesh.positions.iter().zip(&mesh.colors) {
                out.push_str(&format!(
                    "v {} {} {} {} {} {}\n",
                    p[0],
                    p[1],
                    p[2],
                    c[0] / 255.0,
                    c[1] / 255.0,
                    c[2] / 255.0
                ));
            }
            for uv in &mesh.uvs {
                out.push_str(&format!("vt {} {}\n", uv[0], uv[1]));
            }
            for face in &mesh.faces {
                let [a, b, c] = face.map(|i| i as usize + base);
                out.push_str(&format!("f {a}/{a} {b}/{b} {c}/{c}\n"));
            }
            base += mesh.vertex_count();
        }

        out
    }

    /// Render the MTL body. `textures` names the image file of each material, if any.
    pub fn mtl_source(&self, materials: &[Material], textures: &[Option<String>]) -> String {
        let mut out = format!("# Materials: {}\n", materials.len());
        for (material, image) in materials.iter().zip(textures) {
            out.push_str(&format!("\nnewmtl {}\nKd 1.0 1.0 1.0\n", material.name));
            if let Some(image) = image {
                let clamp = material.wrap_s == WrapMode::Clamp && material.wrap_t == WrapMode::Clamp;
                if clamp {
                    out.push_str(&format!("map_Kd -clamp on {}\n", image));
                } else {
                    out.push_str(&format!("map_Kd {}\n", image));
                }
            }
        }
        out
    }
}

impl SceneWriter for ObjWriter {
    fn write(&self, scene: &Scene, path: &Path) -> Result<Vec<PathBuf>, ExportError> {
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scene")
            .to_string();
        let mtl_name = format!("{}.mtl", stem);
        let mut written = Vec::new();

        let mut images = Vec::with_capacity(scene.materials.len());
        for material in &scene.materials {
            let pixels = material
                .texture
                .and_then(|t| scene.textures.get(t).map(|d| (t, d)))
                .and_then(|(t, d)| d.pixels.as_ref().map(|p| (t, p)));
            let image = match pixels {
                Some((texture, pixels)) if self.write_textures => {
                    let name = texture_file_name(&stem, texture);
                    let image_path = dir.join(&name);
                    image::save_buffer(
                        &image_path,
                        &pixels.rgba,
                        pixels.width,
                        pixels.height,
                        image::ColorType::Rgba8,
                    )
                    .map_err(|e| ExportError::ImageEncode {
                        path: image_path.clone(),
                        message: e.to_string(),
                    })?;
                    log::info!("Wrote texture {}", image_path.display());
                    written.push(image_path);
                    Some(name)
                }
                _ => None,
            };
            images.push(image);
        }

        let mtl_path = dir.join(&mtl_name);
        fs::write(&mtl_path, self.mtl_source(&scene.materials, &images))?;
        written.push(mtl_path);

        fs::write(path, self.obj_source(scene, &mtl_name))?;
        log::info!(
            "Wrote {} ({} meshes, {} faces)",
            path.display(),
            scene.meshes.len(),
            scene.face_count()
        );
        written.push(path.to_path_buf());

        Ok(written)
    }
}
