//! Per-material triangle batches, recorded in global index space before
//! re-indexing.

use crate::types::Vertex;

/// Texture coordinates for one triangle corner, in normalized texture space.
///
/// The V axis is flipped to match the microcode's convention.
pub fn compute_uv(vertex: &Vertex, u_ratio: f32, v_ratio: f32) -> [f32; 2] {
    [vertex.uv[0] * u_ratio, vertex.uv[1] * v_ratio * -1.0]
}

/// Append-only pool of computed UVs, one per triangle corner.
#[derive(Debug, Clone, Default)]
pub struct UvPool {
    uvs: Vec<[f32; 2]>,
}

impl UvPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a UV and return its pool index.
    pub fn push(&mut self, uv: [f32; 2]) -> usize {
        self.uvs.push(uv);
        self.uvs.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<[f32; 2]> {
        self.uvs.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.uvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uvs.is_empty()
    }
}

/// Triangles sharing one material, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub material: usize,
    /// Window epoch this batch was opened in.
    pub epoch: u32,
    /// Global vertex index per triangle corner, 3 per triangle.
    pub positions: Vec<u32>,
    /// UV pool index per triangle corner, parallel to `positions`.
    pub uv_refs: Vec<usize>,
    pub min_index: Option<u32>,
    pub max_index: Option<u32>,
}

impl Batch {
    pub fn new(material: usize, epoch: u32) -> Self {
        Self {
            material,
            epoch,
            positions: Vec::new(),
            uv_refs: Vec::new(),
            min_index: None,
            max_index: None,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn push_corner(&mut self, global: u32, uv_ref: usize) {
        self.positions.push(global);
        self.uv_refs.push(uv_ref);
        self.min_index = Some(self.min_index.map_or(global, |m| m.min(global)));
        self.max_index = Some(self.max_index.map_or(global, |m| m.max(global)));
    }
}

/// Owns every batch of a decode pass plus the shared UV pool.
#[derive(Debug, Clone, Default)]
pub struct BatchAccumulator {
    batches: Vec<Batch>,
    uv_pool: UvPool,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new batch; it becomes the target of every following triangle.
    pub fn open(&mut self, material: usize, epoch: u32) -> usize {
        log::debug!(
            "Opening batch {} (material {}, epoch {})",
            self.batches.len(),
            material,
            epoch
        );
        self.batches.push(Batch::new(material, epoch));
        self.batches.len() - 1
    }

    pub fn current(&self) -> Option<&Batch> {
        self.batches.last()
    }

    /// Append one triangle to the current batch. Returns `None` if no batch is open.
    pub fn push_triangle(&mut self, globals: [u32; 3], uvs: [[f32; 2]; 3]) -> Option<()> {
        let batch = self.batches.last_mut()?;
        for (global, uv) in globals.into_iter().zip(uvs) {
            let uv_ref = self.uv_pool.push(uv);
            batch.push_corner(global, uv_ref);
        }
        Some(())
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn uv_pool(&self) -> &UvPool {
        &self.uv_pool
    }

    pub fn into_parts(self) -> (Vec<Batch>, UvPool) {
        (self.batches, self.uv_pool)
    }
}
