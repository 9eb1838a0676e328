//! Re-indexes batches into independent meshes with compact local arrays.

use crate::batch::{Batch, UvPool};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{Mesh, Vertex};

/// Index offset of every batch: 0 for the first, then the previous batch's
/// maximum global index + 1.
///
/// An empty batch has no maximum and passes its own offset on unchanged.
pub fn index_offsets(batches: &[Batch]) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(batches.len());
    let mut next = 0u32;
    for batch in batches {
        offsets.push(next);
        if let Some(max) = batch.max_index {
            next = max + 1;
        }
    }
    offsets
}

/// Build one mesh per non-empty batch, in batch order.
pub fn assemble(
    batches: &[Batch],
    uv_pool: &UvPool,
    vertices: &[Vertex],
    diagnostics: &mut Diagnostics,
) -> Vec<Mesh> {
    let offsets = index_offsets(batches);
    let mut meshes = Vec::with_capacity(batches.len());

    for (batch_index, (batch, &offset)) in batches.iter().zip(&offsets).enumerate() {
        let Some(min_index) = batch.min_index else {
            log::debug!("Batch {} has no triangles, skipped", batch_index);
            continue;
        };

        let offset = if min_index < offset {
            diagnostics.push(Diagnostic::NonMonotonicBatch {
                batch: batch_index,
                min_index,
                offset,
            });
            min_index
        } else {
            offset
        };

        meshes.push(assemble_batch(batch, offset, uv_pool, vertices));
    }

    meshes
}

/// Re-index one batch so that global index `offset` becomes local index 0.
///
/// Each local slot takes its position, color and UV from the first triangle
/// corner that visits it. Slots between visited ones are filled from the
/// global vertex with a zero UV so every face index stays in range.
pub fn assemble_batch(batch: &Batch, offset: u32, uv_pool: &UvPool, vertices: &[Vertex]) -> Mesh {
    let (Some(min_index), Some(max_index)) = (batch.min_index, batch.max_index) else {
        return Mesh {
            material: batch.material,
            index_offset: offset,
            ..Mesh::default()
        };
    };
    let offset = offset.min(min_index);
    let len = (max_index - offset + 1) as usize;

    let mut positions = vec![[0.0; 3]; len];
    let mut colors = vec![[0.0; 4]; len];
    let mut uvs = vec![[0.0; 2]; len];
    let mut visited = vec![false; len];

    for (&global, &uv_ref) in batch.positions.iter().zip(&batch.uv_refs) {
        let local = (global - offset) as usize;
        if visited[local] {
            continue;
        }
        visited[local] = true;
        let vertex = vertices.get(global as usize).copied().unwrap_or_default();
        positions[local] = vertex.position;
        colors[local] = vertex.color;
        uvs[local] = uv_pool.get(uv_ref).unwrap_or([0.0; 2]);
    }

    for (local, &seen) in visited.iter().enumerate() {
        if seen {
            continue;
        }
        let vertex = vertices
            .get(offset as usize + local)
            .copied()
            .unwrap_or_default();
        positions[local] = vertex.position;
        colors[local] = vertex.color;
    }

    let faces = batch
        .positions
        .chunks_exact(3)
        .map(|tri| [tri[0] - offset, tri[1] - offset, tri[2] - offset])
        .collect();

    Mesh {
        material: batch.material,
        index_offset: offset,
        positions,
        colors,
        uvs,
        faces,
    }
}
