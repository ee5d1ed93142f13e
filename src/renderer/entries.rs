use glam::Mat4;

use crate::gpu::GeometryHandle;
use crate::scene::{MaterialId, MeshKind};

/// Inverse-transpose of the model matrix, computed once per mesh visit so
/// non-uniform scale does not skew shaded normals.
pub fn normal_matrix(model: &Mat4) -> Mat4 {
    model.inverse().transpose()
}

/// Transient per-visit record, pool-backed and frame-scoped.
///
/// Only populated when helper visualization needs per-mesh records after
/// batching; keyed by mesh_id in the renderer's scratch map.
#[derive(Debug, Clone)]
pub struct MeshRenderEntry {
    pub mesh_id: u32,
    pub geometry: Option<GeometryHandle>,
    pub kind: MeshKind,
    pub model_matrix: Mat4,
    pub normal_matrix: Mat4,
}

impl Default for MeshRenderEntry {
    fn default() -> Self {
        Self {
            mesh_id: 0,
            geometry: None,
            kind: MeshKind::Regular,
            model_matrix: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
        }
    }
}

/// Mesh kinds that flow through material batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchedKind {
    Regular,
    GpuStream,
}

/// One mesh layer in a material batch: everything a draw needs once the
/// batch's program is bound. Pool-backed, drained after rendering.
#[derive(Debug, Clone)]
pub struct MeshMaterialItem {
    pub mesh_id: u32,
    pub geometry: GeometryHandle,
    pub material: MaterialId,
    pub model_matrix: Mat4,
    pub normal_matrix: Mat4,
    pub kind: BatchedKind,
}
