use std::any::Any;
use std::sync::Arc;

use glam::Mat4;

use super::bounds::Aabb;
use crate::gpu::{Device, GeometryHandle};

pub type MaterialId = u32;

/// Which phase of the frame a custom callback is being invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStage {
    DepthOnly,
    Shaded,
    Diagnostic,
}

/// Context handed to a custom mesh's render callback, once per pass.
pub struct CustomDraw<'a> {
    pub mesh_id: u32,
    pub model_matrix: Mat4,
    pub stage: DrawStage,
    pub user: &'a (dyn Any + Send + Sync),
}

pub type CustomRenderFn = fn(&mut dyn Device, &CustomDraw<'_>);

/// Closed set of mesh kinds the renderer distinguishes.
///
/// Regular and GpuStream meshes flow through material batching; Custom
/// meshes bypass it entirely and draw through their registered callback.
#[derive(Clone)]
pub enum MeshKind {
    Regular,
    GpuStream,
    Custom {
        callback: CustomRenderFn,
        user: Arc<dyn Any + Send + Sync>,
    },
}

impl MeshKind {
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

impl std::fmt::Debug for MeshKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regular => f.write_str("Regular"),
            Self::GpuStream => f.write_str("GpuStream"),
            Self::Custom { .. } => f.write_str("Custom"),
        }
    }
}

/// One mesh instance in the scene's instance table.
///
/// `mesh_id` is the stable index into that table. GPU-instanced copies point
/// at an instancing parent that owns the actual vertex data and model-space
/// bounds; an instance with no parent is its own parent.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub mesh_id: u32,
    pub kind: MeshKind,
    pub geometry: Option<GeometryHandle>,
    /// Model-space bounds; culled after transform by the instance's model
    /// matrix. Instanced copies use the parent's bounds.
    pub bounds: Aabb,
    pub instancing_parent: Option<u32>,
    pub materials: Vec<MaterialId>,
    pub visible: bool,
    pub casts_shadows: bool,
    pub receives_shadows: bool,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl MeshInstance {
    pub fn new(mesh_id: u32, bounds: Aabb, materials: Vec<MaterialId>) -> Self {
        Self {
            mesh_id,
            kind: MeshKind::Regular,
            geometry: None,
            bounds,
            instancing_parent: None,
            materials,
            visible: true,
            casts_shadows: true,
            receives_shadows: true,
            vertex_count: 0,
            index_count: 0,
        }
    }

    pub fn with_kind(mut self, kind: MeshKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_geometry(mut self, geometry: GeometryHandle) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_instancing_parent(mut self, parent_id: u32) -> Self {
        self.instancing_parent = Some(parent_id);
        self
    }

    pub fn with_counts(mut self, vertex_count: u32, index_count: u32) -> Self {
        self.vertex_count = vertex_count;
        self.index_count = index_count;
        self
    }
}
