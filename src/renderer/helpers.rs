use glam::Mat4;

use crate::gpu::{
    DepthFunc, DepthState, Device, GeometryDesc, ProgramDesc, ProgramHandle, GeometryHandle,
    CAMERA_UNIFORM_SLOT, OBJECT_UNIFORM_SLOT,
};
use crate::materials::MaterialRegistry;
use crate::renderer::entries::MeshRenderEntry;
use crate::renderer::renderer::FrameStats;
use crate::renderer::uniforms::{CameraUniform, ObjectUniform};
use crate::scene::{LightKind, Scene};

const HELPER_DEPTH: DepthState = DepthState {
    test: true,
    write: false,
    func: DepthFunc::Less,
};

struct GizmoResources {
    program: ProgramHandle,
    geometry: GeometryHandle,
}

fn build_gizmo(device: &mut dyn Device, label: &str) -> Option<GizmoResources> {
    let program = device.create_program(&ProgramDesc {
        label: label.to_string(),
    });
    if !device.link_program(program) {
        log::warn!("helper program '{}' failed to link", label);
        return None;
    }
    // Wireframe unit cube: 8 corners, 12 edges.
    let geometry = device.create_geometry(&GeometryDesc {
        label: format!("{label}_cube"),
        vertex_count: 8,
        index_count: 24,
    });
    Some(GizmoResources { program, geometry })
}

/// Debug-visualization sub-renderers: bounding boxes, normals, camera
/// frustums and light markers. Each is built on first use and owns its own
/// program and geometry; none of them touch the material batches.
#[derive(Default)]
pub struct HelperRenderers {
    bbox: Option<GizmoResources>,
    frustum: Option<GizmoResources>,
    light_gizmos: Option<GizmoResources>,
}

impl HelperRenderers {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn draw_bounding_boxes(
        &mut self,
        device: &mut dyn Device,
        scene: &Scene,
        camera: &CameraUniform,
        entries: &[&MeshRenderEntry],
        stats: &mut FrameStats,
    ) {
        if self.bbox.is_none() {
            self.bbox = build_gizmo(device, "bbox_preview");
        }
        let Some(gizmo) = &self.bbox else { return };

        device.set_color_writes(true);
        device.set_depth_state(HELPER_DEPTH);
        device.bind_program(gizmo.program);
        device.upload_uniforms(CAMERA_UNIFORM_SLOT, bytemuck::bytes_of(camera));

        for entry in entries {
            let Some(parent) = scene.instancing_parent(entry.mesh_id) else {
                continue;
            };
            let bounds = parent.bounds;
            // Map the unit cube onto the mesh's model-space box, then into
            // the world through the entry's model matrix.
            let fit = Mat4::from_translation(bounds.center())
                * Mat4::from_scale(bounds.half_extent() * 2.0);
            let model = entry.model_matrix * fit;
            let object = ObjectUniform::new(&model, &Mat4::IDENTITY);
            device.upload_uniforms(OBJECT_UNIFORM_SLOT, bytemuck::bytes_of(&object));
            device.draw(gizmo.geometry);
            stats.helper_draw_calls += 1;
        }
    }

    pub(crate) fn draw_normals(
        &mut self,
        device: &mut dyn Device,
        materials: &mut MaterialRegistry,
        camera: &CameraUniform,
        entries: &[&MeshRenderEntry],
        stats: &mut FrameStats,
    ) {
        let program = materials.special_programs(device).normals;
        device.set_color_writes(true);
        device.set_depth_state(HELPER_DEPTH);
        device.bind_program(program);
        device.upload_uniforms(CAMERA_UNIFORM_SLOT, bytemuck::bytes_of(camera));

        for entry in entries {
            let Some(geometry) = entry.geometry else {
                continue;
            };
            let object = ObjectUniform::new(&entry.model_matrix, &entry.normal_matrix);
            device.upload_uniforms(OBJECT_UNIFORM_SLOT, bytemuck::bytes_of(&object));
            device.draw(geometry);
            stats.helper_draw_calls += 1;
        }
    }

    pub(crate) fn draw_camera_frustums(
        &mut self,
        device: &mut dyn Device,
        scene: &Scene,
        camera: &CameraUniform,
        aspect: f32,
        active_camera: usize,
        stats: &mut FrameStats,
    ) {
        if self.frustum.is_none() {
            self.frustum = build_gizmo(device, "frustum_preview");
        }
        let Some(gizmo) = &self.frustum else { return };

        let mut bound = false;
        for index in 0..scene.camera_count() {
            // The active camera's frustum fills the whole viewport; only
            // other cameras are worth outlining.
            if index == active_camera {
                continue;
            }
            let Some(preview) = scene.camera(index) else {
                continue;
            };
            if !preview.show_frustum {
                continue;
            }
            if !bound {
                device.set_color_writes(true);
                device.set_depth_state(HELPER_DEPTH);
                device.bind_program(gizmo.program);
                device.upload_uniforms(CAMERA_UNIFORM_SLOT, bytemuck::bytes_of(camera));
                bound = true;
            }
            // The inverse view-projection maps the NDC cube back onto the
            // camera's visible volume.
            let model = preview.view_proj(aspect).inverse() * Mat4::from_scale(glam::Vec3::splat(2.0));
            let object = ObjectUniform::new(&model, &Mat4::IDENTITY);
            device.upload_uniforms(OBJECT_UNIFORM_SLOT, bytemuck::bytes_of(&object));
            device.draw(gizmo.geometry);
            stats.helper_draw_calls += 1;
        }
    }

    pub(crate) fn draw_light_gizmos(
        &mut self,
        device: &mut dyn Device,
        scene: &Scene,
        camera: &CameraUniform,
        stats: &mut FrameStats,
    ) {
        if self.light_gizmos.is_none() {
            self.light_gizmos = build_gizmo(device, "light_preview");
        }
        let Some(gizmo) = &self.light_gizmos else { return };

        let mut bound = false;
        for (_, light) in scene.lights() {
            let position = match &light.kind {
                LightKind::Point { position, .. } | LightKind::Spot { position, .. } => *position,
                LightKind::Ambient | LightKind::Directional { .. } => continue,
            };
            if !bound {
                device.set_color_writes(true);
                device.set_depth_state(HELPER_DEPTH);
                device.bind_program(gizmo.program);
                device.upload_uniforms(CAMERA_UNIFORM_SLOT, bytemuck::bytes_of(camera));
                bound = true;
            }
            let model = Mat4::from_translation(position) * Mat4::from_scale(glam::Vec3::splat(0.25));
            let object = ObjectUniform::new(&model, &Mat4::IDENTITY);
            device.upload_uniforms(OBJECT_UNIFORM_SLOT, bytemuck::bytes_of(&object));
            device.draw(gizmo.geometry);
            stats.helper_draw_calls += 1;
        }
    }
}
