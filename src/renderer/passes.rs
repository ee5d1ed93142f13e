use crate::gpu::{
    DepthState, Device, ProgramHandle, CAMERA_UNIFORM_SLOT, LIGHTS_UNIFORM_SLOT,
    OBJECT_UNIFORM_SLOT, SHADOW_TEXTURE_SLOT_BASE,
};
use crate::renderer::batch::MaterialBatcher;
use crate::renderer::entries::MeshRenderEntry;
use crate::renderer::renderer::FrameStats;
use crate::renderer::shadows::ShadowFrame;
use crate::renderer::uniforms::{CameraUniform, LightsUniform, ObjectUniform};
use crate::scene::{CustomDraw, DrawStage, MeshKind};

/// How the current `render_scene_graph` call draws. Selected per call and
/// never persisted; the graph is re-walked every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    ForwardNoPrepass,
    ForwardWithPrepass,
    NormalsOnly,
    TexcoordsOnly,
    ShadowMap,
}

impl RenderMode {
    /// Modes whose visibility culling is disabled so off-screen geometry
    /// stays inspectable.
    pub fn never_culls(self) -> bool {
        matches!(self, Self::NormalsOnly | Self::TexcoordsOnly)
    }

    pub fn uses_material_programs(self) -> bool {
        matches!(self, Self::ForwardNoPrepass | Self::ForwardWithPrepass)
    }
}

/// Depth prepass: color writes off, depth LESS with writes on, and one
/// shared depth-clip program across every batch's items. Exists purely to
/// fill the depth buffer cheaply before shading.
pub(crate) fn run_depth_prepass(
    device: &mut dyn Device,
    batcher: &MaterialBatcher,
    depth_clip: ProgramHandle,
    camera: &CameraUniform,
    stats: &mut FrameStats,
) {
    device.set_color_writes(false);
    device.set_depth_state(DepthState::PREPASS);
    device.bind_program(depth_clip);
    device.upload_uniforms(CAMERA_UNIFORM_SLOT, bytemuck::bytes_of(camera));

    for (_, items) in batcher.batches() {
        for item in items {
            let object = ObjectUniform::new(&item.model_matrix, &item.normal_matrix);
            device.upload_uniforms(OBJECT_UNIFORM_SLOT, bytemuck::bytes_of(&object));
            device.draw(item.geometry);
            stats.prepass_draw_calls += 1;
        }
    }
}

/// Shading pass over the material batches.
///
/// Uniforms are uploaded per batch activation: each resolved program tracks
/// its uniforms independently, so camera and light state cannot be hoisted
/// out of the loop. With a prepass behind it the depth test is EQUAL and
/// writes are off; standalone it is LESS with writes on.
pub(crate) fn run_shading_pass(
    device: &mut dyn Device,
    batcher: &MaterialBatcher,
    lights: &LightsUniform,
    shadow_frame: &ShadowFrame<'_>,
    camera: &CameraUniform,
    depth_state: DepthState,
    stats: &mut FrameStats,
) {
    device.set_color_writes(true);
    device.set_depth_state(depth_state);

    for (program, items) in batcher.batches() {
        if items.is_empty() {
            continue;
        }
        device.bind_program(program);
        device.upload_uniforms(CAMERA_UNIFORM_SLOT, bytemuck::bytes_of(camera));
        device.upload_uniforms(LIGHTS_UNIFORM_SLOT, bytemuck::bytes_of(lights));
        bind_shadow_maps(device, shadow_frame);

        for item in items {
            let object = ObjectUniform::new(&item.model_matrix, &item.normal_matrix);
            device.upload_uniforms(OBJECT_UNIFORM_SLOT, bytemuck::bytes_of(&object));
            device.draw(item.geometry);
            stats.shading_draw_calls += 1;
        }
    }
}

/// Diagnostic modes: every batch renders with one shared visualization
/// program instead of its own resolved program. No lighting.
pub(crate) fn run_diagnostic_pass(
    device: &mut dyn Device,
    batcher: &MaterialBatcher,
    program: ProgramHandle,
    camera: &CameraUniform,
    stats: &mut FrameStats,
) {
    device.set_color_writes(true);
    device.set_depth_state(DepthState::SINGLE_PASS);
    device.bind_program(program);
    device.upload_uniforms(CAMERA_UNIFORM_SLOT, bytemuck::bytes_of(camera));

    for (_, items) in batcher.batches() {
        for item in items {
            let object = ObjectUniform::new(&item.model_matrix, &item.normal_matrix);
            device.upload_uniforms(OBJECT_UNIFORM_SLOT, bytemuck::bytes_of(&object));
            device.draw(item.geometry);
            stats.diagnostic_draw_calls += 1;
        }
    }
}

/// Custom meshes bypass batching: their registered callback runs once per
/// pass with the stage it is drawing for.
pub(crate) fn run_custom_meshes(
    device: &mut dyn Device,
    custom: &[MeshRenderEntry],
    stage: DrawStage,
    stats: &mut FrameStats,
) {
    for entry in custom {
        let MeshKind::Custom { callback, user } = &entry.kind else {
            debug_assert!(false, "non-custom entry in the custom scratch list");
            log::warn!("skipping non-custom entry {} in custom list", entry.mesh_id);
            continue;
        };
        let draw = CustomDraw {
            mesh_id: entry.mesh_id,
            model_matrix: entry.model_matrix,
            stage,
            user: user.as_ref(),
        };
        callback(&mut *device, &draw);
        stats.custom_invocations += 1;
    }
}

fn bind_shadow_maps(device: &mut dyn Device, shadow_frame: &ShadowFrame<'_>) {
    for (index, assignment) in shadow_frame.assignments().iter().enumerate() {
        let slot = SHADOW_TEXTURE_SLOT_BASE + (index as u32) * 2;
        device.bind_texture(slot, assignment.depth_texture);
        if let Some(color) = assignment.color_texture {
            device.bind_texture(slot + 1, color);
        }
    }
}
