use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::gpu::{Device, GeometryDesc, RenderTarget};
use crate::materials::MaterialRegistry;
use crate::pool::{PoolHandle, ResourcePool};
use crate::renderer::batch::MaterialBatcher;
use crate::renderer::entries::{normal_matrix, BatchedKind, MeshMaterialItem, MeshRenderEntry};
use crate::renderer::frustum::{in_front_of_camera, Frustum};
use crate::renderer::helpers::HelperRenderers;
use crate::renderer::passes::{self, RenderMode};
use crate::renderer::shadows::{self, ShadowFrame, ShadowTexturePool};
use crate::renderer::uniforms::{CameraUniform, LightsUniform};
use crate::scene::{
    Aabb, Camera, GraphVisitor, LightConfig, LightKind, MeshKind, Scene, SceneEvent,
};
use crate::settings::RenderSettings;

const CLEAR_COLOR: [f32; 4] = [0.231, 0.269, 0.338, 1.0];

/// Culling mode for [`SceneRenderer::cull_against_frustum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    ClippingPlanes,
    InFrontOfCamera,
}

/// Per-call parameters for [`SceneRenderer::render_scene_graph`].
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    pub mode: RenderMode,
    pub camera_index: usize,
    pub aspect: f32,
    pub time: f32,
}

impl FrameParams {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            camera_index: 0,
            aspect: 16.0 / 9.0,
            time: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    pub culled: u32,
    pub visible_meshes: u32,
    pub batch_count: u32,
    pub item_count: u32,
    pub prepass_draw_calls: u32,
    pub shading_draw_calls: u32,
    pub diagnostic_draw_calls: u32,
    pub shadow_passes: u32,
    pub shadow_draw_calls: u32,
    pub custom_invocations: u32,
    pub helper_draw_calls: u32,
    pub helper_entries: u32,
    pub drained_items: u32,
}

impl FrameStats {
    pub fn total_draw_calls(&self) -> u32 {
        self.prepass_draw_calls
            + self.shading_draw_calls
            + self.diagnostic_draw_calls
            + self.shadow_draw_calls
            + self.helper_draw_calls
    }
}

/// Property queries backing the helper sub-renderers; valid only while a
/// helper-visualization frame is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedProperty {
    MeshInstance,
    ModelMatrix,
    NormalMatrix,
}

#[derive(Debug, Clone)]
pub enum IndexedValue {
    MeshEntry(MeshRenderEntry),
    Matrix(Mat4),
}

/// The scene renderer façade.
///
/// Owns the material batches, transient-record pools, shadow texture pool
/// and helper sub-renderers. All entry points run on the designated
/// graphics submission thread; calls never overlap.
pub struct SceneRenderer {
    settings: RenderSettings,
    batcher: MaterialBatcher,
    shadow_pool: ShadowTexturePool,
    helpers: HelperRenderers,
    entry_pool: ResourcePool<MeshRenderEntry>,
    helper_entries: HashMap<u32, PoolHandle<MeshRenderEntry>>,
    custom: Vec<MeshRenderEntry>,
    view: Mat4,
    proj: Mat4,
    view_proj: Mat4,
    camera_position: Vec3,
    camera_direction: Vec3,
    frustum: Option<Frustum>,
    visible_bounds: Aabb,
    stats: FrameStats,
}

impl SceneRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        let entry_prealloc = settings.mesh_entry_prealloc;
        Self {
            settings,
            batcher: MaterialBatcher::new(),
            shadow_pool: ShadowTexturePool::new(),
            helpers: HelperRenderers::new(),
            entry_pool: ResourcePool::new(MeshRenderEntry::default)
                // Dropping the kind releases a custom entry's user payload.
                .with_recycle(|entry| entry.kind = MeshKind::Regular)
                .preallocate(entry_prealloc),
            helper_entries: HashMap::new(),
            custom: Vec::new(),
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
            camera_direction: Vec3::NEG_Z,
            frustum: None,
            visible_bounds: Aabb::EMPTY,
            stats: FrameStats::default(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn last_frame_stats(&self) -> FrameStats {
        self.stats
    }

    /// World bounds accumulated from this frame's accepted culls.
    pub fn visible_bounds(&self) -> Aabb {
        self.visible_bounds
    }

    /// Shadow-target pool counters, for leak accounting.
    pub fn shadow_pool(&self) -> &ShadowTexturePool {
        &self.shadow_pool
    }

    /// Snapshots camera matrices and rebuilds the frustum. Called at the
    /// top of every `render_scene_graph`; exposed for standalone culling.
    pub fn set_camera(&mut self, camera: &Camera, aspect: f32) {
        self.view = camera.view();
        self.proj = camera.proj(aspect);
        self.view_proj = self.proj * self.view;
        self.camera_position = camera.position();
        self.camera_direction = camera.direction();
        self.frustum = Some(Frustum::from_view_proj(&self.view_proj));
    }

    /// Visibility test against the current camera snapshot. Accepted boxes
    /// widen the frame's visible-AABB accumulator as a side effect.
    pub fn cull_against_frustum(&mut self, aabb: &Aabb, mode: CullMode) -> bool {
        let accepted = match mode {
            CullMode::ClippingPlanes => match &self.frustum {
                Some(frustum) => frustum.accepts(aabb),
                None => {
                    log::warn!("cull_against_frustum before any camera was set");
                    true
                }
            },
            CullMode::InFrontOfCamera => {
                in_front_of_camera(self.camera_position, self.camera_direction, aabb)
            }
        };
        if accepted {
            self.visible_bounds = self.visible_bounds.union(aabb);
        }
        accepted
    }

    /// Direct event intake for collaborators holding the renderer. The
    /// scene's queued events are drained automatically each frame.
    pub fn notify(&mut self, event: SceneEvent) {
        match event {
            SceneEvent::LightAdded
            | SceneEvent::LightRemoved
            | SceneEvent::MaterialInvalidated { .. } => {
                log::debug!("invalidating material batches: {:?}", event);
                self.batcher.invalidate_all();
            }
            SceneEvent::CameraFrustumToggled { .. } => {}
        }
    }

    /// Uploads geometry for every bakeable mesh instance and warms the
    /// program cache for the scene's current light configuration.
    pub fn bake_gpu_assets(
        &mut self,
        device: &mut dyn Device,
        scene: &mut Scene,
        materials: &mut MaterialRegistry,
    ) {
        let mut baked = 0usize;
        for mesh_id in 0..scene.mesh_instance_count() as u32 {
            let Some(instance) = scene.mesh_instance(mesh_id) else {
                continue;
            };
            if instance.kind.is_custom() || instance.geometry.is_some() {
                continue;
            }
            let desc = GeometryDesc {
                label: format!("mesh_{mesh_id}"),
                vertex_count: instance.vertex_count,
                index_count: instance.index_count,
            };
            let geometry = device.create_geometry(&desc);
            if let Some(instance) = scene.mesh_instance_mut(mesh_id) {
                instance.geometry = Some(geometry);
                baked += 1;
            }
        }

        materials.special_programs(device);
        let config = scene.light_config();
        let mut warmed = 0usize;
        for material in 0..materials.material_count() as u32 {
            for shadows in [false, true] {
                if materials
                    .resolve_program(device, material, config, shadows)
                    .is_some()
                {
                    warmed += 1;
                }
            }
        }
        log::info!(
            "baked {} meshes, warmed {} program variants",
            baked,
            warmed
        );
    }

    /// Mesh-record properties for helper sub-renderers. Populated only
    /// while a helper-visualization frame is rendering; returns `None`
    /// outside that window.
    pub fn get_indexed(&self, property: IndexedProperty, mesh_id: u32) -> Option<IndexedValue> {
        let handle = self.helper_entries.get(&mesh_id)?;
        let entry = self.entry_pool.get(*handle);
        Some(match property {
            IndexedProperty::MeshInstance => IndexedValue::MeshEntry(entry.clone()),
            IndexedProperty::ModelMatrix => IndexedValue::Matrix(entry.model_matrix),
            IndexedProperty::NormalMatrix => IndexedValue::Matrix(entry.normal_matrix),
        })
    }

    fn helper_visualization_active(&self, scene: &Scene) -> bool {
        self.settings.show_bounding_boxes
            || self.settings.show_normals
            || self.settings.show_light_gizmos
            || (0..scene.camera_count())
                .filter_map(|index| scene.camera(index))
                .any(|camera| camera.show_frustum)
    }

    /// Renders one frame: drain events, snapshot the camera, render shadow
    /// maps, walk-and-batch, run the mode's passes, draw helpers, reclaim
    /// every per-frame resource. The step order is strict.
    pub fn render_scene_graph(
        &mut self,
        device: &mut dyn Device,
        scene: &mut Scene,
        materials: &mut MaterialRegistry,
        frame: &FrameParams,
    ) {
        let mut stats = FrameStats::default();

        let events = scene.drain_events();
        let stale_materials = materials.take_invalidations();
        let invalidate = !stale_materials.is_empty()
            || events.iter().any(|event| {
                matches!(
                    event,
                    SceneEvent::LightAdded
                        | SceneEvent::LightRemoved
                        | SceneEvent::MaterialInvalidated { .. }
                )
            });
        if invalidate {
            log::debug!(
                "batch invalidation: {} events, {} stale materials",
                events.len(),
                stale_materials.len()
            );
            self.batcher.invalidate_all();
        }

        let Some(camera) = scene.camera(frame.camera_index).copied() else {
            log::warn!("render_scene_graph with no camera {}", frame.camera_index);
            return;
        };
        self.set_camera(&camera, frame.aspect);
        self.visible_bounds = Aabb::EMPTY;

        let light_config = scene.light_config();
        let helper_active = self.helper_visualization_active(scene);
        let frustum = Frustum::from_view_proj(&self.view_proj);

        let wants_shadows = match frame.mode {
            RenderMode::ShadowMap => true,
            mode if mode.uses_material_programs() => {
                self.settings.shadow_maps
                    && scene.lights().any(|(_, light)| light.casts_shadows())
            }
            _ => false,
        };

        let mut shadow_frame = ShadowFrame::new(&mut self.shadow_pool);

        // Shadow maps render before anything else. Directional fitting
        // needs the camera-visible AABB, so a cull-only sweep feeds the
        // accumulator first and refreshes graph-driven light transforms.
        if wants_shadows {
            let mut sweep = CullSweep {
                scene: &*scene,
                frustum: &frustum,
                visible: &mut self.visible_bounds,
                light_updates: Vec::new(),
            };
            scene.walk(&mut sweep);
            let updates = sweep.light_updates;
            apply_light_updates(scene, &updates);

            shadows::render_shadow_maps(
                device,
                scene,
                materials,
                &mut shadow_frame,
                &self.visible_bounds,
                self.settings.shadow_map_size,
                &mut stats,
            );
        }

        // Walk and batch for the active camera.
        {
            let mut visitor = BatchVisitor {
                scene: &*scene,
                device: &mut *device,
                materials: &mut *materials,
                batcher: &mut self.batcher,
                frustum: &frustum,
                visible: &mut self.visible_bounds,
                custom: &mut self.custom,
                entry_pool: &mut self.entry_pool,
                helper_entries: if helper_active {
                    Some(&mut self.helper_entries)
                } else {
                    None
                },
                light_config,
                shadows_on: wants_shadows,
                never_cull: frame.mode.never_culls(),
                light_updates: Vec::new(),
                stats: &mut stats,
            };
            scene.walk(&mut visitor);
            let updates = visitor.light_updates;
            apply_light_updates(scene, &updates);
        }

        stats.batch_count = self.batcher.entry_count() as u32;
        stats.item_count = self.batcher.item_count() as u32;
        stats.helper_entries = self.helper_entries.len() as u32;

        let camera_uniform =
            CameraUniform::from_matrices(self.view_proj, self.view, self.camera_position);

        match frame.mode {
            RenderMode::ShadowMap => {
                // Depth-only frame; the shadow orchestrator did all drawing.
            }
            RenderMode::ForwardNoPrepass => {
                let lights = LightsUniform::from_lights(
                    scene.lights(),
                    frame.time,
                    shadow_frame.assignments(),
                );
                device.set_render_target(RenderTarget::Screen);
                device.clear_color(CLEAR_COLOR);
                device.clear_depth(1.0);
                passes::run_shading_pass(
                    device,
                    &self.batcher,
                    &lights,
                    &shadow_frame,
                    &camera_uniform,
                    crate::gpu::DepthState::SINGLE_PASS,
                    &mut stats,
                );
                passes::run_custom_meshes(
                    device,
                    &self.custom,
                    crate::scene::DrawStage::Shaded,
                    &mut stats,
                );
            }
            RenderMode::ForwardWithPrepass => {
                let lights = LightsUniform::from_lights(
                    scene.lights(),
                    frame.time,
                    shadow_frame.assignments(),
                );
                let special = materials.special_programs(device);
                device.set_render_target(RenderTarget::Screen);
                device.clear_color(CLEAR_COLOR);
                device.clear_depth(1.0);
                passes::run_depth_prepass(
                    device,
                    &self.batcher,
                    special.depth_clip,
                    &camera_uniform,
                    &mut stats,
                );
                passes::run_custom_meshes(
                    device,
                    &self.custom,
                    crate::scene::DrawStage::DepthOnly,
                    &mut stats,
                );
                passes::run_shading_pass(
                    device,
                    &self.batcher,
                    &lights,
                    &shadow_frame,
                    &camera_uniform,
                    crate::gpu::DepthState::SHADING_AFTER_PREPASS,
                    &mut stats,
                );
                passes::run_custom_meshes(
                    device,
                    &self.custom,
                    crate::scene::DrawStage::Shaded,
                    &mut stats,
                );
            }
            RenderMode::NormalsOnly | RenderMode::TexcoordsOnly => {
                let special = materials.special_programs(device);
                let program = if frame.mode == RenderMode::NormalsOnly {
                    special.normals
                } else {
                    special.texcoords
                };
                device.set_render_target(RenderTarget::Screen);
                device.clear_color(CLEAR_COLOR);
                device.clear_depth(1.0);
                passes::run_diagnostic_pass(
                    device,
                    &self.batcher,
                    program,
                    &camera_uniform,
                    &mut stats,
                );
                passes::run_custom_meshes(
                    device,
                    &self.custom,
                    crate::scene::DrawStage::Diagnostic,
                    &mut stats,
                );
            }
        }

        if helper_active && frame.mode != RenderMode::ShadowMap {
            let entries: Vec<&MeshRenderEntry> = self
                .helper_entries
                .values()
                .map(|handle| self.entry_pool.get(*handle))
                .collect();
            if self.settings.show_bounding_boxes {
                self.helpers.draw_bounding_boxes(
                    device,
                    scene,
                    &camera_uniform,
                    &entries,
                    &mut stats,
                );
            }
            if self.settings.show_normals {
                self.helpers
                    .draw_normals(device, materials, &camera_uniform, &entries, &mut stats);
            }
            self.helpers.draw_camera_frustums(
                device,
                scene,
                &camera_uniform,
                frame.aspect,
                frame.camera_index,
                &mut stats,
            );
            if self.settings.show_light_gizmos {
                self.helpers
                    .draw_light_gizmos(device, scene, &camera_uniform, &mut stats);
            }
        }

        // Per-frame reclaim: drained batch items, custom scratch, helper
        // records. The shadow frame guard returns its textures when it
        // drops at the end of this scope.
        stats.drained_items = self.batcher.drain() as u32;
        self.custom.clear();
        self.helper_entries.clear();
        self.entry_pool.return_all();

        self.stats = stats;
    }
}

/// Cull-only walk that fills the visible-AABB accumulator and collects
/// graph-driven light transforms ahead of shadow rendering.
struct CullSweep<'a> {
    scene: &'a Scene,
    frustum: &'a Frustum,
    visible: &'a mut Aabb,
    light_updates: Vec<(u32, Mat4)>,
}

impl GraphVisitor for CullSweep<'_> {
    fn update_light(&mut self, light: u32, world: &Mat4) {
        self.light_updates.push((light, *world));
    }

    fn visit_mesh(&mut self, mesh_id: u32, model: &Mat4) {
        let Some(instance) = self.scene.mesh_instance(mesh_id) else {
            return;
        };
        if !instance.visible || instance.kind.is_custom() {
            return;
        }
        let Some(parent) = self.scene.instancing_parent(mesh_id) else {
            return;
        };
        let world = parent.bounds.transform(model);
        if self.frustum.accepts(&world) {
            *self.visible = self.visible.union(&world);
        }
    }
}

/// The batching walk: culls, resolves programs, fills material batches and
/// (for helper frames) the mesh-record map.
struct BatchVisitor<'a> {
    scene: &'a Scene,
    device: &'a mut dyn Device,
    materials: &'a mut MaterialRegistry,
    batcher: &'a mut MaterialBatcher,
    frustum: &'a Frustum,
    visible: &'a mut Aabb,
    custom: &'a mut Vec<MeshRenderEntry>,
    entry_pool: &'a mut ResourcePool<MeshRenderEntry>,
    helper_entries: Option<&'a mut HashMap<u32, PoolHandle<MeshRenderEntry>>>,
    light_config: LightConfig,
    shadows_on: bool,
    never_cull: bool,
    light_updates: Vec<(u32, Mat4)>,
    stats: &'a mut FrameStats,
}

impl GraphVisitor for BatchVisitor<'_> {
    fn update_light(&mut self, light: u32, world: &Mat4) {
        self.light_updates.push((light, *world));
    }

    fn visit_mesh(&mut self, mesh_id: u32, model: &Mat4) {
        let Some(instance) = self.scene.mesh_instance(mesh_id) else {
            log::warn!("graph references unknown mesh instance {}", mesh_id);
            return;
        };
        if !instance.visible {
            return;
        }

        if instance.kind.is_custom() {
            self.custom.push(MeshRenderEntry {
                mesh_id,
                geometry: instance.geometry,
                kind: instance.kind.clone(),
                model_matrix: *model,
                normal_matrix: normal_matrix(model),
            });
            return;
        }

        let Some(parent) = self.scene.instancing_parent(mesh_id) else {
            return;
        };
        let world = parent.bounds.transform(model);
        if !self.never_cull && !self.frustum.accepts(&world) {
            self.stats.culled += 1;
            return;
        }
        *self.visible = self.visible.union(&world);
        self.stats.visible_meshes += 1;

        let Some(geometry) = parent.geometry else {
            log::warn!("mesh {} visited before bake_gpu_assets", parent.mesh_id);
            return;
        };
        let normal = normal_matrix(model);
        let kind = match instance.kind {
            MeshKind::GpuStream => BatchedKind::GpuStream,
            _ => BatchedKind::Regular,
        };

        let shadow_flag = instance.receives_shadows && self.shadows_on;
        for material in &parent.materials {
            let Some(program) = self.materials.resolve_program(
                &mut *self.device,
                *material,
                self.light_config,
                shadow_flag,
            ) else {
                debug_assert!(false, "unresolved program for material {material}");
                log::warn!(
                    "skipping layer: no program for material {} on mesh {}",
                    material,
                    mesh_id
                );
                continue;
            };
            self.batcher.push_item(
                program,
                MeshMaterialItem {
                    mesh_id,
                    geometry,
                    material: *material,
                    model_matrix: *model,
                    normal_matrix: normal,
                    kind,
                },
            );
        }

        if let Some(map) = self.helper_entries.as_deref_mut() {
            let handle = *map
                .entry(mesh_id)
                .or_insert_with(|| self.entry_pool.acquire());
            *self.entry_pool.get_mut(handle) = MeshRenderEntry {
                mesh_id,
                geometry: Some(geometry),
                kind: instance.kind.clone(),
                model_matrix: *model,
                normal_matrix: normal,
            };
        }
    }
}

/// Writes graph-node transforms back onto the light table. A light node's
/// -Z axis is its direction; its origin is the light position.
fn apply_light_updates(scene: &mut Scene, updates: &[(u32, Mat4)]) {
    for (index, world) in updates {
        let Some(light) = scene.light_mut(*index) else {
            log::warn!("graph references unknown light {}", index);
            continue;
        };
        let position = world.transform_point3(Vec3::ZERO);
        let direction = world.transform_vector3(Vec3::NEG_Z).normalize_or_zero();
        match &mut light.kind {
            LightKind::Ambient => {}
            LightKind::Directional { direction: d } => {
                if direction != Vec3::ZERO {
                    *d = direction;
                }
            }
            LightKind::Point { position: p, .. } => *p = position,
            LightKind::Spot {
                position: p,
                direction: d,
                ..
            } => {
                *p = position;
                if direction != Vec3::ZERO {
                    *d = direction;
                }
            }
        }
    }
}
