use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::gpu::{
    DepthState, Device, RenderTarget, TextureDesc, TextureFormat, TextureHandle,
    CAMERA_UNIFORM_SLOT, OBJECT_UNIFORM_SLOT,
};
use crate::materials::MaterialRegistry;
use crate::renderer::entries::normal_matrix;
use crate::renderer::frustum::{Frustum, FrustumQuery};
use crate::renderer::renderer::FrameStats;
use crate::renderer::uniforms::{CameraUniform, ObjectUniform};
use crate::scene::{
    Aabb, CustomDraw, DrawStage, GraphVisitor, LightKind, MeshKind, Scene, ShadowAlgorithm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub size: u32,
    pub format: TextureFormat,
}

/// Reusable shadow target pool.
///
/// Textures stay alive across frames keyed by (resolution, format); each
/// `render_scene_graph` call borrows what it needs through a [`ShadowFrame`]
/// and the guard returns every borrow when it drops, shading success or not.
#[derive(Default)]
pub struct ShadowTexturePool {
    free: HashMap<TextureKey, Vec<TextureHandle>>,
    acquire_count: usize,
    release_count: usize,
}

impl ShadowTexturePool {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&mut self, device: &mut dyn Device, key: TextureKey) -> TextureHandle {
        self.acquire_count += 1;
        if let Some(texture) = self.free.entry(key).or_default().pop() {
            return texture;
        }
        let label = match key.format {
            TextureFormat::Depth32 => "shadow_depth",
            TextureFormat::Rgba16Float => "shadow_moments",
        };
        log::info!("shadow pool: creating {}x{} {}", key.size, key.size, label);
        device.create_texture(&TextureDesc {
            label,
            size: key.size,
            format: key.format,
        })
    }

    fn release(&mut self, key: TextureKey, texture: TextureHandle) {
        self.release_count += 1;
        self.free.entry(key).or_default().push(texture);
    }

    pub fn acquire_count(&self) -> usize {
        self.acquire_count
    }

    pub fn release_count(&self) -> usize {
        self.release_count
    }

    pub fn outstanding(&self) -> usize {
        self.acquire_count - self.release_count
    }
}

/// Per-light shadow state for one frame: borrowed textures plus the light's
/// view/projection, sampled by the shading pass's uniform upload.
#[derive(Debug, Clone, Copy)]
pub struct ShadowMapAssignment {
    pub light: u32,
    pub depth_texture: TextureHandle,
    pub color_texture: Option<TextureHandle>,
    pub view: Mat4,
    pub proj: Mat4,
    pub algorithm: ShadowAlgorithm,
}

impl ShadowMapAssignment {
    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view
    }
}

/// Scope guard over the pool for one `render_scene_graph` call.
///
/// Every texture acquired through the guard is returned on drop. Drop runs
/// during unwinding too, so an injected fault mid-shading cannot exhaust
/// the pool across frames.
pub struct ShadowFrame<'a> {
    pool: &'a mut ShadowTexturePool,
    taken: Vec<(TextureKey, TextureHandle)>,
    assignments: Vec<ShadowMapAssignment>,
}

impl<'a> ShadowFrame<'a> {
    pub fn new(pool: &'a mut ShadowTexturePool) -> Self {
        Self {
            pool,
            taken: Vec::new(),
            assignments: Vec::new(),
        }
    }

    pub fn acquire(&mut self, device: &mut dyn Device, key: TextureKey) -> TextureHandle {
        let texture = self.pool.acquire(device, key);
        self.taken.push((key, texture));
        texture
    }

    pub fn push_assignment(&mut self, assignment: ShadowMapAssignment) {
        self.assignments.push(assignment);
    }

    pub fn assignments(&self) -> &[ShadowMapAssignment] {
        &self.assignments
    }

    pub fn assignment_for(&self, light: u32) -> Option<&ShadowMapAssignment> {
        self.assignments.iter().find(|a| a.light == light)
    }
}

impl Drop for ShadowFrame<'_> {
    fn drop(&mut self) {
        for (key, texture) in self.taken.drain(..) {
            self.pool.release(key, texture);
        }
    }
}

pub(crate) fn directional_matrices(direction: Vec3, visible: &Aabb) -> (Mat4, Mat4) {
    let (center, radius) = if visible.is_empty() {
        log::warn!("directional shadow fit with an empty visible AABB");
        (Vec3::ZERO, 10.0)
    } else {
        (visible.center(), visible.half_extent().length().max(0.01))
    };
    let up = if direction.abs().dot(Vec3::Y) > 0.95 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let eye = center - direction * (radius * 2.0);
    let view = Mat4::look_at_rh(eye, center, up);
    let proj = Mat4::orthographic_rh_gl(-radius, radius, -radius, radius, 0.1, radius * 4.0);
    (view, proj)
}

pub(crate) fn spot_matrices(
    position: Vec3,
    direction: Vec3,
    range: f32,
    outer_angle: f32,
) -> (Mat4, Mat4) {
    let up = if direction.abs().dot(Vec3::Y) > 0.95 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(position, position + direction, up);
    let fov = (outer_angle * 2.0).clamp(0.01, std::f32::consts::PI - 0.01);
    let proj = Mat4::perspective_rh_gl(fov, 1.0, 0.1, range.max(0.2));
    (view, proj)
}

pub(crate) fn point_matrices(position: Vec3, range: f32, focus: Vec3) -> (Mat4, Mat4) {
    let mut direction = (focus - position).normalize_or_zero();
    if direction == Vec3::ZERO {
        direction = Vec3::NEG_Z;
    }
    let up = if direction.abs().dot(Vec3::Y) > 0.95 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(position, position + direction, up);
    let proj = Mat4::perspective_rh_gl(
        std::f32::consts::FRAC_PI_2,
        1.0,
        0.1,
        range.max(0.2),
    );
    (view, proj)
}

/// Renders every shadow-casting light's map before any shading draw.
///
/// Directional lights fit their volume to the camera-visible AABB, so the
/// caller must have culled the frame's candidates already.
pub(crate) fn render_shadow_maps(
    device: &mut dyn Device,
    scene: &Scene,
    materials: &mut MaterialRegistry,
    shadow_frame: &mut ShadowFrame<'_>,
    visible: &Aabb,
    default_resolution: u32,
    stats: &mut FrameStats,
) {
    let special = materials.special_programs(device);

    for (index, light) in scene.lights() {
        if !light.casts_shadows() {
            continue;
        }
        let Some(settings) = light.shadow else {
            continue;
        };
        let resolution = if settings.resolution == 0 {
            default_resolution
        } else {
            settings.resolution
        };

        let (view, proj, query) = match &light.kind {
            LightKind::Ambient => continue,
            LightKind::Directional { direction } => {
                let (view, proj) = directional_matrices(*direction, visible);
                let frustum = Frustum::from_view_proj(&(proj * view));
                (view, proj, FrustumQuery::ClippingPlanes(frustum))
            }
            LightKind::Spot {
                position,
                direction,
                range,
                outer_angle,
                ..
            } => {
                let (view, proj) = spot_matrices(*position, *direction, *range, *outer_angle);
                let frustum = Frustum::from_view_proj(&(proj * view));
                (view, proj, FrustumQuery::ClippingPlanes(frustum))
            }
            LightKind::Point {
                position, range, ..
            } => {
                let focus = if visible.is_empty() {
                    Vec3::ZERO
                } else {
                    visible.center()
                };
                let (view, proj) = point_matrices(*position, *range, focus);
                // Relevance test only: anything not strictly behind the
                // light's view direction gets a depth sample.
                let direction = (focus - *position).normalize_or_zero();
                (
                    view,
                    proj,
                    FrustumQuery::InFrontOfCamera {
                        position: *position,
                        direction,
                    },
                )
            }
        };

        let depth_texture = shadow_frame.acquire(
            device,
            TextureKey {
                size: resolution,
                format: TextureFormat::Depth32,
            },
        );
        let (color_texture, program) = match settings.algorithm {
            ShadowAlgorithm::Plain => (None, special.shadow_depth),
            ShadowAlgorithm::Variance { .. } => (
                Some(shadow_frame.acquire(
                    device,
                    TextureKey {
                        size: resolution,
                        format: TextureFormat::Rgba16Float,
                    },
                )),
                special.variance_depth,
            ),
        };

        device.set_render_target(RenderTarget::Textures {
            color: color_texture,
            depth: depth_texture,
        });
        device.clear_depth(1.0);
        if color_texture.is_some() {
            device.clear_color([1.0, 1.0, 0.0, 0.0]);
        }
        device.set_color_writes(color_texture.is_some());
        device.set_depth_state(DepthState::PREPASS);
        device.bind_program(program);
        device.upload_uniforms(
            CAMERA_UNIFORM_SLOT,
            bytemuck::bytes_of(&CameraUniform::from_view_proj(proj * view)),
        );

        let mut visitor = ShadowVisitor {
            device: &mut *device,
            scene,
            query,
            draws: 0,
        };
        scene.walk(&mut visitor);
        stats.shadow_draw_calls += visitor.draws;
        stats.shadow_passes += 1;

        shadow_frame.push_assignment(ShadowMapAssignment {
            light: index,
            depth_texture,
            color_texture,
            view,
            proj,
            algorithm: settings.algorithm,
        });
    }

    device.set_render_target(RenderTarget::Screen);
}

/// Depth-only mesh visitor for one light's pass. Grouping is trivial here:
/// one shared depth program for everything, so there is nothing to batch by.
struct ShadowVisitor<'a> {
    device: &'a mut dyn Device,
    scene: &'a Scene,
    query: FrustumQuery,
    draws: u32,
}

impl GraphVisitor for ShadowVisitor<'_> {
    fn visit_mesh(&mut self, mesh_id: u32, model: &Mat4) {
        let Some(instance) = self.scene.mesh_instance(mesh_id) else {
            log::warn!("shadow walk visited unknown mesh {}", mesh_id);
            return;
        };
        if !instance.visible || !instance.casts_shadows {
            return;
        }

        if let MeshKind::Custom { callback, user } = &instance.kind {
            let draw = CustomDraw {
                mesh_id,
                model_matrix: *model,
                stage: DrawStage::DepthOnly,
                user: user.as_ref(),
            };
            callback(&mut *self.device, &draw);
            return;
        }

        let Some(parent) = self.scene.instancing_parent(mesh_id) else {
            return;
        };
        let world = parent.bounds.transform(model);
        if !self.query.accepts(&world) {
            return;
        }
        let Some(geometry) = parent.geometry else {
            return;
        };

        let object = ObjectUniform::new(model, &normal_matrix(model));
        self.device
            .upload_uniforms(OBJECT_UNIFORM_SLOT, bytemuck::bytes_of(&object));
        self.device.draw(geometry);
        self.draws += 1;
    }
}
