use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::renderer::shadows::ShadowMapAssignment;
use crate::scene::{
    Falloff, Light, LightKind, ShadowAlgorithm, MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS,
    MAX_SPOT_LIGHTS,
};

/// Attenuation mode tags mirrored by the shading programs.
pub const ATTEN_OFF: f32 = 0.0;
pub const ATTEN_LINEAR: f32 = 1.0;
pub const ATTEN_INV_DISTANCE: f32 = 2.0;
pub const ATTEN_INV_DISTANCE_SQ: f32 = 3.0;
pub const ATTEN_CURVE: f32 = 4.0;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn from_matrices(view_proj: Mat4, view: Mat4, position: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            position: [position.x, position.y, position.z, 1.0],
        }
    }

    /// Depth-only passes (shadow rendering) need just a view-projection.
    pub fn from_view_proj(view_proj: Mat4) -> Self {
        Self::from_matrices(view_proj, Mat4::IDENTITY, Vec3::ZERO)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl ObjectUniform {
    pub fn new(model: &Mat4, normal: &Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct DirectionalLightRaw {
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub shadow_view_proj: [[f32; 4]; 4],
    /// [casts, algorithm, min_variance, cutoff]
    pub shadow_params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PointLightRaw {
    pub position_range: [f32; 4],
    pub color: [f32; 4],
    /// [mode, curve_scale, 0, 0]
    pub attenuation: [f32; 4],
    pub shadow_view_proj: [[f32; 4]; 4],
    pub shadow_params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SpotLightRaw {
    pub position_range: [f32; 4],
    pub direction: [f32; 4],
    pub color: [f32; 4],
    /// [cos_inner, cos_outer, 0, 0]
    pub cone: [f32; 4],
    pub attenuation: [f32; 4],
    pub shadow_view_proj: [[f32; 4]; 4],
    pub shadow_params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    /// [directional, point, spot, 0]
    pub counts: [u32; 4],
    pub ambient: [f32; 4],
    pub directionals: [DirectionalLightRaw; MAX_DIRECTIONAL_LIGHTS],
    pub points: [PointLightRaw; MAX_POINT_LIGHTS],
    pub spots: [SpotLightRaw; MAX_SPOT_LIGHTS],
}

impl LightsUniform {
    /// Packs the scene's lights at `time`: colors are curve-sampled and
    /// scaled by intensity, cone angles are precomputed as cosines, and
    /// shadow casters carry their assignment's view-projection. Lights past
    /// the per-kind capacity are dropped with a diagnostic.
    pub fn from_lights<'a>(
        lights: impl Iterator<Item = (u32, &'a Light)>,
        time: f32,
        assignments: &[ShadowMapAssignment],
    ) -> Self {
        let mut uniform = Self::zeroed();
        let mut ambient = Vec3::ZERO;
        let mut directional = 0usize;
        let mut point = 0usize;
        let mut spot = 0usize;

        for (index, light) in lights {
            let color = light.sampled_color(time);
            let assignment = assignments.iter().find(|a| a.light == index);
            let (shadow_view_proj, shadow_params) = shadow_fields(light, assignment);

            match &light.kind {
                LightKind::Ambient => ambient += color,
                LightKind::Directional { direction } => {
                    if directional == MAX_DIRECTIONAL_LIGHTS {
                        log::warn!("dropping directional light {} over capacity", index);
                        continue;
                    }
                    uniform.directionals[directional] = DirectionalLightRaw {
                        direction: [direction.x, direction.y, direction.z, 0.0],
                        color: [color.x, color.y, color.z, 0.0],
                        shadow_view_proj,
                        shadow_params,
                    };
                    directional += 1;
                }
                LightKind::Point {
                    position,
                    range,
                    falloff,
                } => {
                    if point == MAX_POINT_LIGHTS {
                        log::warn!("dropping point light {} over capacity", index);
                        continue;
                    }
                    uniform.points[point] = PointLightRaw {
                        position_range: [position.x, position.y, position.z, *range],
                        color: [color.x, color.y, color.z, 0.0],
                        attenuation: attenuation_fields(falloff, time),
                        shadow_view_proj,
                        shadow_params,
                    };
                    point += 1;
                }
                LightKind::Spot {
                    position,
                    direction,
                    range,
                    inner_angle,
                    outer_angle,
                    falloff,
                } => {
                    if spot == MAX_SPOT_LIGHTS {
                        log::warn!("dropping spot light {} over capacity", index);
                        continue;
                    }
                    let mut inner = *inner_angle;
                    let mut outer = *outer_angle;
                    if inner > outer {
                        std::mem::swap(&mut inner, &mut outer);
                    }
                    uniform.spots[spot] = SpotLightRaw {
                        position_range: [position.x, position.y, position.z, *range],
                        direction: [direction.x, direction.y, direction.z, 0.0],
                        color: [color.x, color.y, color.z, 0.0],
                        cone: [inner.cos(), outer.cos(), 0.0, 0.0],
                        attenuation: attenuation_fields(falloff, time),
                        shadow_view_proj,
                        shadow_params,
                    };
                    spot += 1;
                }
            }
        }

        uniform.counts = [directional as u32, point as u32, spot as u32, 0];
        uniform.ambient = [ambient.x, ambient.y, ambient.z, 0.0];
        uniform
    }
}

fn attenuation_fields(falloff: &Falloff, time: f32) -> [f32; 4] {
    match falloff {
        Falloff::Off => [ATTEN_OFF, 0.0, 0.0, 0.0],
        Falloff::Linear => [ATTEN_LINEAR, 0.0, 0.0, 0.0],
        Falloff::InverseDistance => [ATTEN_INV_DISTANCE, 0.0, 0.0, 0.0],
        Falloff::InverseDistanceSquared => [ATTEN_INV_DISTANCE_SQ, 0.0, 0.0, 0.0],
        Falloff::Curve(curve) => [ATTEN_CURVE, curve.sample(time), 0.0, 0.0],
    }
}

fn shadow_fields(
    light: &Light,
    assignment: Option<&ShadowMapAssignment>,
) -> ([[f32; 4]; 4], [f32; 4]) {
    match assignment {
        Some(assignment) => {
            let params = match light.shadow.map(|s| s.algorithm) {
                Some(ShadowAlgorithm::Variance {
                    min_variance,
                    cutoff,
                }) => [1.0, 1.0, min_variance, cutoff],
                _ => [1.0, 0.0, 0.0, 0.0],
            };
            (assignment.view_proj().to_cols_array_2d(), params)
        }
        None => (Mat4::IDENTITY.to_cols_array_2d(), [0.0; 4]),
    }
}
