use glam::{Mat4, Vec3, Vec4};

use crate::scene::Aabb;

/// Six world-space clip planes {near, far, left, right, top, bottom}.
///
/// Each plane is (nx, ny, nz, w) with unit-length normal pointing into the
/// visible volume, so `w + n.p` is the Euclidean signed distance of point
/// `p` and negative means outside.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Derives the planes as row combinations of the view-projection
    /// matrix, normalized by the length of their XYZ component.
    pub fn from_view_proj(view_proj: &Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        let planes = [
            normalize_plane(r3 + r2), // near
            normalize_plane(r3 - r2), // far
            normalize_plane(r3 + r0), // left
            normalize_plane(r3 - r0), // right
            normalize_plane(r3 - r1), // top
            normalize_plane(r3 + r1), // bottom
        ];
        Self { planes }
    }

    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// 8-corner-per-plane visibility test.
    ///
    /// A plane rejects the box only when all 8 corners are outside it, and
    /// any rejecting plane culls the whole box. This is conservative: a box
    /// straddling several planes can be accepted even though it lies
    /// entirely outside the frustum volume. Downstream visualization relies
    /// on the over-inclusive result, so the test is intentionally not
    /// separating-axis-exact.
    pub fn accepts(&self, aabb: &Aabb) -> bool {
        debug_assert!(aabb.is_valid(), "culling a degenerate AABB");
        let corners = aabb.corners();
        for plane in &self.planes {
            let mut any_inside = false;
            for corner in &corners {
                if plane.w + plane.truncate().dot(*corner) >= 0.0 {
                    any_inside = true;
                    break;
                }
            }
            if !any_inside {
                return false;
            }
        }
        true
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.truncate().length();
    if length <= f32::EPSILON {
        log::warn!("degenerate frustum plane from a singular view-projection");
        return plane;
    }
    plane / length
}

/// Accepts the box when at least one corner is not strictly behind the
/// camera plane. Used for point-light relevance, not full frustum culling.
pub fn in_front_of_camera(position: Vec3, direction: Vec3, aabb: &Aabb) -> bool {
    debug_assert!(aabb.is_valid(), "culling a degenerate AABB");
    aabb.corners()
        .iter()
        .any(|corner| (*corner - position).dot(direction) >= 0.0)
}

/// Ephemeral culling query, rebuilt from the active camera every frame.
#[derive(Debug, Clone, Copy)]
pub enum FrustumQuery {
    ClippingPlanes(Frustum),
    InFrontOfCamera { position: Vec3, direction: Vec3 },
}

impl FrustumQuery {
    pub fn from_view_proj(view_proj: &Mat4) -> Self {
        Self::ClippingPlanes(Frustum::from_view_proj(view_proj))
    }

    pub fn accepts(&self, aabb: &Aabb) -> bool {
        match self {
            Self::ClippingPlanes(frustum) => frustum.accepts(aabb),
            Self::InFrontOfCamera {
                position,
                direction,
            } => in_front_of_camera(*position, *direction, aabb),
        }
    }
}
