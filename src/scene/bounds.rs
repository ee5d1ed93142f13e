use glam::{Mat4, Vec3};

/// Axis-aligned bounding box.
///
/// Mesh bounds are stored in model space and transformed to world space at
/// cull time. A box with `max == min` on any axis is degenerate and rejected
/// as an input-contract violation by the culler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty accumulator: any union replaces it entirely.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn unit_cube() -> Self {
        Self {
            min: Vec3::splat(-0.5),
            max: Vec3::splat(0.5),
        }
    }

    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// True when every axis has positive extent.
    pub fn is_valid(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y && self.min.z < self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The 8 corners, in a fixed order.
    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    /// Axis-aligned box enclosing this box transformed by `matrix`.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        let mut out = Self::EMPTY;
        for corner in self.corners() {
            out = out.union_point(matrix.transform_point3(corner));
        }
        out
    }

    pub fn union_point(&self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_rotates_extents() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let rotated = aabb.transform(&Mat4::from_rotation_z(std::f32::consts::FRAC_PI_4));
        // A unit box rotated 45 degrees about Z widens to sqrt(2) in X/Y.
        let expected = 2f32.sqrt();
        assert!((rotated.max.x - expected).abs() < 1e-5);
        assert!((rotated.max.y - expected).abs() < 1e-5);
        assert!((rotated.max.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn union_ignores_empty() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(a.union(&Aabb::EMPTY), a);
        assert_eq!(Aabb::EMPTY.union(&a), a);
    }

    #[test]
    fn union_is_order_independent() {
        let boxes = [
            Aabb::new(Vec3::new(-3.0, 0.0, 0.0), Vec3::new(-1.0, 1.0, 1.0)),
            Aabb::new(Vec3::new(0.0, -2.0, 0.0), Vec3::new(1.0, 2.0, 1.0)),
            Aabb::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(4.0, 1.0, 5.0)),
        ];

        let forward = boxes.iter().fold(Aabb::EMPTY, |acc, b| acc.union(b));
        let backward = boxes.iter().rev().fold(Aabb::EMPTY, |acc, b| acc.union(b));
        assert_eq!(forward, backward);
        assert_eq!(forward.min, Vec3::new(-3.0, -2.0, -5.0));
        assert_eq!(forward.max, Vec3::new(4.0, 2.0, 5.0));
    }
}
