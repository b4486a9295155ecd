//! View frustum for culling quadtree tiles

use crate::core::types::{Vec3, Vec4, Mat4};
use super::aabb::Aabb;

/// A plane defined by normal and distance from origin
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Plane that every point is in front of
    pub const fn pass_all() -> Self {
        Self { normal: Vec3::ZERO, distance: 0.0 }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    fn from_row(r: Vec4) -> Self {
        let normal = r.truncate();
        let len = normal.length();
        if len > 0.0 {
            Self { normal: normal / len, distance: r.w / len }
        } else {
            Self::pass_all()
        }
    }
}

/// View frustum with 6 planes (Near, Far, Left, Right, Top, Bottom)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Frustum {
    /// Frustum that culls nothing
    pub const fn unbounded() -> Self {
        Self { planes: [Plane::pass_all(); 6] }
    }

    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from view-projection matrix (Gribb/Hartmann)
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        Self {
            planes: [
                Plane::from_row(rows[3] + rows[2]), // near
                Plane::from_row(rows[3] - rows[2]), // far
                Plane::from_row(rows[3] + rows[0]), // left
                Plane::from_row(rows[3] - rows[0]), // right
                Plane::from_row(rows[3] - rows[1]), // top
                Plane::from_row(rows[3] + rows[1]), // bottom
            ],
        }
    }

    /// Check if AABB intersects frustum (conservative test)
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // Corner most aligned with the plane normal (p-vertex)
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}
