//! Axis-aligned bounding box

use crate::core::types::{Vec2, Vec3};
use super::rect::Rect;

/// Axis-aligned bounding box defined by min and max corners.
///
/// X/Y hold a quadtree cell's footprint; Z is the height envelope of the
/// surfaces stored beneath it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(-Vec3::ONE, Vec3::ONE)
    }
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Footprint `rect` with an inverted Z range, so the first `include_z`
    /// establishes the real heights.
    pub fn with_empty_z(rect: Rect) -> Self {
        Self {
            min: rect.min.extend(f32::MAX),
            max: rect.max.extend(f32::MIN),
        }
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// XY footprint
    pub fn xy(&self) -> Rect {
        Rect::new(self.min.truncate(), self.max.truncate())
    }

    /// Half-open XY containment: min edges inclusive, max edges exclusive.
    pub fn contains_xy(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x &&
        p.y >= self.min.y && p.y < self.max.y
    }

    /// Open-interval XY overlap. Boxes sharing only an edge do not overlap.
    pub fn overlaps_xy(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x &&
        self.min.y < other.max.y && self.max.y > other.min.y
    }

    /// Grow the Z range to cover `[min_z, max_z]`
    pub fn include_z(&mut self, min_z: f32, max_z: f32) {
        self.min.z = self.min.z.min(min_z);
        self.max.z = self.max.z.max(max_z);
    }

    /// Get child quadrant AABB for quadtree subdivision.
    /// index: 0-3 (bit 0 = +x half, bit 1 = +y half). Z range is kept.
    pub fn child_quadrant(&self, index: usize) -> Aabb {
        debug_assert!(index < 4);
        let half = self.size().truncate() * 0.5;
        let offset = Vec2::new(
            if index & 1 != 0 { half.x } else { 0.0 },
            if index & 2 != 0 { half.y } else { 0.0 },
        );
        let min = self.min.truncate() + offset;
        Aabb {
            min: min.extend(self.min.z),
            max: (min + half).extend(self.max.z),
        }
    }
}
