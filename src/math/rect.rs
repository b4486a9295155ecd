//! 2D axis-aligned rectangle

use crate::core::types::Vec2;

/// Axis-aligned rectangle on the XY plane
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Rectangle centered on `center` reaching `half_extent` on each side
    pub fn from_center_half_extent(center: Vec2, half_extent: Vec2) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Signed area; zero or negative for degenerate rectangles
    pub fn area(&self) -> f32 {
        let size = self.size();
        size.x * size.y
    }

    /// Inclusive containment (points on any edge count as inside)
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y
    }

    /// Squared distance from `p` to the closest point of the rectangle.
    /// Zero when `p` is inside.
    pub fn distance_squared_to_point(&self, p: Vec2) -> f32 {
        let closest = p.clamp(self.min, self.max);
        closest.distance_squared(p)
    }

    pub fn distance_to_point(&self, p: Vec2) -> f32 {
        self.distance_squared_to_point(p).sqrt()
    }
}
