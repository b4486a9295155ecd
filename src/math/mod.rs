//! Bounding volumes and view frustum

pub mod aabb;
pub mod rect;
pub mod frustum;

pub use aabb::Aabb;
pub use rect::Rect;
pub use frustum::{Plane, Frustum};
