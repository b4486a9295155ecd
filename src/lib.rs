//! Quadmesh - sparse quadtree LOD selection for tiled surface meshes

pub mod core;
pub mod math;
pub mod quadtree;
