//! Sparse mesh quadtree for tiled surfaces.
//!
//! Build with [`QuadTreeBuilder`], then [`QuadTreeBuilder::unlock`] into a
//! read-only [`MeshQuadTree`] that any number of views can traverse at once.

pub mod node;
pub mod render_data;
pub mod arena;
pub mod builder;
pub mod compact;
pub mod tree;
pub mod traversal;
pub mod query;
pub mod instance_buffer;
pub mod config;

pub use node::{NodeIndex, QuadNode, INVALID_PARENT};
pub use render_data::{HitProxyId, MaterialHandle, SurfaceIndex, SurfaceRenderData};
pub use builder::{QuadTreeBuilder, MAX_TREE_DEPTH};
pub use tree::MeshQuadTree;
pub use traversal::{StagingInstanceData, TraversalDesc, TraversalOutput, MAX_DENSITY_COUNT, NUM_STREAMS};
pub use instance_buffer::InstanceBuffers;
pub use config::{QuadTreeConfig, MIN_LOD_SCALE};
