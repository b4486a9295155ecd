//! Read-only quadtree produced by `QuadTreeBuilder::unlock`.

use crate::core::types::{UVec2, Vec3};
use crate::math::{Aabb, Rect};
use super::arena::NodeArena;
use super::node::{NodeIndex, QuadNode};
use super::render_data::{HitProxyId, MaterialHandle, SurfaceIndex, SurfaceRenderData};

/// Immutable mesh quadtree. Safe to share between threads; every traversal
/// writes only into its own output.
#[derive(Clone, Debug)]
pub struct MeshQuadTree {
    pub(crate) arena: NodeArena,
    pub(crate) tree_depth: u32,
    pub(crate) leaf_size: f32,
    pub(crate) max_leaf_count: u32,
    pub(crate) extent_in_tiles: UVec2,
    pub(crate) tile_region: Rect,
    pub(crate) materials: Vec<MaterialHandle>,
}

impl MeshQuadTree {
    /// World distance at which `lod_level` hands over to the next coarser level
    pub fn lod_distance(lod_level: u32, lod_scale: f32) -> f32 {
        2.0_f32.powi(lod_level as i32 + 1) * lod_scale
    }

    /// Bounds of the root node, or a unit box when the tree is empty
    pub fn bounds(&self) -> Aabb {
        self.arena
            .nodes()
            .first()
            .map(|root| root.bounds)
            .unwrap_or_else(|| Aabb::new(-Vec3::ONE, Vec3::ONE))
    }

    /// Region tiles can be generated in
    pub fn tile_region(&self) -> Rect {
        self.tile_region
    }

    /// Nodes kept after pruning, root included
    pub fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    pub fn nodes(&self) -> &[QuadNode] {
        self.arena.nodes()
    }

    pub fn node(&self, index: NodeIndex) -> &QuadNode {
        self.arena.node(index)
    }

    pub fn root(&self) -> &QuadNode {
        self.arena.node(0)
    }

    /// World size of one side of a leaf tile
    pub fn leaf_size(&self) -> f32 {
        self.leaf_size
    }

    /// Upper bound of leaf tiles the configured extent can produce
    pub fn max_leaf_count(&self) -> u32 {
        self.max_leaf_count
    }

    pub fn extent_in_tiles(&self) -> UVec2 {
        self.extent_in_tiles
    }

    /// Depth of the tree; 0 would mean the root is a leaf
    pub fn tree_depth(&self) -> u32 {
        self.tree_depth
    }

    /// Distinct materials, indexed by `SurfaceRenderData::material_index`
    pub fn materials(&self) -> &[MaterialHandle] {
        &self.materials
    }

    pub fn render_data(&self, index: SurfaceIndex) -> &SurfaceRenderData {
        self.arena.render_data(index)
    }

    /// All render records, slot 0 being the default record
    pub fn surfaces(&self) -> &[SurfaceRenderData] {
        self.arena.render_data_slice()
    }

    /// Hit-test handles of every surface, for picking
    pub fn hit_proxies(&self) -> Vec<HitProxyId> {
        self.surfaces().iter().filter_map(|data| data.hit_proxy).collect()
    }

    /// Heap bytes held by the tree
    pub fn allocated_size(&self) -> usize {
        self.arena.allocated_size() + self.materials.capacity() * std::mem::size_of::<MaterialHandle>()
    }
}
