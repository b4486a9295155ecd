//! Mutable quadtree under construction.
//!
//! Surfaces are inserted top-down from the root; on the way back up each
//! node folds its children's completeness and homogeneity into its own
//! flags. `unlock` consumes the builder and yields the read-only tree.

use std::collections::HashMap;

use crate::core::types::{UVec2, Vec2};
use crate::core::{Error, Result};
use crate::math::{Aabb, Rect};
use super::arena::{max_node_count, NodeArena};
use super::compact;
use super::node::{NodeIndex, QuadNode, INVALID_PARENT};
use super::render_data::{MaterialHandle, SurfaceIndex, SurfaceRenderData};
use super::tree::MeshQuadTree;

/// Deepest tree a builder accepts; the arena for it holds about 22M nodes
pub const MAX_TREE_DEPTH: u32 = 12;

/// Quadtree in its insertion phase
#[derive(Debug)]
pub struct QuadTreeBuilder {
    arena: NodeArena,
    tree_depth: u32,
    leaf_size: f32,
    max_leaf_count: u32,
    extent_in_tiles: UVec2,
    tile_region: Rect,
}

impl QuadTreeBuilder {
    /// Initialize an empty tree covering `world_bounds`.
    ///
    /// The leaf grid is the smallest power of two holding
    /// `2 * max(extent_in_tiles)` tiles per side; the tree depth is its log2.
    /// The root spans that whole grid starting at `world_bounds.min`.
    pub fn new(world_bounds: Rect, tile_size: f32, extent_in_tiles: UVec2) -> Result<Self> {
        let area = world_bounds.area();
        if !(area > 0.0) {
            return Err(Error::InvalidBounds { area });
        }
        if !(tile_size > 0.0) || !tile_size.is_finite() {
            return Err(Error::InvalidTileSize(tile_size));
        }
        let invalid_extent = Error::InvalidExtent { x: extent_in_tiles.x, y: extent_in_tiles.y };
        if extent_in_tiles.x == 0 || extent_in_tiles.y == 0 {
            return Err(invalid_extent);
        }

        let Some(resolution) = extent_in_tiles
            .max_element()
            .checked_mul(2)
            .and_then(u32::checked_next_power_of_two)
            .filter(|resolution| resolution.trailing_zeros() <= MAX_TREE_DEPTH)
        else {
            return Err(invalid_extent);
        };
        let tree_depth = resolution.trailing_zeros();

        // Theoretical max up front so child indices stay valid while inserting
        let mut arena = NodeArena::with_capacity(max_node_count(resolution));

        let root_size = resolution as f32 * tile_size;
        let root_rect = Rect::new(world_bounds.min, world_bounds.min + Vec2::splat(root_size));
        arena.push_node(QuadNode::with_bounds(Aabb::with_empty_z(root_rect), INVALID_PARENT));

        log::debug!(
            "Quadtree init: {}x{} tiles of {}, depth {}, node capacity {}",
            resolution, resolution, tile_size, tree_depth, arena.node_capacity()
        );

        Ok(Self {
            arena,
            tree_depth,
            leaf_size: tile_size,
            max_leaf_count: extent_in_tiles.x * extent_in_tiles.y * 4,
            extent_in_tiles,
            tile_region: world_bounds,
        })
    }

    /// Register a surface's render data. Use the returned index to insert
    /// the surface's tiles.
    pub fn add_render_data(&mut self, data: SurfaceRenderData) -> SurfaceIndex {
        self.arena.push_render_data(data)
    }

    /// Insert every leaf tile of the tile region that overlaps `bounds`,
    /// owned by `surface`. Later insertions take ownership of shared nodes.
    pub fn add_surface_tiles_inside_bounds(&mut self, bounds: Aabb, surface: SurfaceIndex) -> Result<()> {
        if !self.arena.contains_surface(surface) {
            return Err(Error::UnknownSurface(surface.0));
        }
        let region = Aabb::new(self.tile_region.min.extend(0.0), self.tile_region.max.extend(0.0));
        self.add_nodes(0, &region, &bounds, surface, self.tree_depth);
        Ok(())
    }

    /// Insert a surface mesh footprint. The footprint is shrunk by a quarter
    /// tile on each side so edges lying on tile borders stay out of the
    /// neighbouring tiles.
    pub fn add_surface(&mut self, mesh_bounds: Aabb, surface: SurfaceIndex) -> Result<()> {
        let shrink = Vec2::splat(self.leaf_size * 0.25);
        let tile_bounds = Aabb::new(
            (mesh_bounds.min.truncate() + shrink).extend(mesh_bounds.min.z),
            (mesh_bounds.max.truncate() - shrink).extend(mesh_bounds.max.z),
        );
        self.add_surface_tiles_inside_bounds(tile_bounds, surface)
    }

    fn add_nodes(
        &mut self,
        node_idx: NodeIndex,
        region: &Aabb,
        surface_bounds: &Aabb,
        surface: SurfaceIndex,
        lod_level: u32,
    ) {
        let has_material = self.arena.render_data(surface).has_material();
        let node = self.arena.node_mut(node_idx);
        node.bounds.include_z(surface_bounds.min.z, surface_bounds.max.z);
        node.surface_index = surface;
        node.transition_surface_index = surface;
        node.has_material = has_material;
        // Assume complete and homogeneous until a child says otherwise;
        // leaves keep these so they can be subdivided implicitly.
        node.has_complete_subtree = true;
        node.is_subtree_same_surface = true;

        if lod_level == 0 {
            return;
        }

        let bounds = node.bounds;
        let mut complete = true;
        let mut same_surface = true;
        let mut prev_child: Option<QuadNode> = None;

        for quadrant in 0..4 {
            let mut child_idx = self.arena.node(node_idx).children[quadrant];
            if child_idx > 0 {
                if self.arena.node(child_idx).bounds.overlaps_xy(surface_bounds) {
                    self.add_nodes(child_idx, region, surface_bounds, surface, lod_level - 1);
                }
            } else {
                let mut child_bounds = bounds.child_quadrant(quadrant);
                child_bounds.min.z = surface_bounds.min.z;
                child_bounds.max.z = surface_bounds.max.z;

                if child_bounds.overlaps_xy(surface_bounds) && child_bounds.overlaps_xy(region) {
                    child_idx = self.arena.push_node(QuadNode::with_bounds(child_bounds, node_idx));
                    self.arena.node_mut(node_idx).children[quadrant] = child_idx;
                    self.add_nodes(child_idx, region, surface_bounds, surface, lod_level - 1);
                }
            }

            if child_idx > 0 {
                let child = *self.arena.node(child_idx);
                // The first present child is compared against itself
                let prev = prev_child.unwrap_or(child);
                if !child.is_subtree_same_surface || !child.can_merge(&prev) {
                    same_surface = false;
                }
                if !child.has_complete_subtree {
                    complete = false;
                }
                prev_child = Some(child);
            } else {
                complete = false;
            }
        }

        let node = self.arena.node_mut(node_idx);
        node.has_complete_subtree = complete;
        node.is_subtree_same_surface = same_surface;
    }

    /// Finish building: optionally prune redundant nodes, assign material
    /// indices, and hand back the read-only tree.
    pub fn unlock(mut self, prune_redundant_nodes: bool) -> MeshQuadTree {
        let built = self.arena.node_count();
        if prune_redundant_nodes {
            compact::prune_redundant_nodes(&mut self.arena);
        } else {
            self.arena.truncate_nodes(built);
        }
        let materials = build_material_indices(&mut self.arena);

        log::debug!(
            "Quadtree unlocked: {} nodes built, {} kept, {} surfaces, {} materials",
            built,
            self.arena.node_count(),
            self.arena.render_data_slice().len() - 1,
            materials.len()
        );

        MeshQuadTree {
            arena: self.arena,
            tree_depth: self.tree_depth,
            leaf_size: self.leaf_size,
            max_leaf_count: self.max_leaf_count,
            extent_in_tiles: self.extent_in_tiles,
            tile_region: self.tile_region,
            materials,
        }
    }

    pub fn tree_depth(&self) -> u32 {
        self.tree_depth
    }

    pub fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    pub fn root(&self) -> &QuadNode {
        self.arena.node(0)
    }

    pub fn node(&self, index: NodeIndex) -> &QuadNode {
        self.arena.node(index)
    }

    pub fn tile_region(&self) -> Rect {
        self.tile_region
    }
}

/// Give every distinct material a dense index, in first-seen order.
fn build_material_indices(arena: &mut NodeArena) -> Vec<MaterialHandle> {
    let mut materials = Vec::new();
    let mut lookup: HashMap<MaterialHandle, u32> = HashMap::new();

    for data in arena.render_data_mut() {
        data.material_index = data.material.map(|material| {
            *lookup.entry(material).or_insert_with(|| {
                // At most one material per surface, and surfaces are u32-indexed
                let index = materials.len() as u32;
                materials.push(material);
                index
            })
        });
    }
    materials
}
