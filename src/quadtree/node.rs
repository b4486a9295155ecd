//! Quadtree node

use crate::math::Aabb;
use super::render_data::{SurfaceIndex, SurfaceRenderData};

/// Index of a node in the arena. 0 is the root, and as a child link it
/// means "absent".
pub type NodeIndex = u32;

/// Parent link of the root node
pub const INVALID_PARENT: NodeIndex = NodeIndex::MAX;

/// A single quadtree cell.
///
/// Children are addressed by index into the owning arena; quadrant `i`
/// covers the `+x` half when bit 0 is set and the `+y` half when bit 1 is set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadNode {
    /// World bounds. Z is the height envelope of every surface inserted below.
    pub bounds: Aabb,
    /// Surface that owns this node (last insertion wins)
    pub surface_index: SurfaceIndex,
    /// Surface this tile possibly transitions to
    pub transition_surface_index: SurfaceIndex,
    pub parent_index: NodeIndex,
    /// Child links, 0 means absent
    pub children: [NodeIndex; 4],
    /// Every quadrant position down to the leaf level is present or implicit
    pub has_complete_subtree: bool,
    /// Every descendant can merge with its siblings
    pub is_subtree_same_surface: bool,
    /// Cached `render_data[surface_index].material.is_some()`
    pub has_material: bool,
}

impl Default for QuadNode {
    fn default() -> Self {
        Self {
            bounds: Aabb::default(),
            surface_index: SurfaceIndex::NONE,
            transition_surface_index: SurfaceIndex::NONE,
            parent_index: INVALID_PARENT,
            children: [0; 4],
            has_complete_subtree: true,
            is_subtree_same_surface: true,
            has_material: false,
        }
    }
}

impl QuadNode {
    pub fn with_bounds(bounds: Aabb, parent_index: NodeIndex) -> Self {
        Self {
            bounds,
            parent_index,
            ..Default::default()
        }
    }

    /// Can stand in for its whole subtree: complete and homogeneous.
    /// Such a node may have no materialized children at all.
    pub fn is_collapsible(&self) -> bool {
        self.has_complete_subtree && self.is_subtree_same_surface
    }

    /// True when this node and `other` could render as one
    pub fn can_merge(&self, other: &QuadNode) -> bool {
        self.surface_index == other.surface_index
            && self.transition_surface_index == other.transition_surface_index
    }

    /// Whether this node may be drawn in place of all leaves below it.
    ///
    /// Past `force_collapse_density_level` structural completeness is no
    /// longer required.
    pub fn can_render(
        &self,
        density_level: u32,
        force_collapse_density_level: Option<u32>,
        render_data: &SurfaceRenderData,
    ) -> bool {
        let force_collapse = force_collapse_density_level.is_some_and(|level| density_level > level);
        render_data.has_material()
            && self.is_subtree_same_surface
            && (force_collapse || self.has_complete_subtree)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|&c| c == 0)
    }

    /// Present child links
    pub fn child_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.children.iter().copied().filter(|&c| c > 0)
    }

    /// Geometric stand-in for quadrant `quadrant` of a collapsible node
    pub fn implicit_child(&self, quadrant: usize) -> QuadNode {
        QuadNode {
            bounds: self.bounds.child_quadrant(quadrant),
            surface_index: self.surface_index,
            transition_surface_index: self.transition_surface_index,
            has_material: self.has_material,
            ..Default::default()
        }
    }
}
