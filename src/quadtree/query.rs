//! Point queries against the read-only tree.
//!
//! Each query returns its value together with an exactness flag. A `false`
//! flag still comes with a best-effort value; callers decide whether an
//! approximate answer is good enough.

use crate::core::types::Vec2;
use crate::math::Aabb;
use super::node::QuadNode;
use super::tree::MeshQuadTree;

impl MeshQuadTree {
    /// Base height of the surface under `location`.
    ///
    /// Descends until a collapsible node is reached (exact) or no child
    /// contains the point, in which case the last node's height is returned
    /// with `false`.
    pub fn query_base_height_at_location(&self, location: Vec2) -> (f32, bool) {
        let Some(mut node) = self.root_containing(location) else {
            return (self.base_height(self.root()), false);
        };
        loop {
            if node.is_collapsible() {
                return (self.base_height(node), true);
            }
            match self.child_containing(node, location) {
                Some(child) => node = child,
                None => return (self.base_height(node), false),
            }
        }
    }

    /// Bounds of the tile under `location`; `true` only when the descent
    /// ends on a node without children.
    pub fn query_tile_bounds_at_location(&self, location: Vec2) -> (Aabb, bool) {
        let Some(mut node) = self.root_containing(location) else {
            return (self.bounds(), false);
        };
        while let Some(child) = self.child_containing(node, location) {
            node = child;
        }
        (node.bounds, node.is_leaf())
    }

    /// Base height bilinearly interpolated from the four leaf-grid samples
    /// around `location`. The grid is offset half a tile from the tile
    /// region so samples land on tile centers. Only exact when all four
    /// samples are.
    pub fn query_interpolated_tile_base_height_at_location(&self, location: Vec2) -> (f32, bool) {
        let leaf = self.leaf_size;
        let origin = self.tile_region.min - Vec2::splat(leaf * 0.5);
        let grid = (location - origin) / leaf;
        let corner = grid.floor() * leaf + origin;
        let t = grid - grid.floor();

        let (h00, e00) = self.query_base_height_at_location(corner);
        let (h10, e10) = self.query_base_height_at_location(corner + Vec2::new(leaf, 0.0));
        let (h01, e01) = self.query_base_height_at_location(corner + Vec2::new(0.0, leaf));
        let (h11, e11) = self.query_base_height_at_location(corner + Vec2::splat(leaf));

        let height = bilerp(h00, h10, h01, h11, t.x, t.y);
        (height, e00 && e10 && e01 && e11)
    }

    fn root_containing(&self, location: Vec2) -> Option<&QuadNode> {
        if self.node_count() == 0 {
            return None;
        }
        let root = self.root();
        root.bounds.contains_xy(location).then_some(root)
    }

    fn child_containing(&self, node: &QuadNode, location: Vec2) -> Option<&QuadNode> {
        node.child_indices()
            .map(|child| self.node(child))
            .find(|child| child.bounds.contains_xy(location))
    }

    fn base_height(&self, node: &QuadNode) -> f32 {
        self.render_data(node.surface_index).base_height
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn bilerp(p00: f32, p10: f32, p01: f32, p11: f32, tx: f32, ty: f32) -> f32 {
    lerp(lerp(p00, p10, tx), lerp(p01, p11, tx), ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{UVec2, Vec3};
    use crate::math::Rect;
    use crate::quadtree::builder::QuadTreeBuilder;
    use crate::quadtree::render_data::{MaterialHandle, SurfaceRenderData};

    fn builder() -> QuadTreeBuilder {
        QuadTreeBuilder::new(Rect::new(Vec2::ZERO, Vec2::splat(1024.0)), 256.0, UVec2::new(2, 2)).unwrap()
    }

    fn insert(b: &mut QuadTreeBuilder, min: Vec2, max: Vec2, height: f32, material: u32) {
        let s = b.add_render_data(SurfaceRenderData::new(MaterialHandle(material), height));
        b.add_surface_tiles_inside_bounds(Aabb::new(min.extend(height), max.extend(height + 1.0)), s)
            .unwrap();
    }

    /// Surfaces on the lower-left (height 1) and upper-right (height 3) quadrants
    fn diagonal_tree() -> MeshQuadTree {
        let mut b = builder();
        insert(&mut b, Vec2::ZERO, Vec2::splat(512.0), 1.0, 1);
        insert(&mut b, Vec2::splat(512.0), Vec2::splat(1024.0), 3.0, 2);
        b.unlock(true)
    }

    /// Full cover, left half at height 0 and right half at height 10
    fn split_tree() -> MeshQuadTree {
        let mut b = builder();
        insert(&mut b, Vec2::ZERO, Vec2::new(512.0, 1024.0), 0.0, 1);
        insert(&mut b, Vec2::new(512.0, 0.0), Vec2::splat(1024.0), 10.0, 2);
        b.unlock(true)
    }

    #[test]
    fn test_base_height_exact_inside_surface() {
        let tree = diagonal_tree();
        assert_eq!(tree.query_base_height_at_location(Vec2::new(100.0, 100.0)), (1.0, true));
        assert_eq!(tree.query_base_height_at_location(Vec2::new(900.0, 600.0)), (3.0, true));
    }

    #[test]
    fn test_base_height_falls_back_outside_coverage() {
        let tree = diagonal_tree();
        // Lower-right quadrant was never inserted; the root answers
        let (height, exact) = tree.query_base_height_at_location(Vec2::new(700.0, 100.0));
        assert!(!exact);
        assert_eq!(height, 3.0);

        let (_, exact) = tree.query_base_height_at_location(Vec2::new(-10.0, 100.0));
        assert!(!exact);
    }

    #[test]
    fn test_containment_is_half_open() {
        let tree = diagonal_tree();
        // x = 512 belongs to the right column, where nothing was inserted
        assert!(!tree.query_base_height_at_location(Vec2::new(512.0, 100.0)).1);
        assert!(tree.query_base_height_at_location(Vec2::new(511.9, 100.0)).1);
        assert!(!tree.query_base_height_at_location(Vec2::new(1024.0, 1000.0)).1);
    }

    #[test]
    fn test_tile_bounds_at_location() {
        let tree = diagonal_tree();
        let (bounds, exact) = tree.query_tile_bounds_at_location(Vec2::new(100.0, 100.0));
        assert!(exact);
        assert_eq!(bounds.xy(), Rect::new(Vec2::ZERO, Vec2::splat(512.0)));
        assert_eq!(bounds.min.z, 1.0);

        let (bounds, exact) = tree.query_tile_bounds_at_location(Vec2::new(700.0, 100.0));
        assert!(!exact);
        assert_eq!(bounds, tree.root().bounds);
    }

    #[test]
    fn test_tile_bounds_reach_leaves_without_pruning() {
        let mut b = builder();
        insert(&mut b, Vec2::ZERO, Vec2::splat(1024.0), 2.0, 1);
        let tree = b.unlock(false);

        let (bounds, exact) = tree.query_tile_bounds_at_location(Vec2::new(300.0, 700.0));
        assert!(exact);
        assert_eq!(bounds.xy(), Rect::new(Vec2::new(256.0, 512.0), Vec2::new(512.0, 768.0)));
    }

    #[test]
    fn test_tile_bounds_query_is_repeatable() {
        let tree = diagonal_tree();
        for p in [Vec2::new(100.0, 100.0), Vec2::new(700.0, 100.0), Vec2::new(-5.0, 2000.0)] {
            assert_eq!(tree.query_tile_bounds_at_location(p), tree.query_tile_bounds_at_location(p));
        }
    }

    #[test]
    fn test_interpolated_height_on_grid_corner() {
        let tree = diagonal_tree();
        // Tile center, all four samples inside the lower-left surface
        assert_eq!(tree.query_interpolated_tile_base_height_at_location(Vec2::new(128.0, 128.0)), (1.0, true));
        assert_eq!(tree.query_interpolated_tile_base_height_at_location(Vec2::new(200.0, 300.0)), (1.0, true));
    }

    #[test]
    fn test_interpolated_height_blends_neighbours() {
        let tree = split_tree();
        let (height, exact) = tree.query_interpolated_tile_base_height_at_location(Vec2::new(512.0, 300.0));
        assert!(exact);
        assert!((height - 5.0).abs() < 1e-5);

        let (height, _) = tree.query_interpolated_tile_base_height_at_location(Vec2::new(448.0, 300.0));
        assert!((height - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_interpolated_height_inexact_near_gap() {
        let tree = diagonal_tree();
        // Samples at x = 640 fall in the empty lower-right quadrant
        let (height, exact) = tree.query_interpolated_tile_base_height_at_location(Vec2::new(500.0, 200.0));
        assert!(!exact);
        assert!(height.is_finite());
    }

    #[test]
    fn test_empty_region_reports_default_height() {
        let tree = builder().unlock(true);
        // Untouched root is complete and homogeneous but owns no surface
        let (height, _) = tree.query_base_height_at_location(Vec2::new(10.0, 10.0));
        assert_eq!(height, 0.0);
        assert_eq!(tree.bounds().min, Vec3::new(0.0, 0.0, f32::MAX));
    }
}
