//! Post-build pruning of nodes the traversal can rebuild implicitly.

use super::arena::NodeArena;
use super::node::NodeIndex;

/// Remove every node whose parent is complete and homogeneous, and every
/// complete, homogeneous node without a material. Returns the number of
/// nodes removed.
///
/// Children are always stored after their parent, so scanning back to front
/// visits a subtree bottom-up and each removal is an O(1) swap with the last
/// live node. The root (index 0) is never removed.
pub fn prune_redundant_nodes(arena: &mut NodeArena) -> usize {
    let count = arena.node_count();
    if count <= 1 {
        return 0;
    }

    let mut end = (count - 1) as NodeIndex;
    for idx in (1..count as NodeIndex).rev() {
        let node = *arena.node(idx);
        let parent_idx = node.parent_index;

        if arena.node(parent_idx).is_collapsible() {
            // Drop every link so no stale child index survives
            arena.node_mut(parent_idx).children = [0; 4];
        } else if !node.has_material && node.is_collapsible() {
            for slot in arena.node_mut(parent_idx).children.iter_mut() {
                if *slot == idx {
                    *slot = 0;
                }
            }
        } else {
            continue;
        }

        arena.swap_remove_node(idx, end);
        end -= 1;
    }

    let kept = end as usize + 1;
    arena.truncate_nodes(kept);
    count - kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{UVec2, Vec2, Vec3};
    use crate::math::{Aabb, Rect};
    use crate::quadtree::builder::QuadTreeBuilder;
    use crate::quadtree::node::INVALID_PARENT;
    use crate::quadtree::render_data::{MaterialHandle, SurfaceRenderData};

    fn builder() -> QuadTreeBuilder {
        QuadTreeBuilder::new(Rect::new(Vec2::ZERO, Vec2::splat(1024.0)), 256.0, UVec2::new(2, 2)).unwrap()
    }

    fn footprint(min: Vec2, max: Vec2) -> Aabb {
        Aabb::new(min.extend(0.0), max.extend(10.0))
    }

    fn assert_links_consistent(tree: &crate::quadtree::MeshQuadTree) {
        for (i, node) in tree.nodes().iter().enumerate() {
            for child in node.child_indices() {
                assert!((child as usize) < tree.node_count());
                assert_eq!(tree.node(child).parent_index, i as NodeIndex);
            }
            if i > 0 {
                let parent = tree.node(node.parent_index);
                assert!(parent.children.contains(&(i as NodeIndex)), "node {i} not linked from parent");
            }
        }
    }

    #[test]
    fn test_uniform_tree_collapses_to_root() {
        let mut b = builder();
        let s = b.add_render_data(SurfaceRenderData::new(MaterialHandle(1), 0.0));
        b.add_surface_tiles_inside_bounds(footprint(Vec2::ZERO, Vec2::splat(1024.0)), s).unwrap();
        let tree = b.unlock(true);

        assert_eq!(tree.node_count(), 1);
        let root = tree.node(0);
        assert!(root.has_complete_subtree);
        assert!(root.is_subtree_same_surface);
        assert_eq!(root.parent_index, INVALID_PARENT);
        assert!(root.is_leaf());
    }

    #[test]
    fn test_two_quadrants_keep_branch_nodes() {
        let mut b = builder();
        let a = b.add_render_data(SurfaceRenderData::new(MaterialHandle(1), 0.0));
        let c = b.add_render_data(SurfaceRenderData::new(MaterialHandle(2), 0.0));
        b.add_surface_tiles_inside_bounds(footprint(Vec2::ZERO, Vec2::splat(512.0)), a).unwrap();
        b.add_surface_tiles_inside_bounds(footprint(Vec2::splat(512.0), Vec2::splat(1024.0)), c).unwrap();
        let tree = b.unlock(true);

        assert_eq!(tree.node_count(), 3);
        let root = tree.node(0);
        assert!(!root.is_subtree_same_surface);
        assert_eq!(root.children[1], 0);
        assert_eq!(root.children[2], 0);

        let q0 = tree.node(root.children[0]);
        let q3 = tree.node(root.children[3]);
        assert_eq!(q0.bounds.xy(), Rect::new(Vec2::ZERO, Vec2::splat(512.0)));
        assert_eq!(q3.bounds.xy(), Rect::new(Vec2::splat(512.0), Vec2::splat(1024.0)));
        assert!(q0.is_leaf() && q3.is_leaf());
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_materialless_uniform_nodes_are_removed() {
        let mut b = builder();
        let lit = b.add_render_data(SurfaceRenderData::new(MaterialHandle(1), 0.0));
        let hole = b.add_render_data(SurfaceRenderData::default());
        b.add_surface_tiles_inside_bounds(footprint(Vec2::ZERO, Vec2::new(512.0, 1024.0)), lit).unwrap();
        b.add_surface_tiles_inside_bounds(footprint(Vec2::new(512.0, 0.0), Vec2::splat(1024.0)), hole).unwrap();
        let tree = b.unlock(true);

        // The material-less right half disappears, the left half survives
        let root = tree.node(0);
        assert_eq!(root.children[1], 0);
        assert_eq!(root.children[3], 0);
        assert!(root.children[0] > 0 && root.children[2] > 0);
        assert_eq!(tree.node_count(), 3);
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_no_prune_keeps_every_node() {
        let mut b = builder();
        let s = b.add_render_data(SurfaceRenderData::new(MaterialHandle(1), 0.0));
        b.add_surface_tiles_inside_bounds(footprint(Vec2::ZERO, Vec2::splat(1024.0)), s).unwrap();
        let tree = b.unlock(false);
        assert_eq!(tree.node_count(), 21);
    }

    #[test]
    fn test_irregular_footprints_stay_linked() {
        let mut b = QuadTreeBuilder::new(Rect::new(Vec2::ZERO, Vec2::splat(160.0)), 10.0, UVec2::new(8, 8)).unwrap();
        let a = b.add_render_data(SurfaceRenderData::new(MaterialHandle(1), 0.0));
        let c = b.add_render_data(SurfaceRenderData::new(MaterialHandle(2), 3.0));
        b.add_surface_tiles_inside_bounds(Aabb::new(Vec3::new(5.0, 5.0, 0.0), Vec3::new(95.0, 60.0, 1.0)), a).unwrap();
        b.add_surface_tiles_inside_bounds(Aabb::new(Vec3::new(40.0, 30.0, 0.0), Vec3::new(150.0, 150.0, 2.0)), c).unwrap();
        b.add_surface_tiles_inside_bounds(Aabb::new(Vec3::new(0.0, 100.0, 0.0), Vec3::new(20.0, 160.0, 1.0)), a).unwrap();
        let built = b.node_count();
        let tree = b.unlock(true);

        assert!(tree.node_count() < built);
        assert_links_consistent(&tree);
        // Nothing below a collapsible node survives
        for node in tree.nodes() {
            if node.is_collapsible() {
                assert!(node.is_leaf());
            }
        }
    }
}
