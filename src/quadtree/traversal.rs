//! Per-view LOD selection over a read-only quadtree.
//!
//! Three mutually recursive states walk the tree: `select_lod` while the
//! distance band of a branch is undecided, `select_lod_refinement` once the
//! band is fixed and only tessellation density still grows, and
//! `select_lod_within_bounds` when the view restricts drawing to a
//! tessellated rectangle. All of them frustum-cull first.

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

use crate::core::types::{Vec2, Vec3};
use crate::math::{Frustum, Rect};
use super::config::QuadTreeConfig;
use super::node::QuadNode;
use super::render_data::SurfaceRenderData;
use super::tree::MeshQuadTree;

/// Four-component records per staged instance
pub const NUM_STREAMS: usize = 3;

/// Upper bound for `TraversalDesc::density_count`
pub const MAX_DENSITY_COUNT: u32 = 12;

const LOD_MASK: u32 = 0xFF;
const SHOULD_MORPH_BIT: u32 = 1 << 8;
const CAN_MORPH_TWICE_BIT: u32 = 1 << 9;

/// Per-view traversal settings
#[derive(Clone, Debug, PartialEq)]
pub struct TraversalDesc {
    /// Finest LOD allowed; rises with the observer's height above the surface
    pub lowest_lod: u32,
    /// Number of tessellation buckets (1..=12)
    pub density_count: u32,
    /// Morph factor written to tiles at `lowest_lod`
    pub height_morph: f32,
    /// Density above which incomplete subtrees render as one tile
    pub force_collapse_density_level: Option<u32>,
    /// World scale of the LOD distance bands
    pub lod_scale: f32,
    pub observer_position: Vec3,
    /// Offset added to every emitted position
    pub pre_view_translation: Vec3,
    pub frustum: Frustum,
    pub lod_morphing_enabled: bool,
    /// Restrict drawing to leaf tiles inside this rectangle
    pub tessellated_bounds: Option<Rect>,
}

impl Default for TraversalDesc {
    fn default() -> Self {
        Self {
            lowest_lod: 0,
            density_count: 1,
            height_morph: 0.0,
            force_collapse_density_level: None,
            lod_scale: 1.0,
            observer_position: Vec3::ZERO,
            pre_view_translation: Vec3::ZERO,
            frustum: Frustum::unbounded(),
            lod_morphing_enabled: true,
            tessellated_bounds: None,
        }
    }
}

impl TraversalDesc {
    /// Describe a view from `observer`, deriving LOD settings from `config`
    /// and the lowest LOD from the observer's height above the surface.
    pub fn for_view(tree: &MeshQuadTree, config: &QuadTreeConfig, observer: Vec3, frustum: Frustum) -> Self {
        let lod_scale = tree.leaf_size() * config.effective_lod_scale();
        let (lowest_lod, height_morph) = observer_lod(tree, observer, lod_scale);
        Self {
            lowest_lod,
            density_count: config.density_count(),
            height_morph,
            force_collapse_density_level: config.force_collapse_density_level,
            lod_scale,
            observer_position: observer,
            pre_view_translation: Vec3::ZERO,
            frustum,
            lod_morphing_enabled: config.lod_morphing_enabled,
            tessellated_bounds: None,
        }
    }

    pub fn with_pre_view_translation(mut self, translation: Vec3) -> Self {
        self.pre_view_translation = translation;
        self
    }

    pub fn with_tessellated_bounds(mut self, bounds: Rect) -> Self {
        self.tessellated_bounds = Some(bounds);
        self
    }

    fn clamped_density_count(&self) -> u32 {
        self.density_count.clamp(1, MAX_DENSITY_COUNT)
    }
}

/// Lowest LOD and height morph for an observer: log2 of the vertical
/// distance to the surface below, in units of `lod_scale`.
pub fn observer_lod(tree: &MeshQuadTree, observer: Vec3, lod_scale: f32) -> (u32, f32) {
    let (surface_height, _) = tree.query_interpolated_tile_base_height_at_location(observer.truncate());
    let distance = (observer.z - surface_height).abs() / lod_scale.max(f32::EPSILON);
    let lod = distance.max(1.0).log2();
    let level = lod.floor() as u32;
    if level >= tree.tree_depth() {
        (tree.tree_depth(), 0.0)
    } else {
        (level, lod.fract())
    }
}

/// One staged tile instance, tagged with its draw bucket.
///
/// `data[0]`: translated center x, y, base height, surface tag bits.
/// `data[1]`: packed LOD/morph bits, height morph, scale x, scale y.
/// `data[2]`: hit proxy color rgb, selection.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct StagingInstanceData {
    pub bucket_index: u32,
    pub data: [[f32; 4]; NUM_STREAMS],
}

impl StagingInstanceData {
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.data[0][0], self.data[0][1], self.data[0][2])
    }

    pub fn surface_tag(&self) -> u32 {
        self.data[0][3].to_bits()
    }

    fn packed(&self) -> u32 {
        self.data[1][0].to_bits()
    }

    pub fn lod_level(&self) -> u32 {
        self.packed() & LOD_MASK
    }

    pub fn should_morph(&self) -> bool {
        self.packed() & SHOULD_MORPH_BIT != 0
    }

    pub fn can_morph_twice(&self) -> bool {
        self.packed() & CAN_MORPH_TWICE_BIT != 0
    }

    pub fn height_morph(&self) -> f32 {
        self.data[1][1]
    }

    pub fn scale(&self) -> Vec2 {
        Vec2::new(self.data[1][2], self.data[1][3])
    }

    pub fn hit_color(&self) -> [f32; 4] {
        self.data[2]
    }
}

/// Result of one traversal: per-bucket counts plus the staged instances
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraversalOutput {
    /// Instances per `material_index * density_count + density_index`
    pub bucket_instance_counts: Vec<u32>,
    pub staging_instance_data: Vec<StagingInstanceData>,
    pub instance_count: u32,
}

impl TraversalOutput {
    /// Clear for reuse, keeping allocations
    pub fn reset(&mut self, bucket_count: usize) {
        self.bucket_instance_counts.clear();
        self.bucket_instance_counts.resize(bucket_count, 0);
        self.staging_instance_data.clear();
        self.instance_count = 0;
    }
}

impl MeshQuadTree {
    /// Number of draw buckets a traversal with `desc` fills
    pub fn bucket_count(&self, desc: &TraversalDesc) -> usize {
        self.materials.len().max(1) * desc.clamped_density_count() as usize
    }

    /// Select the tiles visible from `desc` and stage one instance per tile
    pub fn build_instance_data(&self, desc: &TraversalDesc) -> TraversalOutput {
        let mut output = TraversalOutput::default();
        self.build_instance_data_into(desc, &mut output);
        output
    }

    /// Same as `build_instance_data`, reusing `output`'s allocations
    pub fn build_instance_data_into(&self, desc: &TraversalDesc, output: &mut TraversalOutput) {
        output.reset(self.bucket_count(desc));
        if self.node_count() == 0 {
            return;
        }

        let mut traversal = Traversal {
            tree: self,
            desc,
            density_count: desc.clamped_density_count(),
            output,
        };
        match desc.tessellated_bounds {
            Some(bounds) => traversal.select_lod_within_bounds(self.root(), self.tree_depth, &bounds),
            None => traversal.select_lod(self.root(), self.tree_depth),
        }

        log::trace!(
            "Quadtree traversal from {:?}: {} instances in {} buckets",
            desc.observer_position,
            output.instance_count,
            output.bucket_instance_counts.len()
        );
    }

    /// Traverse several views in parallel, one output per view
    pub fn build_instance_data_for_views(&self, descs: &[TraversalDesc]) -> Vec<TraversalOutput> {
        descs.par_iter().map(|desc| self.build_instance_data(desc)).collect()
    }
}

struct Traversal<'a> {
    tree: &'a MeshQuadTree,
    desc: &'a TraversalDesc,
    density_count: u32,
    output: &'a mut TraversalOutput,
}

impl<'a> Traversal<'a> {
    fn can_render(&self, node: &QuadNode, density_level: u32) -> bool {
        let render_data = self.tree.render_data(node.surface_index);
        node.can_render(density_level, self.desc.force_collapse_density_level, render_data)
    }

    fn select_lod(&mut self, node: &QuadNode, lod_level: u32) {
        let tree = self.tree;
        let desc = self.desc;

        if !desc.frustum.intersects_aabb(&node.bounds) {
            return;
        }

        // Zero when the observer is above the tile
        let distance = node.bounds.xy().distance_to_point(desc.observer_position.truncate());

        // Outside this band: the tile belongs to the next coarser LOD
        if distance > MeshQuadTree::lod_distance(lod_level, desc.lod_scale) {
            if self.can_render(node, 0) {
                self.add_node_for_render(node, 1, lod_level + 1);
            } else {
                for child in node.child_indices() {
                    self.select_lod_refinement(tree.node(child), 2, lod_level + 1);
                }
            }
            return;
        }

        if lod_level == 0 {
            if self.can_render(node, 0) {
                self.add_node_for_render(node, 0, lod_level);
            }
        } else if distance > MeshQuadTree::lod_distance(lod_level - 1, desc.lod_scale)
            || lod_level == desc.lowest_lod
        {
            // Fully inside this band
            if self.can_render(node, 0) {
                self.add_node_for_render(node, 0, lod_level);
            } else {
                for child in node.child_indices() {
                    self.select_lod_refinement(tree.node(child), 1, lod_level);
                }
            }
        } else if node.is_collapsible() {
            for quadrant in 0..4 {
                self.select_lod(&node.implicit_child(quadrant), lod_level - 1);
            }
        } else {
            for child in node.child_indices() {
                self.select_lod(tree.node(child), lod_level - 1);
            }
        }
    }

    fn select_lod_refinement(&mut self, node: &QuadNode, density_level: u32, lod_level: u32) {
        let tree = self.tree;

        if !self.desc.frustum.intersects_aabb(&node.bounds) {
            return;
        }

        if self.can_render(node, density_level) {
            self.add_node_for_render(node, density_level, lod_level);
        } else {
            for child in node.child_indices() {
                self.select_lod_refinement(tree.node(child), density_level + 1, lod_level);
            }
        }
    }

    fn select_lod_within_bounds(&mut self, node: &QuadNode, lod_level: u32, bounds: &Rect) {
        let tree = self.tree;

        if !self.desc.frustum.intersects_aabb(&node.bounds) {
            return;
        }

        if lod_level == 0 {
            let footprint = node.bounds.xy();
            if bounds.contains_point(footprint.min)
                && bounds.contains_point(footprint.max)
                && self.can_render(node, 0)
            {
                self.add_node_for_render(node, 0, lod_level);
            }
        } else if node.is_collapsible() {
            for quadrant in 0..4 {
                self.select_lod_within_bounds(&node.implicit_child(quadrant), lod_level - 1, bounds);
            }
        } else {
            for child in node.child_indices() {
                self.select_lod_within_bounds(tree.node(child), lod_level - 1, bounds);
            }
        }
    }

    fn add_node_for_render(&mut self, node: &QuadNode, density_level: u32, lod_level: u32) {
        let desc = self.desc;
        let render_data: &SurfaceRenderData = self.tree.render_data(node.surface_index);

        let density_index = density_level.min(self.density_count - 1);
        let material_index = render_data.material_index.unwrap_or(0);
        let bucket_index = material_index * self.density_count + density_index;
        self.output.bucket_instance_counts[bucket_index as usize] += 1;

        let translated = node.bounds.center() + desc.pre_view_translation;
        let base_height = render_data.base_height + desc.pre_view_translation.z;
        let scale = node.bounds.size().truncate();

        // No next level to morph to from the last density bucket
        let should_morph = desc.lod_morphing_enabled && density_index != self.density_count - 1;
        // The next to last bucket can only morph once
        let can_morph_twice = density_index + 2 < self.density_count;
        let mut packed = lod_level & LOD_MASK;
        if should_morph {
            packed |= SHOULD_MORPH_BIT;
        }
        if can_morph_twice {
            packed |= CAN_MORPH_TWICE_BIT;
        }
        let height_morph = if lod_level == desc.lowest_lod { desc.height_morph } else { 0.0 };

        self.output.staging_instance_data.push(StagingInstanceData {
            bucket_index,
            data: [
                [translated.x, translated.y, base_height, f32::from_bits(node.surface_index.0)],
                [f32::from_bits(packed), height_morph, scale.x, scale.y],
                render_data.hit_color(),
            ],
        });
        self.output.instance_count += 1;
    }
}
