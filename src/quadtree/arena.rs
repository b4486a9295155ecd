//! Flat storage for quadtree nodes and surface render data.
//!
//! The node array is pre-sized to the theoretical maximum for the tree depth
//! so that indices handed out during a build never move.

use super::node::{NodeIndex, QuadNode};
use super::render_data::{SurfaceIndex, SurfaceRenderData};

/// Maximum node count of a full quadtree whose leaf grid is
/// `resolution x resolution` (sum of 4^i for every level).
pub fn max_node_count(resolution: u32) -> usize {
    let cells = resolution as usize * resolution as usize;
    (4 * cells - 1) / 3
}

/// Sole owner of every node and render-data record of one tree.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    nodes: Vec<QuadNode>,
    render_data: Vec<SurfaceRenderData>,
}

impl NodeArena {
    /// Create an arena able to hold `node_capacity` nodes without growing.
    /// Render-data slot 0 is the default record.
    pub fn with_capacity(node_capacity: usize) -> Self {
        let mut render_data = Vec::with_capacity(1);
        render_data.push(SurfaceRenderData::default());
        Self {
            nodes: Vec::with_capacity(node_capacity),
            render_data,
        }
    }

    /// Append a node, returning its index.
    ///
    /// Panics if the pre-sized capacity would be exceeded; that means the
    /// capacity was computed for a shallower tree.
    pub fn push_node(&mut self, node: QuadNode) -> NodeIndex {
        assert!(
            self.nodes.len() < self.nodes.capacity(),
            "node arena overflow: {} nodes allocated",
            self.nodes.capacity()
        );
        let idx = self.nodes.len() as NodeIndex;
        self.nodes.push(node);
        idx
    }

    pub fn node(&self, index: NodeIndex) -> &QuadNode {
        &self.nodes[index as usize]
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> &mut QuadNode {
        &mut self.nodes[index as usize]
    }

    pub fn nodes(&self) -> &[QuadNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub fn push_render_data(&mut self, data: SurfaceRenderData) -> SurfaceIndex {
        let idx = SurfaceIndex(self.render_data.len() as u32);
        self.render_data.push(data);
        idx
    }

    pub fn render_data(&self, index: SurfaceIndex) -> &SurfaceRenderData {
        &self.render_data[index.as_usize()]
    }

    pub fn render_data_slice(&self) -> &[SurfaceRenderData] {
        &self.render_data
    }

    pub fn render_data_mut(&mut self) -> &mut [SurfaceRenderData] {
        &mut self.render_data
    }

    pub fn contains_surface(&self, index: SurfaceIndex) -> bool {
        index.as_usize() < self.render_data.len()
    }

    /// Move the node at `end` into slot `index` and re-link its parent and
    /// children. The node previously at `index` ends up at `end`.
    ///
    /// Any children of the node being removed must already be gone.
    pub fn swap_remove_node(&mut self, index: NodeIndex, end: NodeIndex) {
        if index == end {
            return;
        }
        self.nodes.swap(index as usize, end as usize);

        let moved = self.nodes[index as usize];
        for child in moved.child_indices() {
            self.nodes[child as usize].parent_index = index;
        }
        let parent = &mut self.nodes[moved.parent_index as usize];
        for slot in parent.children.iter_mut() {
            if *slot == end {
                *slot = index;
            }
        }
    }

    /// Drop every node past `len` and release the spare capacity.
    pub fn truncate_nodes(&mut self, len: usize) {
        self.nodes.truncate(len);
        self.nodes.shrink_to_fit();
    }

    /// Bytes allocated for nodes and render data
    pub fn allocated_size(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<QuadNode>()
            + self.render_data.capacity() * std::mem::size_of::<SurfaceRenderData>()
    }
}
