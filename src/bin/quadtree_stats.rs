//! Quadtree statistics tool: builds a tree from scattered surface patches
//! and reports node counts and per-view traversal results.
//!
//! Usage: cargo run --release --bin quadtree_stats -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>     JSON quadtree config (default: built-in defaults)
//!   --tiles <N>         Extent in tiles on each side (overrides config)
//!   --tile-size <SIZE>  Leaf tile size (overrides config)
//!   --surfaces <N>      Number of surface patches to insert (default: 32)
//!   --views <N>         Observers traversed in parallel (default: 4)
//!   --seed <SEED>       Patch layout seed (default: 12345)
//!   --no-prune          Keep redundant nodes

use std::path::PathBuf;
use std::time::Instant;

use glam::{Mat4, Vec2, Vec3};

use quadmesh::core::Result;
use quadmesh::math::{Aabb, Frustum};
use quadmesh::quadtree::{
    HitProxyId, InstanceBuffers, MaterialHandle, QuadTreeConfig, SurfaceRenderData, TraversalDesc,
};

const MATERIAL_COUNT: u32 = 3;

fn main() -> Result<()> {
    quadmesh::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => QuadTreeConfig::load(&PathBuf::from(path))?,
        None => QuadTreeConfig::default(),
    };
    if let Some(tiles) = parse_u32_arg(&args, "--tiles") {
        config.extent_in_tiles = [tiles, tiles];
    }
    if let Some(tile_size) = parse_f32_arg(&args, "--tile-size") {
        config.tile_size = tile_size;
    }
    if args.iter().any(|a| a == "--no-prune") {
        config.prune_redundant_nodes = false;
    }
    let surface_count = parse_u32_arg(&args, "--surfaces").unwrap_or(32);
    let view_count = parse_u32_arg(&args, "--views").unwrap_or(4).max(1);
    let mut rng = XorShift(parse_u32_arg(&args, "--seed").unwrap_or(12345).max(1));

    log::info!("=== Quadtree Stats ===");
    log::info!(
        "Tile size: {}, extent: {}x{} tiles, prune: {}",
        config.tile_size, config.extent_in_tiles[0], config.extent_in_tiles[1], config.prune_redundant_nodes
    );

    let build_start = Instant::now();
    let mut builder = config.builder(Vec2::ZERO)?;
    let region = builder.tile_region();

    for i in 0..surface_count {
        let size = region.size() * Vec2::new(0.05 + 0.25 * rng.next_f32(), 0.05 + 0.25 * rng.next_f32());
        let min = region.min + (region.size() - size) * Vec2::new(rng.next_f32(), rng.next_f32());
        let height = 100.0 * rng.next_f32();

        let mut data = SurfaceRenderData::new(MaterialHandle(i % MATERIAL_COUNT + 1), height)
            .with_hit_proxy(HitProxyId(i + 1), false);
        // Every fifth patch is a hole cut into what was inserted before it
        if i % 5 == 4 {
            data.material = None;
        }
        let surface = builder.add_render_data(data);
        builder.add_surface(Aabb::new(min.extend(height - 1.0), (min + size).extend(height + 1.0)), surface)?;
    }
    let built_nodes = builder.node_count();
    let tree = builder.unlock(config.prune_redundant_nodes);
    let build_time = build_start.elapsed();

    log::info!(
        "Built {} surfaces in {:.2}ms: {} nodes -> {} after unlock, depth {}, {} materials, {:.1} KiB",
        surface_count,
        build_time.as_secs_f64() * 1000.0,
        built_nodes,
        tree.node_count(),
        tree.tree_depth(),
        tree.materials().len(),
        tree.allocated_size() as f64 / 1024.0
    );

    let descs: Vec<TraversalDesc> = (0..view_count)
        .map(|v| {
            let angle = v as f32 / view_count as f32 * std::f32::consts::TAU;
            let xy = region.center() + Vec2::new(angle.cos(), angle.sin()) * region.size() * 0.25;
            let observer = Vec3::new(xy.x, xy.y, 50.0 + 400.0 * v as f32);
            // Looking toward the region center from above
            let view = Mat4::look_at_rh(observer, region.center().extend(0.0), Vec3::Z);
            let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 1.0, region.size().max_element() * 4.0);
            TraversalDesc::for_view(&tree, &config, observer, Frustum::from_view_projection(&(proj * view)))
        })
        .collect();

    let traversal_start = Instant::now();
    let outputs = tree.build_instance_data_for_views(&descs);
    let traversal_time = traversal_start.elapsed();

    for (desc, output) in descs.iter().zip(&outputs) {
        let buffers = InstanceBuffers::from_output(output, true);
        let draws = buffers.non_empty_buckets().count();
        log::info!(
            "View at ({:.0}, {:.0}, {:.0}): lowest LOD {}, {} instances in {} draws, {} bytes per stream",
            desc.observer_position.x,
            desc.observer_position.y,
            desc.observer_position.z,
            desc.lowest_lod,
            output.instance_count,
            draws,
            buffers.buffer_size()
        );
    }
    log::info!(
        "Traversed {} views in {:.2}ms",
        view_count,
        traversal_time.as_secs_f64() * 1000.0
    );

    Ok(())
}

/// Small deterministic generator for patch layout
struct XorShift(u32);

impl XorShift {
    fn next_f32(&mut self) -> f32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        (self.0 >> 8) as f32 / (1u32 << 24) as f32
    }
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
