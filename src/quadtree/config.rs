//! Quadtree settings, loadable from JSON

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::{UVec2, Vec2};
use crate::core::{Error, Result};
use crate::math::Rect;
use super::builder::QuadTreeBuilder;
use super::traversal::MAX_DENSITY_COUNT;

/// Smallest LOD scale; lower values make morphing degenerate
pub const MIN_LOD_SCALE: f32 = 0.5;

/// Settings for building and traversing a quadtree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadTreeConfig {
    /// World size of one leaf tile
    pub tile_size: f32,
    /// Tiles on each side of the center, per axis
    pub extent_in_tiles: [u32; 2],
    /// LOD distance multiplier, in leaf tiles
    pub lod_scale: f32,
    /// Density above which incomplete subtrees render as one tile
    pub force_collapse_density_level: Option<u32>,
    /// Number of tessellation density buckets
    pub tessellation_factor: u32,
    pub prune_redundant_nodes: bool,
    pub lod_morphing_enabled: bool,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            tile_size: 4096.0,
            extent_in_tiles: [64, 64],
            lod_scale: 1.0,
            force_collapse_density_level: None,
            tessellation_factor: 6,
            prune_redundant_nodes: true,
            lod_morphing_enabled: true,
        }
    }
}

impl QuadTreeConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject settings no tree can be built from. Out-of-range values that
    /// get clamped later are only warned about.
    pub fn validate(&self) -> Result<()> {
        if !(self.tile_size > 0.0) || !self.tile_size.is_finite() {
            return Err(Error::InvalidTileSize(self.tile_size));
        }
        let [x, y] = self.extent_in_tiles;
        if x == 0 || y == 0 {
            return Err(Error::InvalidExtent { x, y });
        }
        if !self.lod_scale.is_finite() {
            return Err(Error::Config(format!("lod_scale must be finite (got {})", self.lod_scale)));
        }

        if self.lod_scale < MIN_LOD_SCALE {
            log::warn!("lod_scale {} below minimum, using {}", self.lod_scale, MIN_LOD_SCALE);
        }
        if self.tessellation_factor != self.density_count() {
            log::warn!(
                "tessellation_factor {} out of range, using {}",
                self.tessellation_factor,
                self.density_count()
            );
        }
        Ok(())
    }

    /// Tessellation factor clamped to 1..=12
    pub fn density_count(&self) -> u32 {
        self.tessellation_factor.clamp(1, MAX_DENSITY_COUNT)
    }

    pub fn effective_lod_scale(&self) -> f32 {
        self.lod_scale.max(MIN_LOD_SCALE)
    }

    /// Area covered by `extent_in_tiles` tiles on each side of `center`
    pub fn world_bounds(&self, center: Vec2) -> Rect {
        let half_extent = UVec2::from(self.extent_in_tiles).as_vec2() * self.tile_size;
        Rect::from_center_half_extent(center, half_extent)
    }

    /// Start a builder for the area around `center`
    pub fn builder(&self, center: Vec2) -> Result<QuadTreeBuilder> {
        self.validate()?;
        QuadTreeBuilder::new(self.world_bounds(center), self.tile_size, UVec2::from(self.extent_in_tiles))
    }

    /// Extent for a stack of tile layers: layer `n` splits a tile into
    /// `max(2, 2^n)` quads per side, and the extent counts how many of those
    /// fit in one tile.
    pub fn extent_for_lod_layer(tile_size: f32, lod_layer: u32) -> [u32; 2] {
        let quads = 2u32.checked_pow(lod_layer).unwrap_or(u32::MAX).max(2);
        let quad_size = tile_size / quads as f32;
        let extent = ((tile_size / quad_size).floor() as u32).max(1);
        [extent, extent]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = QuadTreeConfig::default();
        assert_eq!(config.tile_size, 4096.0);
        assert_eq!(config.extent_in_tiles, [64, 64]);
        assert_eq!(config.force_collapse_density_level, None);
        assert_eq!(config.density_count(), 6);
        assert!(config.prune_redundant_nodes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_clamping() {
        let config = QuadTreeConfig {
            lod_scale: 0.1,
            tessellation_factor: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_lod_scale(), MIN_LOD_SCALE);
        assert_eq!(config.density_count(), 1);
        assert!(config.validate().is_ok());

        let config = QuadTreeConfig { tessellation_factor: 99, ..Default::default() };
        assert_eq!(config.density_count(), MAX_DENSITY_COUNT);
    }

    #[test]
    fn test_validate_rejects_unbuildable() {
        let bad_tile = QuadTreeConfig { tile_size: 0.0, ..Default::default() };
        assert!(matches!(bad_tile.validate(), Err(Error::InvalidTileSize(_))));

        let bad_extent = QuadTreeConfig { extent_in_tiles: [4, 0], ..Default::default() };
        assert!(matches!(bad_extent.validate(), Err(Error::InvalidExtent { x: 4, y: 0 })));

        let bad_scale = QuadTreeConfig { lod_scale: f32::NAN, ..Default::default() };
        assert!(matches!(bad_scale.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_world_bounds() {
        let config = QuadTreeConfig { tile_size: 100.0, extent_in_tiles: [2, 3], ..Default::default() };
        let bounds = config.world_bounds(Vec2::new(50.0, 0.0));
        assert_eq!(bounds, Rect::new(Vec2::new(-150.0, -300.0), Vec2::new(250.0, 300.0)));
    }

    #[test]
    fn test_builder_covers_world_bounds() {
        let config = QuadTreeConfig { tile_size: 10.0, extent_in_tiles: [4, 4], ..Default::default() };
        let builder = config.builder(Vec2::ZERO).unwrap();
        assert_eq!(builder.tree_depth(), 3);
        assert_eq!(builder.tile_region(), Rect::new(Vec2::splat(-40.0), Vec2::splat(40.0)));
        assert_eq!(builder.root().bounds.xy(), Rect::new(Vec2::splat(-40.0), Vec2::splat(40.0)));
    }

    #[test]
    fn test_extent_for_lod_layer() {
        assert_eq!(QuadTreeConfig::extent_for_lod_layer(256.0, 0), [2, 2]);
        assert_eq!(QuadTreeConfig::extent_for_lod_layer(256.0, 1), [2, 2]);
        assert_eq!(QuadTreeConfig::extent_for_lod_layer(256.0, 3), [8, 8]);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("quadtree.json");
        let config = QuadTreeConfig {
            tile_size: 512.0,
            force_collapse_density_level: Some(2),
            lod_morphing_enabled: false,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(QuadTreeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quadtree.json");
        std::fs::write(&path, r#"{ "tile_size": 64.0, "tessellation_factor": 3 }"#).unwrap();

        let config = QuadTreeConfig::load(&path).unwrap();
        assert_eq!(config.tile_size, 64.0);
        assert_eq!(config.density_count(), 3);
        assert_eq!(config.extent_in_tiles, [64, 64]);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(QuadTreeConfig::load(&dir.path().join("missing.json")), Err(Error::Io(_))));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(QuadTreeConfig::load(&path), Err(Error::Json(_))));
    }
}
