//! Per-surface render records referenced by quadtree nodes

/// Index into the tree's render-data table. Index 0 is the default
/// "no surface" record owned by untouched nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SurfaceIndex(pub u32);

impl SurfaceIndex {
    pub const NONE: Self = Self(0);

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Opaque material reference owned by the rendering backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MaterialHandle(pub u32);

/// Opaque hit-test handle used for picking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HitProxyId(pub u32);

impl HitProxyId {
    /// Id encoded as a linear RGB color, one byte per channel
    /// (bits 16-23 red, 8-15 green, 0-7 blue).
    pub fn color(self) -> [f32; 3] {
        [
            ((self.0 >> 16) & 0xFF) as f32 / 255.0,
            ((self.0 >> 8) & 0xFF) as f32 / 255.0,
            (self.0 & 0xFF) as f32 / 255.0,
        ]
    }
}

/// Render data for one surface inserted into the tree.
///
/// Immutable once registered with the builder, except for
/// `material_index` which is assigned when the tree is unlocked.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceRenderData {
    /// Material to draw the surface with; `None` never renders
    pub material: Option<MaterialHandle>,
    /// Height of the undisplaced surface
    pub base_height: f32,
    /// Whether the owning object is selected (tints picked tiles)
    pub selected: bool,
    /// Hit-test handle for picking
    pub hit_proxy: Option<HitProxyId>,
    /// Dense index of `material` in the tree's material list
    pub material_index: Option<u32>,
}

impl SurfaceRenderData {
    pub fn new(material: MaterialHandle, base_height: f32) -> Self {
        Self {
            material: Some(material),
            base_height,
            ..Default::default()
        }
    }

    pub fn with_hit_proxy(mut self, hit_proxy: HitProxyId, selected: bool) -> Self {
        self.hit_proxy = Some(hit_proxy);
        self.selected = selected;
        self
    }

    pub fn has_material(&self) -> bool {
        self.material.is_some()
    }

    /// Picking color channel: hit proxy RGB plus selection in alpha
    pub fn hit_color(&self) -> [f32; 4] {
        let [r, g, b] = self.hit_proxy.map(HitProxyId::color).unwrap_or([0.0; 3]);
        [r, g, b, if self.selected { 1.0 } else { 0.0 }]
    }
}
