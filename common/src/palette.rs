use serde::Deserialize;

use crate::error::CanvasError;

/// Number of leading palette entries that are aliases (water, land) and may
/// never be requested as a paint color.
pub const RESERVED_COLORS: usize = 2;

/// Smallest and largest supported canvas side lengths. The upper bound keeps
/// chunk indices within a single protocol byte.
pub const MIN_CANVAS_SIZE: u32 = 256;
pub const MAX_CANVAS_SIZE: u32 = 65_536;

/// An RGB palette value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Squared euclidean distance in RGB space.
    pub fn distance_sq(&self, other: &Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Ordered color palette of a canvas. The position of a color is its index
/// on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// At least one paintable color beyond the reserved aliases is required,
    /// and index 255 stays free for the target's skip marker.
    pub fn new(colors: Vec<Rgb>) -> Result<Self, CanvasError> {
        if colors.len() <= RESERVED_COLORS || colors.len() > 255 {
            return Err(CanvasError::InvalidPalette(colors.len()));
        }
        Ok(Self { colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn value(&self, index: u8) -> Option<Rgb> {
        self.colors.get(index as usize).copied()
    }

    /// Whether two indices render the same. Reserved aliases share RGB
    /// values with regular colors, so index equality is not enough.
    pub fn same_color(&self, a: u8, b: u8) -> bool {
        match (self.value(a), self.value(b)) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        }
    }

    pub fn is_paintable(&self, index: u8) -> bool {
        (index as usize) >= RESERVED_COLORS && (index as usize) < self.colors.len()
    }

    /// Paintable indices with their values, in palette order.
    pub fn paintable(&self) -> impl Iterator<Item = (u8, Rgb)> + '_ {
        self.colors
            .iter()
            .enumerate()
            .skip(RESERVED_COLORS)
            .map(|(i, c)| (i as u8, *c))
    }

    /// Nearest paintable index by squared RGB distance. Ties go to the
    /// lowest index.
    pub fn nearest(&self, color: Rgb) -> u8 {
        let mut best = (RESERVED_COLORS as u8, u32::MAX);
        for (index, value) in self.paintable() {
            let diff = value.distance_sq(&color);
            if diff < best.1 {
                best = (index, diff);
            }
        }
        best.0
    }
}

/// A canvas entry as served by the `/api/me` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasDescriptor {
    #[serde(default)]
    pub title: String,
    pub size: u32,
    pub colors: Vec<[u8; 3]>,
    /// Present only on voxel canvases.
    #[serde(default)]
    pub v: Option<serde_json::Value>,
}

/// Immutable per-canvas metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    id: u8,
    size: u32,
    palette: Palette,
}

impl Canvas {
    pub fn new(id: u8, size: u32, palette: Palette) -> Result<Self, CanvasError> {
        if !size.is_power_of_two() || !(MIN_CANVAS_SIZE..=MAX_CANVAS_SIZE).contains(&size) {
            return Err(CanvasError::InvalidSize(size));
        }
        Ok(Self { id, size, palette })
    }

    pub fn from_descriptor(id: u8, desc: &CanvasDescriptor) -> Result<Self, CanvasError> {
        if desc.v.is_some() {
            return Err(CanvasError::Unsupported(id));
        }
        let palette = Palette::new(desc.colors.iter().copied().map(Rgb::from).collect())?;
        Self::new(id, desc.size, palette)
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn half(&self) -> i64 {
        self.size as i64 / 2
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Whether an absolute coordinate lies within `[-half, half)` on both axes.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        let half = self.half();
        (-half..half).contains(&x) && (-half..half).contains(&y)
    }
}
