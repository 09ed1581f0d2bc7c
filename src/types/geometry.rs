//! Geometry shared by regions, tiles and the controller.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GridError, Result};

/// Logical pixels.
pub type Px = f64;

/// Scroll/layout axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];
}

/// Position of a band along one axis: frozen before, scrolling, or frozen after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    Leading,
    Center,
    Trailing,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Leading, Band::Center, Band::Trailing];

    /// The `-1 / 0 / 1` tag for this band.
    pub fn offset(self) -> i8 {
        match self {
            Self::Leading => -1,
            Self::Center => 0,
            Self::Trailing => 1,
        }
    }
}

/// Location tag of a region: `(h, v)` with each component in `{-1, 0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionLocation {
    pub h: Band,
    pub v: Band,
}

impl RegionLocation {
    pub const CENTER: RegionLocation = RegionLocation {
        h: Band::Center,
        v: Band::Center,
    };

    pub fn new(h: Band, v: Band) -> Self {
        Self { h, v }
    }

    /// All nine locations, row by row from the top-left corner.
    pub fn all() -> impl Iterator<Item = RegionLocation> {
        Band::ALL
            .into_iter()
            .flat_map(|v| Band::ALL.into_iter().map(move |h| RegionLocation { h, v }))
    }

    /// Band along the given axis.
    pub fn band(self, axis: Axis) -> Band {
        match axis {
            Axis::Horizontal => self.h,
            Axis::Vertical => self.v,
        }
    }

    /// Whether content in this region follows scrolling along `axis`.
    pub fn scrolls(self, axis: Axis) -> bool {
        self.band(axis) == Band::Center
    }
}

impl fmt::Display for RegionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.h.offset(), self.v.offset())
    }
}

/// Rectangle in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: Px,
    pub y: Px,
    pub width: Px,
    pub height: Px,
}

impl Rect {
    pub fn new(x: Px, y: Px, width: Px, height: Px) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> Px {
        self.x + self.width
    }

    pub fn bottom(&self) -> Px {
        self.y + self.height
    }

    /// Extent along an axis.
    pub fn extent(&self, axis: Axis) -> Px {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Closed-interval overlap test: does `[a1, a2]` intersect `[b1, b2]`?
pub fn intersect(a1: Px, a2: Px, b1: Px, b2: Px) -> bool {
    (b1 <= a1 && a1 <= b2) || (a1 <= b1 && b1 <= a2)
}

/// Inclusive range of absolute data-source indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl CellRange {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn columns(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn rows(&self) -> u32 {
        self.bottom - self.top + 1
    }

    pub fn cell_count(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    pub fn contains(&self, column: u32, row: u32) -> bool {
        (self.left..=self.right).contains(&column) && (self.top..=self.bottom).contains(&row)
    }

    /// Start index along an axis.
    pub fn start(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Horizontal => self.left,
            Axis::Vertical => self.top,
        }
    }

    /// Last index (inclusive) along an axis.
    pub fn end(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Horizontal => self.right,
            Axis::Vertical => self.bottom,
        }
    }
}

/// Granularity of the tile cache, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub columns: u32,
    pub rows: u32,
}

impl Default for TileSize {
    fn default() -> Self {
        Self {
            columns: 5,
            rows: 10,
        }
    }
}

impl TileSize {
    pub fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.rows == 0 {
            return Err(GridError::InvalidTileSize);
        }
        Ok(())
    }

    pub fn along(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Horizontal => self.columns,
            Axis::Vertical => self.rows,
        }
    }
}

/// Counts of frozen columns/rows on each side of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixedBands {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl FixedBands {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Check `left + right <= columns` and `top + bottom <= rows`.
    pub fn validate(&self, columns: u32, rows: u32) -> Result<()> {
        let fits_h = self
            .left
            .checked_add(self.right)
            .is_some_and(|sum| sum <= columns);
        let fits_v = self
            .top
            .checked_add(self.bottom)
            .is_some_and(|sum| sum <= rows);
        if fits_h && fits_v {
            Ok(())
        } else {
            Err(GridError::InvalidFixedBands {
                bands: *self,
                columns,
                rows,
            })
        }
    }

    /// `(leading, trailing)` counts along an axis.
    pub fn along(&self, axis: Axis) -> (u32, u32) {
        match axis {
            Axis::Horizontal => (self.left, self.right),
            Axis::Vertical => (self.top, self.bottom),
        }
    }
}

/// Cell extent of a data source or a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridExtent {
    pub columns: u32,
    pub rows: u32,
}

impl GridExtent {
    pub fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    pub fn along(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Horizontal => self.columns,
            Axis::Vertical => self.rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }

    /// First index and count of a band along an axis, given fixed bands.
    pub fn band_span(&self, axis: Axis, band: Band, bands: &FixedBands) -> (u32, u32) {
        let count = self.along(axis);
        let (leading, trailing) = bands.along(axis);
        let leading = leading.min(count);
        let trailing = trailing.min(count - leading);
        match band {
            Band::Leading => (0, leading),
            Band::Center => (leading, count - leading - trailing),
            Band::Trailing => (count - trailing, trailing),
        }
    }
}

/// Tile coordinates within a region. Ordered row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub row: u32,
    pub column: u32,
}

impl TileKey {
    pub fn new(column: u32, row: u32) -> Self {
        Self { row, column }
    }

    pub fn along(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Horizontal => self.column,
            Axis::Vertical => self.row,
        }
    }
}

/// Number of units of `size` needed to cover `count` items.
pub fn ceil_div(count: u32, size: u32) -> u32 {
    if size == 0 {
        return 0;
    }
    count.div_ceil(size)
}

/// Floor of a non-negative fractional index, clamped to `[0, upper)`.
///
/// Returns 0 when `upper` is 0 or the value is not finite.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn floor_index(value: f64, upper: u32) -> u32 {
    if upper == 0 || !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let floored = value.floor();
    if floored >= f64::from(upper) {
        upper - 1
    } else {
        floored as u32
    }
}

/// Clamp a scroll percentage into `[0, 100]`; NaN becomes 0.
pub fn clamp_percent(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_closed_intervals() {
        assert!(intersect(-10.0, 40.0, 0.0, 100.0));
        assert!(intersect(100.0, 150.0, 0.0, 100.0));
        assert!(intersect(-50.0, 0.0, 0.0, 100.0));
        assert!(!intersect(-150.0, -100.0, 0.0, 100.0));
        assert!(!intersect(101.0, 120.0, 0.0, 100.0));
    }

    #[test]
    fn test_band_span() {
        let extent = GridExtent::new(10, 100);
        let bands = FixedBands::new(2, 1, 3, 0);
        assert_eq!(extent.band_span(Axis::Horizontal, Band::Leading, &bands), (0, 2));
        assert_eq!(extent.band_span(Axis::Horizontal, Band::Center, &bands), (2, 5));
        assert_eq!(extent.band_span(Axis::Horizontal, Band::Trailing, &bands), (7, 3));
        assert_eq!(extent.band_span(Axis::Vertical, Band::Center, &bands), (1, 99));
        assert_eq!(extent.band_span(Axis::Vertical, Band::Trailing, &bands), (100, 0));
    }

    #[test]
    fn test_fixed_bands_validate() {
        assert!(FixedBands::new(2, 2, 2, 2).validate(4, 4).is_ok());
        assert!(FixedBands::new(3, 0, 2, 0).validate(4, 4).is_err());
        assert!(FixedBands::new(0, u32::MAX, 0, 1).validate(4, 4).is_err());
    }

    #[test]
    fn test_floor_index() {
        assert_eq!(floor_index(3.7, 10), 3);
        assert_eq!(floor_index(-1.0, 10), 0);
        assert_eq!(floor_index(12.0, 10), 9);
        assert_eq!(floor_index(f64::NAN, 10), 0);
        assert_eq!(floor_index(5.0, 0), 0);
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(42.5), 42.5);
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert_eq!(clamp_percent(250.0), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
        assert_eq!(clamp_percent(f64::INFINITY), 100.0);
    }

    #[test]
    fn test_region_locations_cover_nine() {
        let all: Vec<_> = RegionLocation::all().collect();
        assert_eq!(all.len(), 9);
        assert_eq!(all[4], RegionLocation::CENTER);
        assert_eq!(RegionLocation::CENTER.to_string(), "(0, 0)");
    }

    #[test]
    fn test_tile_key_orders_row_major() {
        let a = TileKey::new(5, 0);
        let b = TileKey::new(0, 1);
        assert!(a < b);
    }
}
