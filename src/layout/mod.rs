//! Tile layout engine.
//!
//! This module handles:
//! - Mapping tile coordinates of a region to absolute cell ranges
//! - Creating, caching and evicting tiles per region
//! - Filling a region's viewport with adjacent tiles after a scroll
//! - Keeping row heights consistent across a row of tiles
//! - Tracking the scroll position as an index or a percent

mod region;
mod scroll_position;
mod tile;

pub use region::{BorderTiles, Region};
pub use scroll_position::{AxisPosition, ScrollPosition};
pub use tile::{cell_range_for, Anchor, Tile};

use crate::config::GridConfig;
use crate::render::{CellRenderer, Surface};
use crate::source::DataSource;
use crate::types::{FixedBands, GridExtent};

/// Collaborators a region needs while it creates and places tiles.
///
/// Built by the controller for the duration of one operation, so regions never
/// hold references back into the controller.
pub struct TileEnv<'a> {
    pub source: &'a dyn DataSource,
    pub renderer: &'a mut dyn CellRenderer,
    pub surface: &'a mut dyn Surface,
    pub config: &'a GridConfig,
    pub bands: FixedBands,
    /// Source counts captured at the last structural rebuild.
    pub counts: GridExtent,
}
