//! Engine configuration.
//!
//! `GridConfig` carries the tunables that stay constant for a controller
//! instance (tile size, default extents, cache bound, scroll timings). It
//! deserializes from JSON with camelCase keys; every field has a default.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::error::Result;
use crate::types::{Px, TileSize};

/// Default column width in pixels
pub const DEFAULT_COLUMN_WIDTH: Px = 64.0;

/// Default row height in pixels
pub const DEFAULT_ROW_HEIGHT: Px = 20.0;

/// Default per-region cap on cached tiles.
pub const DEFAULT_MAX_CACHED_TILES: usize = 256;

/// Wheel accumulator flush delay.
pub const DEFAULT_WHEEL_DEBOUNCE_MS: u64 = 10;

/// Window after a programmatic scroll during which native scroll callbacks are ignored.
pub const DEFAULT_PROGRAMMATIC_SCROLL_GUARD_MS: u64 = 400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    pub tile_size: TileSize,
    pub default_column_width: Px,
    pub default_row_height: Px,
    /// Per-column widths, indexed by absolute column.
    pub column_width: Vec<Px>,
    /// Per-region bound on cached tiles. `None` keeps every visited tile.
    pub max_cached_tiles: Option<usize>,
    pub wheel_debounce_ms: u64,
    pub programmatic_scroll_guard_ms: u64,
    /// Visual only.
    pub cell_border: Px,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tile_size: TileSize::default(),
            default_column_width: DEFAULT_COLUMN_WIDTH,
            default_row_height: DEFAULT_ROW_HEIGHT,
            column_width: Vec::new(),
            max_cached_tiles: Some(DEFAULT_MAX_CACHED_TILES),
            wheel_debounce_ms: DEFAULT_WHEEL_DEBOUNCE_MS,
            programmatic_scroll_guard_ms: DEFAULT_PROGRAMMATIC_SCROLL_GUARD_MS,
            cell_border: 0.0,
        }
    }
}

impl GridConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tile_size.validate()?;
        if !(self.default_column_width > 0.0 && self.default_row_height > 0.0) {
            return Err("default column width and row height must be positive".into());
        }
        Ok(())
    }

    pub fn with_tile_size(mut self, columns: u32, rows: u32) -> Self {
        self.tile_size = TileSize::new(columns, rows);
        self
    }

    /// Width of an absolute column.
    pub fn column_width(&self, column: u32) -> Px {
        self.column_width
            .get(column as usize)
            .copied()
            .filter(|w| *w >= 0.0)
            .unwrap_or(self.default_column_width)
    }

    /// Summed width of `count` columns starting at `first`.
    pub fn columns_width(&self, first: u32, count: u32) -> Px {
        (first..first.saturating_add(count))
            .map(|c| self.column_width(c))
            .sum()
    }

    pub fn wheel_debounce(&self) -> Duration {
        Duration::from_millis(self.wheel_debounce_ms)
    }

    pub fn programmatic_scroll_guard(&self) -> Duration {
        Duration::from_millis(self.programmatic_scroll_guard_ms)
    }
}
