//! Structured error types for tilegrid.

use crate::types::{FixedBands, RegionLocation};

/// All errors that can occur while building or scrolling a grid.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A fill walk could not find the tile it needed inside the valid tile range.
    ///
    /// This means the region's resident tiles are structurally inconsistent;
    /// the fill pass is abandoned instead of looping.
    #[error("no edge tile found in region {region} (tile row {tile_row})")]
    EdgeTileNotFound {
        region: RegionLocation,
        tile_row: u32,
    },

    /// Fixed bands exceed the data source's column or row count.
    #[error("fixed bands {bands:?} do not fit a {columns}x{rows} source")]
    InvalidFixedBands {
        bands: FixedBands,
        columns: u32,
        rows: u32,
    },

    /// Tile size with a zero dimension.
    #[error("tile size must be at least 1x1")]
    InvalidTileSize,

    /// Configuration or component state (de)serialization failure.
    #[error("config: {0}")]
    Config(#[from] serde_json::Error),

    /// Catch-all for string errors.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

impl From<String> for GridError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}
