//! tilegrid - tile-virtualized data grid viewport engine
//!
//! Displays a two-dimensional dataset of arbitrary size inside a bounded,
//! scrollable area while only materializing the cells near the viewport:
//! - Up to nine regions around frozen leading/trailing rows and columns
//! - Cells rendered in tiles, created on demand and kept in a bounded LRU cache
//! - Row heights synchronized across adjacent tiles
//! - Percentage scrollbar proxy with debounced wheel accumulation
//!
//! # Usage
//!
//! ```
//! use tilegrid::source::FnSource;
//! use tilegrid::{CellValue, GridConfig, GridController};
//!
//! let source = FnSource::new(10, 1_000_000, |c, r| Some(CellValue::from(format!("{c}:{r}"))));
//! let mut grid =
//!     GridController::with_source(GridConfig::default(), Box::new(source), 800.0, 600.0)?;
//! grid.render()?;
//! let range = grid.visible_range();
//! assert_eq!(range.map(|r| r.first_row), Some(0));
//! # Ok::<(), tilegrid::GridError>(())
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod render;
pub mod source;
pub mod types;
pub mod viewer;

pub use config::GridConfig;
pub use error::{GridError, Result};
pub use viewer::{GridController, ScrollEvent, ScrollOrigin, Separators, VisibleRange};

pub use types::*;
