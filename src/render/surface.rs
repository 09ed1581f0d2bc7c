//! Measurement and display surface.
//!
//! Tiles are measured synchronously while they are created: the surface gets
//! the rendered cells together with the column widths and reports the tile's
//! size. Displayed tiles are announced through `attach`/`detach`, and scroll
//! shifts through `translate`, so a host can mirror them on a real canvas.

use super::RenderedCell;
use crate::types::{CellRange, Px, Rect, RegionLocation, TileKey};

/// Laid-out content of one tile, handed to `Surface::measure`.
#[derive(Debug)]
pub struct TileLayout<'a> {
    pub range: CellRange,
    /// Width of each column of the range, left to right.
    pub column_widths: &'a [Px],
    /// Rendered cells, row-major over the range.
    pub cells: &'a [Option<RenderedCell>],
    pub default_row_height: Px,
}

impl TileLayout<'_> {
    /// Cells of one row of the tile (0-based within the tile).
    pub fn row_cells(&self, index: usize) -> &[Option<RenderedCell>] {
        let columns = self.range.columns() as usize;
        let start = index.saturating_mul(columns);
        self.cells
            .get(start..start.saturating_add(columns))
            .unwrap_or_default()
    }
}

/// Measured size of a tile.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileMetrics {
    pub width: Px,
    /// Height of each row of the tile, top to bottom.
    pub row_heights: Vec<Px>,
}

impl TileMetrics {
    pub fn height(&self) -> Px {
        self.row_heights.iter().sum()
    }
}

pub trait Surface {
    /// Measure a tile. Must answer synchronously.
    fn measure(&mut self, layout: &TileLayout<'_>) -> TileMetrics;

    /// A tile became visible at `bounds` (region-local pixels).
    fn attach(&mut self, _region: RegionLocation, _tile: TileKey, _bounds: Rect) {}

    /// A tile left the display. Its cache entry may survive.
    fn detach(&mut self, _region: RegionLocation, _tile: TileKey) {}

    /// Every displayed tile of a region moved by `(dx, dy)`.
    fn translate(&mut self, _region: RegionLocation, _dx: Px, _dy: Px) {}

    /// A displayed tile was resized or moved on its own (row height sync).
    fn reposition(&mut self, _region: RegionLocation, _tile: TileKey, _bounds: Rect) {}
}

/// Default surface: tile width is the sum of its column widths, each row is as
/// tall as its tallest rendered cell (never shorter than the default height).
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricSurface;

impl Surface for MetricSurface {
    fn measure(&mut self, layout: &TileLayout<'_>) -> TileMetrics {
        let row_heights = (0..layout.range.rows() as usize)
            .map(|i| {
                layout
                    .row_cells(i)
                    .iter()
                    .flatten()
                    .map(|cell| cell.height)
                    .fold(layout.default_row_height, f64::max)
            })
            .collect();
        TileMetrics {
            width: layout.column_widths.iter().sum(),
            row_heights,
        }
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

    fn cell(height: Px) -> Option<RenderedCell> {
        Some(RenderedCell {
            text: String::new(),
            width: 10.0,
            height,
        })
    }

    #[test]
    fn test_metric_surface_row_heights() {
        let cells = vec![cell(12.0), cell(35.0), None, cell(18.0)];
        let layout = TileLayout {
            range: CellRange::new(4, 10, 5, 11),
            column_widths: &[30.0, 45.0],
            cells: &cells,
            default_row_height: 20.0,
        };
        let metrics = MetricSurface.measure(&layout);
        assert_eq!(metrics.width, 75.0);
        assert_eq!(metrics.row_heights, vec![35.0, 20.0]);
        assert_eq!(metrics.height(), 55.0);
    }

    #[test]
    fn test_row_cells_out_of_range_is_empty() {
        let layout = TileLayout {
            range: CellRange::new(0, 0, 1, 0),
            column_widths: &[10.0, 10.0],
            cells: &[],
            default_row_height: 20.0,
        };
        assert!(layout.row_cells(3).is_empty());
    }
}
