//! Tiles: cached rectangular blocks of rendered cells.
//!
//! A tile is created lazily the first time its region references it. Creation
//! renders each cell once and measures the result; afterwards the tile only
//! moves (when displayed) or changes row heights during synchronization.

use std::collections::BTreeMap;

use tracing::trace;

use super::TileEnv;
use crate::render::{CellContext, CellRenderer, RenderedCell, Surface, TileLayout};
use crate::types::{
    intersect, Axis, CellRange, FixedBands, GridExtent, Px, Rect, RegionLocation, TileKey,
    TileSize,
};

/// Placement request for `Tile::display`.
///
/// `right`/`bottom` are resolved against the tile's measured size, so a tile
/// can be placed next to a neighbour without knowing its own extent up front.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Anchor {
    pub left: Option<Px>,
    pub top: Option<Px>,
    pub right: Option<Px>,
    pub bottom: Option<Px>,
}

impl Anchor {
    pub fn top_left(left: Px, top: Px) -> Self {
        Self {
            left: Some(left),
            top: Some(top),
            ..Self::default()
        }
    }

    pub fn top_right(right: Px, top: Px) -> Self {
        Self {
            right: Some(right),
            top: Some(top),
            ..Self::default()
        }
    }

    pub fn bottom_left(left: Px, bottom: Px) -> Self {
        Self {
            left: Some(left),
            bottom: Some(bottom),
            ..Self::default()
        }
    }
}

/// Absolute cell range covered by the tile at `key` of the region at `location`.
///
/// Each axis is offset into its band (leading fixed, scrolling center, or
/// trailing fixed) and clamped to `counts`. Returns `None` when the tile lies
/// past the end of its band.
pub fn cell_range_for(
    key: TileKey,
    location: RegionLocation,
    tile_size: TileSize,
    bands: &FixedBands,
    counts: GridExtent,
) -> Option<CellRange> {
    let (left, right) = axis_span(key, location, Axis::Horizontal, tile_size, bands, counts)?;
    let (top, bottom) = axis_span(key, location, Axis::Vertical, tile_size, bands, counts)?;
    Some(CellRange::new(left, top, right, bottom))
}

fn axis_span(
    key: TileKey,
    location: RegionLocation,
    axis: Axis,
    tile_size: TileSize,
    bands: &FixedBands,
    counts: GridExtent,
) -> Option<(u32, u32)> {
    let (first, count) = counts.band_span(axis, location.band(axis), bands);
    let per_tile = tile_size.along(axis);
    let offset = key.along(axis).checked_mul(per_tile)?;
    if offset >= count {
        return None;
    }
    let end = count.min(offset.saturating_add(per_tile));
    Some((first + offset, first + end - 1))
}

#[derive(Debug)]
pub struct Tile {
    key: TileKey,
    range: CellRange,
    cells: Vec<Option<RenderedCell>>,
    context: CellContext,
    column_widths: Vec<Px>,
    row_heights: Vec<Px>,
    width: Px,
    height: Px,
    x: Px,
    y: Px,
    created: bool,
    displayed: bool,
}

impl Tile {
    pub fn new(key: TileKey, range: CellRange) -> Self {
        Self {
            key,
            range,
            cells: Vec::new(),
            context: CellContext::new(),
            column_widths: Vec::new(),
            row_heights: Vec::new(),
            width: 0.0,
            height: 0.0,
            x: 0.0,
            y: 0.0,
            created: false,
            displayed: false,
        }
    }

    /// Render and measure the tile's cells. Does nothing once created.
    pub fn create(&mut self, env: &mut TileEnv<'_>) {
        if self.created {
            return;
        }
        let range = self.range;
        env.source.prefetch(range);

        self.column_widths = (range.left..=range.right)
            .map(|c| env.config.column_width(c))
            .collect();

        let mut cells = Vec::with_capacity(range.cell_count());
        for row in range.top..=range.bottom {
            for column in range.left..=range.right {
                let value = env.source.get(column, row);
                cells.push(
                    env.renderer
                        .render(&mut self.context, value.as_ref(), column, row),
                );
            }
        }

        let metrics = env.surface.measure(&TileLayout {
            range,
            column_widths: &self.column_widths,
            cells: &cells,
            default_row_height: env.config.default_row_height,
        });
        let mut row_heights = metrics.row_heights;
        row_heights.resize(range.rows() as usize, env.config.default_row_height);

        self.cells = cells;
        self.width = metrics.width;
        self.height = row_heights.iter().sum();
        self.row_heights = row_heights;
        self.created = true;
        trace!(
            tile = ?self.key,
            ?range,
            width = self.width,
            height = self.height,
            "tile created"
        );
    }

    /// Attach the tile to the display at `anchor`. No-op if already displayed.
    pub fn display(&mut self, anchor: Anchor, region: RegionLocation, surface: &mut dyn Surface) {
        if self.displayed {
            return;
        }
        self.x = anchor
            .left
            .or_else(|| anchor.right.map(|r| r - self.width))
            .unwrap_or(0.0);
        self.y = anchor
            .top
            .or_else(|| anchor.bottom.map(|b| b - self.height))
            .unwrap_or(0.0);
        self.displayed = true;
        surface.attach(region, self.key, self.bounds());
    }

    /// Detach from display; the tile stays cached.
    pub fn remove(&mut self, region: RegionLocation, surface: &mut dyn Surface) {
        if !self.displayed {
            return;
        }
        self.displayed = false;
        surface.detach(region, self.key);
    }

    /// Release renderer state for every cell and drop rendered content.
    pub fn dispose(&mut self, renderer: &mut dyn CellRenderer) {
        for row in self.range.top..=self.range.bottom {
            for column in self.range.left..=self.range.right {
                renderer.dispose(&mut self.context, column, row);
            }
        }
        self.context.clear();
        self.cells.clear();
        self.created = false;
        self.displayed = false;
    }

    /// Move a displayed tile.
    pub fn shift(&mut self, dx: Px, dy: Px) {
        self.x += dx;
        self.y += dy;
    }

    /// Displayed and overlapping `[0, width] x [0, height]` (closed intervals).
    pub fn is_on_screen(&self, region_width: Px, region_height: Px) -> bool {
        self.displayed
            && intersect(self.x, self.x + self.width, 0.0, region_width)
            && intersect(self.y, self.y + self.height, 0.0, region_height)
    }

    pub fn is_edge_left(&self) -> bool {
        self.displayed && self.x <= 0.0 && 0.0 <= self.x + self.width
    }

    pub fn is_edge_right(&self, region_width: Px) -> bool {
        self.displayed && self.x <= region_width && region_width <= self.x + self.width
    }

    pub fn is_edge_top(&self) -> bool {
        self.displayed && self.y <= 0.0 && 0.0 <= self.y + self.height
    }

    pub fn is_edge_bottom(&self, region_height: Px) -> bool {
        self.displayed && self.y <= region_height && region_height <= self.y + self.height
    }

    /// Force one row (0-based within the tile) to `height`; the tile's total
    /// height changes by the same delta.
    pub fn set_row_height(&mut self, index: usize, height: Px) {
        if let Some(current) = self.row_heights.get_mut(index) {
            let delta = height - *current;
            *current = height;
            self.height += delta;
        }
    }

    /// Raise rows to their height in `tallest`, keyed by absolute row.
    /// Returns whether any row grew.
    pub fn grow_rows_to(&mut self, tallest: &BTreeMap<u32, Px>) -> bool {
        let mut grew = false;
        for (index, row) in (self.range.top..=self.range.bottom).enumerate() {
            let target = tallest.get(&row).copied().unwrap_or(0.0);
            if self.row_heights.get(index).is_some_and(|h| *h < target) {
                self.set_row_height(index, target);
                grew = true;
            }
        }
        grew
    }

    /// Fractional absolute index at region-local pixel `px` along `axis`.
    pub fn index_at(&self, axis: Axis, px: Px) -> f64 {
        let (start, sizes) = match axis {
            Axis::Horizontal => (self.x, &self.column_widths),
            Axis::Vertical => (self.y, &self.row_heights),
        };
        let mut offset = px - start;
        let mut index = f64::from(self.range.start(axis));
        for size in sizes {
            if offset < *size {
                if *size > 0.0 && offset > 0.0 {
                    index += offset / size;
                }
                return index;
            }
            offset -= size;
            index += 1.0;
        }
        index
    }

    /// Pixel offset of an absolute index from the tile's leading edge.
    pub fn offset_of(&self, axis: Axis, index: u32) -> Px {
        let (start, sizes) = match axis {
            Axis::Horizontal => (self.range.left, &self.column_widths),
            Axis::Vertical => (self.range.top, &self.row_heights),
        };
        sizes
            .iter()
            .take(index.saturating_sub(start) as usize)
            .sum()
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn range(&self) -> CellRange {
        self.range
    }

    pub fn cells(&self) -> &[Option<RenderedCell>] {
        &self.cells
    }

    /// Rendered cell at absolute `(column, row)`, if inside this tile.
    pub fn cell(&self, column: u32, row: u32) -> Option<&RenderedCell> {
        if !self.range.contains(column, row) {
            return None;
        }
        let index = (row - self.range.top) as usize * self.range.columns() as usize
            + (column - self.range.left) as usize;
        self.cells.get(index).and_then(Option::as_ref)
    }

    pub fn context(&self) -> &CellContext {
        &self.context
    }

    pub fn width(&self) -> Px {
        self.width
    }

    pub fn height(&self) -> Px {
        self.height
    }

    pub fn row_heights(&self) -> &[Px] {
        &self.row_heights
    }

    pub fn column_widths(&self) -> &[Px] {
        &self.column_widths
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    /// Region-local bounds. Only meaningful while displayed.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
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
    use crate::config::GridConfig;
    use crate::render::{MetricSurface, TextRenderer};
    use crate::source::FnSource;
    use crate::types::{Band, CellValue};

    fn center() -> RegionLocation {
        RegionLocation::CENTER
    }

    #[test]
    fn test_cell_range_center_band() {
        let bands = FixedBands::new(1, 2, 1, 0);
        let counts = GridExtent::new(12, 100);
        let range = cell_range_for(
            TileKey::new(1, 3),
            center(),
            TileSize::new(4, 5),
            &bands,
            counts,
        )
        .unwrap();
        assert_eq!(range, CellRange::new(5, 17, 8, 21));
    }

    #[test]
    fn test_cell_range_clamped_to_band_end() {
        let bands = FixedBands::new(1, 0, 1, 0);
        let counts = GridExtent::new(12, 7);
        // Center columns are 1..=10; second tile of width 8 is clamped to 9..=10
        let range = cell_range_for(
            TileKey::new(1, 0),
            center(),
            TileSize::new(8, 5),
            &bands,
            counts,
        )
        .unwrap();
        assert_eq!((range.left, range.right), (9, 10));
        assert_eq!((range.top, range.bottom), (0, 4));
        assert!(cell_range_for(
            TileKey::new(2, 0),
            center(),
            TileSize::new(8, 5),
            &bands,
            counts
        )
        .is_none());
    }

    #[test]
    fn test_cell_range_fixed_bands() {
        let bands = FixedBands::new(2, 1, 3, 2);
        let counts = GridExtent::new(20, 50);
        let tile = TileSize::new(5, 5);
        let leading = RegionLocation::new(Band::Leading, Band::Leading);
        let trailing = RegionLocation::new(Band::Trailing, Band::Trailing);
        assert_eq!(
            cell_range_for(TileKey::new(0, 0), leading, tile, &bands, counts),
            Some(CellRange::new(0, 0, 1, 0))
        );
        assert_eq!(
            cell_range_for(TileKey::new(0, 0), trailing, tile, &bands, counts),
            Some(CellRange::new(17, 48, 19, 49))
        );
    }

    fn env_parts() -> (impl crate::source::DataSource, TextRenderer, MetricSurface, GridConfig) {
        let source = FnSource::new(10, 10, |c, r| Some(CellValue::Number(f64::from(c * 100 + r))));
        (source, TextRenderer::default(), MetricSurface, GridConfig::default())
    }

    #[test]
    fn test_create_is_idempotent() {
        let (source, mut renderer, mut surface, config) = env_parts();
        let mut env = TileEnv {
            source: &source,
            renderer: &mut renderer,
            surface: &mut surface,
            config: &config,
            bands: FixedBands::default(),
            counts: GridExtent::new(10, 10),
        };
        let mut tile = Tile::new(TileKey::new(0, 0), CellRange::new(2, 3, 4, 5));
        tile.create(&mut env);
        let first = (tile.width(), tile.height(), tile.cells().to_vec());
        tile.create(&mut env);
        assert_eq!((tile.width(), tile.height(), tile.cells().to_vec()), first);
        assert_eq!(tile.cells().len(), 9);
        assert_eq!(tile.cell(3, 4).unwrap().text, "304");
        assert!(tile.cell(5, 4).is_none());
    }

    #[test]
    fn test_display_resolves_right_bottom() {
        let (source, mut renderer, mut surface, config) = env_parts();
        let mut env = TileEnv {
            source: &source,
            renderer: &mut renderer,
            surface: &mut surface,
            config: &config,
            bands: FixedBands::default(),
            counts: GridExtent::new(10, 10),
        };
        let mut tile = Tile::new(TileKey::new(0, 0), CellRange::new(0, 0, 1, 1));
        tile.create(&mut env);
        tile.display(
            Anchor {
                right: Some(300.0),
                bottom: Some(100.0),
                ..Anchor::default()
            },
            center(),
            &mut MetricSurface,
        );
        assert_eq!(tile.bounds().x, 300.0 - 2.0 * config.default_column_width);
        assert_eq!(tile.bounds().y, 100.0 - 2.0 * config.default_row_height);

        // Second display is ignored
        tile.display(Anchor::top_left(0.0, 0.0), center(), &mut MetricSurface);
        assert_eq!(tile.bounds().bottom(), 100.0);
    }

    #[test]
    fn test_edges_and_on_screen() {
        let mut tile = Tile::new(TileKey::new(0, 0), CellRange::new(0, 0, 0, 0));
        tile.width = 50.0;
        tile.height = 20.0;
        tile.display(Anchor::top_left(-10.0, 0.0), center(), &mut MetricSurface);
        assert!(tile.is_edge_left());
        assert!(tile.is_edge_top());
        assert!(!tile.is_edge_right(100.0));
        assert!(tile.is_on_screen(100.0, 100.0));

        tile.shift(-140.0, 0.0);
        assert_eq!(tile.bounds().x, -150.0);
        assert!(!tile.is_on_screen(100.0, 100.0));
        assert!(!tile.is_edge_left());
    }

    #[test]
    fn test_set_row_height_adjusts_total() {
        let mut tile = Tile::new(TileKey::new(0, 0), CellRange::new(0, 0, 0, 2));
        tile.row_heights = vec![20.0, 20.0, 20.0];
        tile.height = 60.0;
        tile.set_row_height(1, 35.0);
        assert_eq!(tile.row_heights(), &[20.0, 35.0, 20.0]);
        assert_eq!(tile.height(), 75.0);
        tile.set_row_height(7, 100.0);
        assert_eq!(tile.height(), 75.0);
    }

    #[test]
    fn test_grow_rows_to_absolute_rows() {
        let mut tile = Tile::new(TileKey::new(0, 1), CellRange::new(0, 3, 0, 5));
        tile.row_heights = vec![20.0, 40.0, 20.0];
        tile.height = 80.0;
        let tallest = BTreeMap::from([(3, 20.0), (4, 30.0), (5, 45.0), (6, 90.0)]);
        assert!(tile.grow_rows_to(&tallest));
        assert_eq!(tile.row_heights(), &[20.0, 40.0, 45.0]);
        assert_eq!(tile.height(), 105.0);
        assert!(!tile.grow_rows_to(&tallest));
    }

    #[test]
    fn test_index_at_and_offset_of() {
        let mut tile = Tile::new(TileKey::new(0, 2), CellRange::new(0, 20, 0, 22));
        tile.row_heights = vec![10.0, 30.0, 20.0];
        tile.height = 60.0;
        tile.width = 40.0;
        tile.column_widths = vec![40.0];
        tile.display(Anchor::top_left(0.0, -25.0), center(), &mut MetricSurface);

        // pixel 0 is 25px into the tile: row 21, halfway
        assert_eq!(tile.index_at(Axis::Vertical, 0.0), 21.5);
        assert_eq!(tile.index_at(Axis::Vertical, -25.0), 20.0);
        assert_eq!(tile.index_at(Axis::Vertical, 35.0), 23.0);
        assert_eq!(tile.offset_of(Axis::Vertical, 22), 40.0);
        assert_eq!(tile.offset_of(Axis::Vertical, 20), 0.0);
    }

    #[derive(Default)]
    struct Counting {
        disposed: usize,
    }

    impl CellRenderer for Counting {
        fn render(
            &mut self,
            ctx: &mut CellContext,
            _value: Option<&CellValue>,
            column: u32,
            row: u32,
        ) -> Option<RenderedCell> {
            ctx.set_state(column, row, column + row);
            None
        }

        fn dispose(&mut self, ctx: &mut CellContext, column: u32, row: u32) {
            if ctx.take_state::<u32>(column, row).is_some() {
                self.disposed += 1;
            }
        }
    }

    #[test]
    fn test_dispose_releases_cell_state() {
        let source = FnSource::new(10, 10, |_, _| None);
        let mut renderer = Counting::default();
        let config = GridConfig::default();
        let mut surface = MetricSurface;
        let mut tile = Tile::new(TileKey::new(0, 0), CellRange::new(0, 0, 2, 1));
        {
            let mut env = TileEnv {
                source: &source,
                renderer: &mut renderer,
                surface: &mut surface,
                config: &config,
                bands: FixedBands::default(),
                counts: GridExtent::new(10, 10),
            };
            tile.create(&mut env);
        }
        assert_eq!(tile.context().len(), 6);
        tile.dispose(&mut renderer);
        assert_eq!(renderer.disposed, 6);
        assert!(tile.context().is_empty());
        assert!(!tile.is_created());
    }
}
