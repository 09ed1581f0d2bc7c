//! Common test utilities and assertion helpers.
//!
//! Provides synthetic data sources, a renderer and a surface that record what
//! the engine asked of them, and the tile coverage assertion.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use tilegrid::layout::Region;
use tilegrid::render::{
    CellContext, CellRenderer, MetricSurface, RenderedCell, Surface, TileLayout, TileMetrics,
};
use tilegrid::source::{DataSource, FnSource};
use tilegrid::{
    CellRange, CellValue, GridConfig, GridController, Px, Rect, RegionLocation, TileKey,
};

/// Tolerance for accumulated pixel arithmetic.
pub const EPS: f64 = 1e-6;

pub const VIEWPORT_WIDTH: Px = 640.0;
pub const VIEWPORT_HEIGHT: Px = 400.0;

// ============================================================================
// Sources
// ============================================================================

/// `"c:r"` in every cell.
pub fn numbered_source(columns: u32, rows: u32) -> FnSource<impl Fn(u32, u32) -> Option<CellValue>> {
    FnSource::new(columns, rows, |c, r| Some(CellValue::Text(format!("{c}:{r}"))))
}

/// Like `numbered_source`, but roughly one cell in seven has two lines, so
/// rows differ in height between tiles.
pub fn tall_cell_source(columns: u32, rows: u32) -> FnSource<impl Fn(u32, u32) -> Option<CellValue>> {
    FnSource::new(columns, rows, |c, r| {
        let text = if (c * 3 + r) % 7 == 0 {
            format!("{c}\n{r}")
        } else {
            format!("{c}:{r}")
        };
        Some(CellValue::Text(text))
    })
}

/// One call made to a `LoggedSource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCall {
    Prefetch(CellRange),
    Get(u32, u32),
}

/// `"c:r"` source that records every prefetch and read. Its row count can
/// be changed behind the grid's back through the shared `rows` cell.
#[derive(Debug, Clone)]
pub struct LoggedSource {
    pub columns: u32,
    pub rows: Rc<Cell<u32>>,
    pub calls: Rc<RefCell<Vec<SourceCall>>>,
}

impl LoggedSource {
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows: Rc::new(Cell::new(rows)),
            calls: Rc::default(),
        }
    }
}

impl DataSource for LoggedSource {
    fn column_count(&self) -> u32 {
        self.columns
    }

    fn row_count(&self) -> u32 {
        self.rows.get()
    }

    fn get(&self, column: u32, row: u32) -> Option<CellValue> {
        self.calls.borrow_mut().push(SourceCall::Get(column, row));
        (column < self.columns && row < self.rows.get())
            .then(|| CellValue::Text(format!("{column}:{row}")))
    }

    fn prefetch(&self, range: CellRange) {
        self.calls.borrow_mut().push(SourceCall::Prefetch(range));
    }
}

/// Built grid over `numbered_source` with the standard viewport.
pub fn numbered_grid(columns: u32, rows: u32, tile: (u32, u32)) -> GridController {
    let config = GridConfig::default().with_tile_size(tile.0, tile.1);
    let mut grid = GridController::with_source(
        config,
        Box::new(numbered_source(columns, rows)),
        VIEWPORT_WIDTH,
        VIEWPORT_HEIGHT,
    )
    .expect("valid config");
    grid.render().expect("render");
    grid
}

// ============================================================================
// Recording renderer
// ============================================================================

#[derive(Debug, Default)]
pub struct RenderLog {
    pub rendered: usize,
    pub disposed: usize,
}

/// Text renderer that stores a marker per cell in the tile context and counts
/// render and dispose calls.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    pub log: Rc<RefCell<RenderLog>>,
}

impl CellRenderer for RecordingRenderer {
    fn render(
        &mut self,
        ctx: &mut CellContext,
        value: Option<&CellValue>,
        column: u32,
        row: u32,
    ) -> Option<RenderedCell> {
        self.log.borrow_mut().rendered += 1;
        ctx.set_state(column, row, (column, row));
        value.map(|v| RenderedCell {
            text: v.to_string(),
            width: 10.0,
            height: 20.0,
        })
    }

    fn dispose(&mut self, ctx: &mut CellContext, column: u32, row: u32) {
        if ctx.take_state::<(u32, u32)>(column, row) == Some((column, row)) {
            self.log.borrow_mut().disposed += 1;
        }
    }
}

// ============================================================================
// Recording surface
// ============================================================================

#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub measured: usize,
    /// Mirror of attached tiles and their bounds.
    pub attached: BTreeMap<(RegionLocation, TileKey), Rect>,
}

/// Metric surface that mirrors attach/detach/translate notifications.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub log: Rc<RefCell<SurfaceLog>>,
}

impl Surface for RecordingSurface {
    fn measure(&mut self, layout: &TileLayout<'_>) -> TileMetrics {
        self.log.borrow_mut().measured += 1;
        MetricSurface.measure(layout)
    }

    fn attach(&mut self, region: RegionLocation, tile: TileKey, bounds: Rect) {
        let previous = self.log.borrow_mut().attached.insert((region, tile), bounds);
        assert!(previous.is_none(), "tile {tile:?} of {region} attached twice");
    }

    fn detach(&mut self, region: RegionLocation, tile: TileKey) {
        let removed = self.log.borrow_mut().attached.remove(&(region, tile));
        assert!(removed.is_some(), "tile {tile:?} of {region} detached while not attached");
    }

    fn translate(&mut self, region: RegionLocation, dx: Px, dy: Px) {
        for ((loc, _), bounds) in self.log.borrow_mut().attached.iter_mut() {
            if *loc == region {
                bounds.x += dx;
                bounds.y += dy;
            }
        }
    }

    fn reposition(&mut self, region: RegionLocation, tile: TileKey, bounds: Rect) {
        if let Some(mirrored) = self.log.borrow_mut().attached.get_mut(&(region, tile)) {
            *mirrored = bounds;
        }
    }
}

// ============================================================================
// Assertions
// ============================================================================

/// Displayed tiles of `region` form contiguous rows of contiguous tiles that
/// cover the region's bounds with no gaps and no overlaps.
pub fn assert_covers(region: &Region) {
    let bounds = region.bounds();
    let mut rows: BTreeMap<u32, Vec<(u32, Rect)>> = BTreeMap::new();
    for tile in region.displayed_tiles() {
        rows.entry(tile.key().row)
            .or_default()
            .push((tile.key().column, tile.bounds()));
    }
    assert!(
        !rows.is_empty(),
        "region {} has no displayed tiles",
        region.location()
    );

    let mut previous: Option<(u32, Px)> = None;
    for (row, tiles) in &rows {
        let (_, first) = tiles[0];
        let (_, last) = tiles[tiles.len() - 1];
        for pair in tiles.windows(2) {
            let ((left_col, left), (right_col, right)) = (pair[0], pair[1]);
            assert_eq!(right_col, left_col + 1, "column gap in tile row {row}");
            assert!(
                (left.right() - right.x).abs() < EPS,
                "tiles {left_col} and {right_col} of row {row} not adjacent: {left:?} {right:?}"
            );
        }
        for (column, rect) in tiles {
            assert!(
                (rect.y - first.y).abs() < EPS && (rect.height - first.height).abs() < EPS,
                "tile {column} of row {row} misaligned: {rect:?} vs {first:?}"
            );
        }
        assert!(first.x <= EPS, "row {row} starts at {}", first.x);
        assert!(
            last.right() >= bounds.width - EPS,
            "row {row} ends at {} < {}",
            last.right(),
            bounds.width
        );
        if let Some((previous_row, previous_bottom)) = previous {
            assert_eq!(*row, previous_row + 1, "tile row gap before {row}");
            assert!(
                (first.y - previous_bottom).abs() < EPS,
                "row {row} at {} does not meet previous bottom {previous_bottom}",
                first.y
            );
        }
        previous = Some((*row, first.bottom()));
    }

    let top = rows.values().next().map(|t| t[0].1.y).unwrap();
    let (_, bottom) = previous.unwrap();
    assert!(top <= EPS, "region {} top gap: {top}", region.location());
    assert!(
        bottom >= bounds.height - EPS,
        "region {} bottom gap: {bottom} < {}",
        region.location(),
        bounds.height
    );
}

/// The surface mirror agrees with the regions' displayed tiles.
pub fn assert_surface_mirrors(grid: &GridController, log: &SurfaceLog) {
    let mut expected = BTreeMap::new();
    for region in grid.regions() {
        for tile in region.displayed_tiles() {
            expected.insert((region.location(), tile.key()), tile.bounds());
        }
    }
    assert_eq!(
        expected.keys().collect::<Vec<_>>(),
        log.attached.keys().collect::<Vec<_>>()
    );
    for (key, bounds) in &expected {
        let mirrored = log.attached[key];
        assert!(
            (mirrored.x - bounds.x).abs() < EPS && (mirrored.y - bounds.y).abs() < EPS,
            "{key:?}: surface has {mirrored:?}, region has {bounds:?}"
        );
        assert!((mirrored.height - bounds.height).abs() < EPS);
    }
}
