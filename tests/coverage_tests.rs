//! Tile coverage under arbitrary scrolling.
//!
//! Whatever sequence of adjustments is applied, the displayed tiles of every
//! scrolling region must tile its bounds exactly, and the surface must have
//! been told about every tile that is on display.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::{
    assert_covers, assert_surface_mirrors, numbered_source, tall_cell_source, RecordingSurface,
    EPS, VIEWPORT_HEIGHT, VIEWPORT_WIDTH,
};
use proptest::prelude::*;
use tilegrid::source::FnSource;
use tilegrid::{
    Axis, Band, CellValue, FixedBands, GridConfig, GridController, Rect, RegionLocation,
    ScrollOrigin,
};
use web_time::Instant;

fn tall_grid(surface: RecordingSurface) -> GridController {
    let config = GridConfig::default().with_tile_size(5, 3);
    let mut grid = GridController::with_source(
        config,
        Box::new(tall_cell_source(200, 100_000)),
        VIEWPORT_WIDTH,
        VIEWPORT_HEIGHT,
    )
    .unwrap();
    grid.set_surface(Box::new(surface)).unwrap();
    grid.render().unwrap();
    grid
}

fn axis_strategy() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::Horizontal), Just(Axis::Vertical)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_center_stays_covered(
        steps in prop::collection::vec((axis_strategy(), -450.0f64..450.0), 1..40)
    ) {
        let surface = RecordingSurface::default();
        let log = surface.log.clone();
        let mut grid = tall_grid(surface);
        let now = Instant::now();

        for (axis, px) in steps {
            grid.adjust_position_px(px, axis, ScrollOrigin::Wheel, now).unwrap();
            assert_covers(grid.region(RegionLocation::CENTER).unwrap());
        }
        assert_surface_mirrors(&grid, &log.borrow());
    }

    #[test]
    fn prop_applied_delta_is_bounded(
        start in 0u32..99_000,
        px in -5_000.0f64..5_000.0,
    ) {
        let mut grid = tall_grid(RecordingSurface::default());
        let now = Instant::now();
        grid.scroll_to_index(None, Some(start), now).unwrap();

        let applied = grid.adjust_position_px(px, Axis::Vertical, ScrollOrigin::Wheel, now).unwrap();
        prop_assert!(applied.abs() <= VIEWPORT_HEIGHT / 2.0 + 1e-9);
        prop_assert!(applied.abs() <= px.abs() + 1e-9);
        assert_covers(grid.region(RegionLocation::CENTER).unwrap());
    }

    #[test]
    fn prop_jumps_stay_covered(
        targets in prop::collection::vec((0.0f64..=100.0, 0.0f64..=100.0), 1..10)
    ) {
        let surface = RecordingSurface::default();
        let log = surface.log.clone();
        let mut grid = tall_grid(surface);
        let now = Instant::now();

        for (column, row) in targets {
            grid.scroll_to_percent(Some(column), Some(row), now).unwrap();
            assert_covers(grid.region(RegionLocation::CENTER).unwrap());
        }
        assert_surface_mirrors(&grid, &log.borrow());
    }
}

#[test]
fn test_fixed_bands_scroll_with_center() {
    let config = GridConfig::default().with_tile_size(5, 3);
    let surface = RecordingSurface::default();
    let log = surface.log.clone();
    let mut grid = GridController::with_source(
        config,
        Box::new(numbered_source(30, 1_000)),
        VIEWPORT_WIDTH,
        VIEWPORT_HEIGHT,
    )
    .unwrap();
    grid.set_surface(Box::new(surface)).unwrap();
    grid.set_fixed_bands(FixedBands::new(1, 1, 1, 1)).unwrap();
    grid.render().unwrap();
    assert_eq!(grid.regions().len(), 9);

    let now = Instant::now();
    for (axis, px) in [
        (Axis::Vertical, -130.0),
        (Axis::Horizontal, -70.0),
        (Axis::Vertical, -199.0),
        (Axis::Horizontal, -310.0),
        (Axis::Vertical, 45.0),
    ] {
        grid.adjust_position_px(px, axis, ScrollOrigin::Wheel, now)
            .unwrap();
    }

    for region in grid.regions() {
        assert_covers(region);
    }
    assert_surface_mirrors(&grid, &log.borrow());

    let center = grid.region(RegionLocation::CENTER).unwrap();
    // Regions sharing a row band agree on tile rows.
    for h in [Band::Leading, Band::Trailing] {
        let side = grid.region(RegionLocation::new(h, Band::Center)).unwrap();
        for tile in side.displayed_tiles() {
            let twin = center
                .displayed_tiles()
                .find(|t| t.key().row == tile.key().row)
                .unwrap();
            assert!((twin.bounds().y - tile.bounds().y).abs() < common::EPS);
        }
    }
    // Regions sharing a column band agree on tile columns.
    for v in [Band::Leading, Band::Trailing] {
        let side = grid.region(RegionLocation::new(Band::Center, v)).unwrap();
        for tile in side.displayed_tiles() {
            let twin = center
                .displayed_tiles()
                .find(|t| t.key().column == tile.key().column)
                .unwrap();
            assert!((twin.bounds().x - tile.bounds().x).abs() < common::EPS);
        }
    }
    // Corners never move.
    let corner = grid
        .region(RegionLocation::new(Band::Leading, Band::Leading))
        .unwrap();
    let only = corner.displayed_tiles().next().unwrap();
    assert_eq!((only.bounds().x, only.bounds().y), (0.0, 0.0));
}

#[test]
fn test_row_heights_synchronized_across_tile_row() {
    let mut grid = tall_grid(RecordingSurface::default());
    let now = Instant::now();
    grid.adjust_position_px(-333.0, Axis::Horizontal, ScrollOrigin::Wheel, now)
        .unwrap();
    grid.adjust_position_px(-170.0, Axis::Vertical, ScrollOrigin::Wheel, now)
        .unwrap();

    let center = grid.region(RegionLocation::CENTER).unwrap();
    for tile in center.displayed_tiles() {
        for other in center
            .displayed_tiles()
            .filter(|t| t.key().row == tile.key().row)
        {
            assert_eq!(tile.row_heights(), other.row_heights());
        }
    }
    // Some rows carry a two-line cell.
    assert!(center
        .displayed_tiles()
        .any(|t| t.row_heights().iter().any(|h| *h > 20.0)));
}

/// Every frozen column region of row band `v` shows the same tile rows as
/// the scrolling column region, at the same offsets and row heights.
fn assert_rows_aligned(grid: &GridController, v: Band) {
    let center = grid.region(RegionLocation::new(Band::Center, v)).unwrap();
    let expected = center.row_layout();
    for h in [Band::Leading, Band::Trailing] {
        let Some(side) = grid.region(RegionLocation::new(h, v)) else {
            continue;
        };
        let layout = side.row_layout();
        assert_eq!(
            layout.iter().map(|(row, _)| *row).collect::<Vec<_>>(),
            expected.iter().map(|(row, _)| *row).collect::<Vec<_>>(),
            "{} shows different tile rows",
            side.location()
        );
        for ((row, y), (_, twin_y)) in layout.iter().zip(&expected) {
            assert!(
                (y - twin_y).abs() < EPS,
                "{} tile row {row} at {y}, scrolling columns at {twin_y}",
                side.location()
            );
        }
        for tile in side.displayed_tiles() {
            let twin = center
                .displayed_tiles()
                .find(|t| t.key().row == tile.key().row)
                .unwrap();
            assert_eq!(tile.row_heights(), twin.row_heights(), "tile row {}", tile.key().row);
        }
    }
}

#[test]
fn test_frozen_columns_stay_row_aligned_with_tall_cells() {
    let config = GridConfig::default().with_tile_size(5, 3);
    let surface = RecordingSurface::default();
    let log = surface.log.clone();
    let mut grid = GridController::with_source(
        config,
        Box::new(tall_cell_source(30, 1_000)),
        VIEWPORT_WIDTH,
        VIEWPORT_HEIGHT,
    )
    .unwrap();
    grid.set_surface(Box::new(surface)).unwrap();
    grid.set_fixed_bands(FixedBands::new(1, 0, 1, 0)).unwrap();
    grid.render().unwrap();
    assert_rows_aligned(&grid, Band::Center);

    let now = Instant::now();
    for (axis, px) in [
        (Axis::Vertical, -170.0),
        (Axis::Horizontal, -250.0),
        (Axis::Vertical, -199.0),
        (Axis::Vertical, 90.0),
        (Axis::Horizontal, -310.0),
    ] {
        grid.adjust_position_px(px, axis, ScrollOrigin::Wheel, now)
            .unwrap();
        assert_rows_aligned(&grid, Band::Center);
    }
    grid.scroll_to_index(None, Some(500), now).unwrap();
    assert_rows_aligned(&grid, Band::Center);
    grid.scroll_to_percent(None, Some(100.0), now).unwrap();
    assert_rows_aligned(&grid, Band::Center);

    for region in grid.regions() {
        assert_covers(region);
    }
    assert_surface_mirrors(&grid, &log.borrow());
    // Any seven adjacent columns hold a two-line cell in every row, so the
    // single frozen column takes that height everywhere.
    let left = grid
        .region(RegionLocation::new(Band::Leading, Band::Center))
        .unwrap();
    for tile in left.displayed_tiles() {
        assert!(tile.row_heights().iter().all(|h| *h == 40.0));
    }
}

#[test]
fn test_fixed_rows_sized_by_tallest_visible_cell() {
    // Row 0 is one line high except column 8 (three lines) and column 13
    // (four lines), which only comes into view after scrolling right.
    let source = FnSource::new(20, 100, |c, r| {
        let text = match (c, r) {
            (8, 0) => "a\nb\nc".to_string(),
            (13, 0) => "a\nb\nc\nd".to_string(),
            _ => format!("{c}:{r}"),
        };
        Some(CellValue::Text(text))
    });
    let config = GridConfig::default().with_tile_size(5, 3);
    let mut grid =
        GridController::with_source(config, Box::new(source), VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .unwrap();
    grid.set_fixed_bands(FixedBands::new(1, 1, 0, 0)).unwrap();
    grid.render().unwrap();

    assert_eq!(grid.separators().top, 60.0);
    let center = grid.region(RegionLocation::CENTER).unwrap();
    assert_eq!(center.bounds(), Rect::new(64.0, 60.0, 576.0, 340.0));
    assert_rows_aligned(&grid, Band::Leading);
    let corner = grid
        .region(RegionLocation::new(Band::Leading, Band::Leading))
        .unwrap();
    assert_eq!(corner.displayed_tiles().next().unwrap().height(), 60.0);

    let now = Instant::now();
    grid.adjust_position_px(-288.0, Axis::Horizontal, ScrollOrigin::Wheel, now)
        .unwrap();
    assert_eq!(grid.separators().top, 80.0);
    assert_eq!(
        grid.region(RegionLocation::CENTER).unwrap().bounds(),
        Rect::new(64.0, 80.0, 576.0, 320.0)
    );
    assert_rows_aligned(&grid, Band::Leading);
    for region in grid.regions() {
        assert_covers(region);
    }
}
