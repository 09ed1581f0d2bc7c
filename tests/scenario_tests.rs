//! End-to-end scrolling over a million-row source.
//!
//! Tile counts must stay proportional to the viewport no matter how far the
//! grid has travelled.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::{assert_covers, numbered_grid};
use tilegrid::{FixedBands, GridController, RegionLocation};
use web_time::{Duration, Instant};

const ROWS: u32 = 1_000_000;
const COLUMNS: u32 = 10;
const TILE_ROWS: u32 = 3;
/// Two tile columns by at most eight tile rows: seven 60px rows cover 400px,
/// plus one more when neither edge is aligned.
const MAX_DISPLAYED_TILES: usize = 16;

fn assert_bounded(grid: &GridController) {
    let center = grid.region(RegionLocation::CENTER).unwrap();
    assert!(
        center.displayed_count() <= MAX_DISPLAYED_TILES,
        "{} displayed tiles",
        center.displayed_count()
    );
    let capacity = grid.config().max_cached_tiles.unwrap();
    assert!(center.cached_count() <= capacity + center.displayed_count());
}

#[test]
fn test_jump_and_wheel_to_the_middle() {
    let mut grid = numbered_grid(COLUMNS, ROWS, (5, TILE_ROWS));
    let mut now = Instant::now();
    let debounce = grid.config().wheel_debounce();

    for step in 1..=20u32 {
        let target = step * 25_000;
        grid.scroll_to_index(None, Some(target), now).unwrap();
        assert_eq!(grid.visible_range().unwrap().first_row, target);
        assert_bounded(&grid);

        for _ in 0..5 {
            assert!(grid.wheel(0.0, 120.0, now));
            now += debounce;
            assert!(grid.tick(now).unwrap());
        }
        // 600px of 20px rows
        assert_eq!(grid.visible_range().unwrap().first_row, target + 30);
        assert_covers(grid.region(RegionLocation::CENTER).unwrap());
        assert_bounded(&grid);
        now += Duration::from_millis(1);
    }

    assert_eq!(grid.scroll_position().row_index(), Some(500_030));
}

#[test]
fn test_continuous_wheel_scrolling() {
    let mut grid = numbered_grid(COLUMNS, ROWS, (5, TILE_ROWS));
    let mut now = Instant::now();
    let debounce = grid.config().wheel_debounce();

    for _ in 0..2_000 {
        grid.wheel(0.0, 120.0, now);
        now += debounce;
        grid.tick(now).unwrap();
    }

    // 2000 * 120px / 20px
    let range = grid.visible_range().unwrap();
    assert_eq!(range.first_row, 12_000);
    assert_eq!(range.last_row, 12_019);
    assert_covers(grid.region(RegionLocation::CENTER).unwrap());
    assert_bounded(&grid);
}

#[test]
fn test_percent_sweep_with_fixed_rows() {
    let mut grid = numbered_grid(COLUMNS, ROWS, (5, TILE_ROWS));
    grid.set_fixed_bands(FixedBands::new(0, 2, 0, 1)).unwrap();
    let now = Instant::now();

    for percent in [0.0, 12.5, 50.0, 99.0, 100.0, 37.0, 0.0] {
        grid.scroll_to_percent(None, Some(percent), now).unwrap();
        for region in grid.regions() {
            assert_covers(region);
        }
        assert_bounded(&grid);
    }

    grid.scroll_to_percent(None, Some(100.0), now).unwrap();
    assert_eq!(grid.visible_range().unwrap().last_row, ROWS - 2);
}
