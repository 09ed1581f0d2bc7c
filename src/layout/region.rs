//! Regions: the (up to) nine panes of the viewport.
//!
//! A region owns the tiles of one band combination (for example the frozen
//! top rows over the scrolling columns). Tile positions are region-local: the
//! region's own top-left corner is `(0, 0)`.
//!
//! After every scroll the region runs a fill pass. Starting from an on-screen
//! tile it walks each tile row to the left and right edges, equalizes row
//! heights across that row, then steps to the next row until the vertical
//! edge is reached. Tiles that end up off screen are detached but stay cached
//! until the LRU bound evicts them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, trace, warn};

use super::tile::{cell_range_for, Anchor, Tile};
use super::TileEnv;
use crate::error::{GridError, Result};
use crate::render::cache::LruCache;
use crate::render::{CellRenderer, Surface};
use crate::types::{ceil_div, Axis, GridExtent, Px, Rect, RegionLocation, TileKey, TileSize};

/// Which side of a neighbour a new tile is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Above,
    Below,
}

/// Displayed tiles at the edges of a region along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BorderTiles {
    /// Displayed tile containing the region's leading edge (pixel 0).
    pub leading: Option<TileKey>,
    /// Displayed tile containing the region's trailing edge.
    pub trailing: Option<TileKey>,
    /// Leading pixel of the displayed tiles.
    pub start_px: Px,
    /// Trailing pixel of the displayed tiles.
    pub end_px: Px,
    /// The first tile along the axis is displayed.
    pub first_resident: bool,
    /// The last tile along the axis is displayed.
    pub last_resident: bool,
}

pub struct Region {
    location: RegionLocation,
    bounds: Rect,
    size: GridExtent,
    tile_size: TileSize,
    tile_extent: GridExtent,
    tiles: LruCache<TileKey, Tile>,
    displayed: BTreeSet<TileKey>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("location", &self.location)
            .field("bounds", &self.bounds)
            .field("size", &self.size)
            .field("tile_extent", &self.tile_extent)
            .field("cached", &self.tiles.len())
            .field("displayed", &self.displayed.len())
            .finish()
    }
}

fn span(bounds: Rect, axis: Axis) -> (Px, Px) {
    match axis {
        Axis::Horizontal => (bounds.x, bounds.right()),
        Axis::Vertical => (bounds.y, bounds.bottom()),
    }
}

impl Region {
    /// Create an empty region.
    ///
    /// `bounds` is in viewport pixels; `size` is the region's cell extent.
    pub fn new(
        location: RegionLocation,
        bounds: Rect,
        size: GridExtent,
        tile_size: TileSize,
        max_cached_tiles: Option<usize>,
    ) -> Self {
        let tile_extent = GridExtent::new(
            ceil_div(size.columns, tile_size.columns),
            ceil_div(size.rows, tile_size.rows),
        );
        Self {
            location,
            bounds,
            size,
            tile_size,
            tile_extent,
            tiles: LruCache::new(max_cached_tiles),
            displayed: BTreeSet::new(),
        }
    }

    pub fn location(&self) -> RegionLocation {
        self.location
    }

    /// Viewport-space bounds.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    /// Cell extent of the region.
    pub fn size(&self) -> GridExtent {
        self.size
    }

    /// Number of tiles along each axis.
    pub fn tile_extent(&self) -> GridExtent {
        self.tile_extent
    }

    pub fn tile(&self, key: TileKey) -> Option<&Tile> {
        self.tiles.get(&key)
    }

    pub fn is_displayed(&self, key: TileKey) -> bool {
        self.displayed.contains(&key)
    }

    /// Displayed tiles in row-major key order.
    pub fn displayed_tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.displayed.iter().filter_map(|k| self.tiles.get(k))
    }

    pub fn displayed_count(&self) -> usize {
        self.displayed.len()
    }

    pub fn cached_count(&self) -> usize {
        self.tiles.len()
    }

    /// Fetch a tile, creating and caching it on first use.
    ///
    /// Returns `None` for keys outside the region's tile extent.
    pub fn get_tile(&mut self, key: TileKey, env: &mut TileEnv<'_>) -> Option<&mut Tile> {
        if key.column >= self.tile_extent.columns || key.row >= self.tile_extent.rows {
            return None;
        }
        if !self.tiles.contains_key(&key) {
            let range = cell_range_for(key, self.location, self.tile_size, &env.bands, env.counts)?;
            let mut tile = Tile::new(key, range);
            tile.create(env);
            let evicted = self.tiles.insert(key, tile, Tile::is_displayed);
            if !evicted.is_empty() {
                debug!(
                    region = %self.location,
                    evicted = evicted.len(),
                    cached = self.tiles.len(),
                    "evicted tiles"
                );
            }
            for (_, mut old) in evicted {
                old.dispose(&mut *env.renderer);
            }
        }
        self.tiles.get_mut(&key)
    }

    /// Display the tile at `key` where `place` says, then fill around it.
    ///
    /// Returns `false` when the key is outside the region.
    pub fn seed(
        &mut self,
        key: TileKey,
        env: &mut TileEnv<'_>,
        place: impl FnOnce(&Tile) -> Anchor,
    ) -> Result<bool> {
        let location = self.location;
        let Some(tile) = self.get_tile(key, env) else {
            return Ok(false);
        };
        let anchor = place(tile);
        tile.display(anchor, location, &mut *env.surface);
        self.displayed.insert(key);
        trace!(region = %location, tile = ?key, ?anchor, "seeded");
        self.fill(false, env)?;
        self.fill(true, env)?;
        Ok(true)
    }

    /// Cover the region with tiles, walking down (or up with `from_bottom`)
    /// from the topmost (bottommost) displayed on-screen tile.
    ///
    /// Does nothing if no displayed tile is on screen.
    pub fn fill(&mut self, from_bottom: bool, env: &mut TileEnv<'_>) -> Result<()> {
        self.release_offscreen(&mut *env.surface);
        let Some(mut current) = self.find_vertical_edge_tile(from_bottom) else {
            trace!(region = %self.location, "nothing on screen to fill from");
            return Ok(());
        };

        let mut first_row = true;
        let mut rows_walked = 0u32;
        let last_row = loop {
            rows_walked += 1;
            if rows_walked > self.tile_extent.rows {
                return Err(self.edge_error(current.row));
            }

            let left = self.walk_to_left_edge(current, env)?;
            let right = self.walk_to_right_edge(left, env)?;
            self.release_row_outside(left.row, left.column, right.column, &mut *env.surface);
            self.synchronize_heights(
                left.row,
                current,
                from_bottom && !first_row,
                &mut *env.surface,
            );
            first_row = false;

            let height = self.bounds.height;
            let (row_bounds, at_edge) = match self.tile(left) {
                Some(tile) if from_bottom => (tile.bounds(), tile.is_edge_top()),
                Some(tile) => (tile.bounds(), tile.is_edge_bottom(height)),
                None => return Err(self.edge_error(left.row)),
            };
            let (next, side) = if from_bottom {
                if at_edge || left.row == 0 {
                    break left.row;
                }
                (TileKey::new(left.column, left.row - 1), Side::Above)
            } else {
                if at_edge || left.row + 1 >= self.tile_extent.rows {
                    break left.row;
                }
                (TileKey::new(left.column, left.row + 1), Side::Below)
            };
            if self.place_adjacent(next, row_bounds, side, env).is_none() {
                return Err(self.edge_error(next.row));
            }
            current = next;
        };

        self.release_rows_beyond(last_row, from_bottom, &mut *env.surface);
        self.release_offscreen(&mut *env.surface);
        trace!(
            region = %self.location,
            from_bottom,
            displayed = self.displayed.len(),
            "filled"
        );
        Ok(())
    }

    /// Shift every displayed tile by `px` along `axis` and refill.
    pub fn adjust_position_px(&mut self, px: Px, axis: Axis, env: &mut TileEnv<'_>) -> Result<()> {
        let (dx, dy) = match axis {
            Axis::Horizontal => (px, 0.0),
            Axis::Vertical => (0.0, px),
        };
        for key in &self.displayed {
            if let Some(tile) = self.tiles.peek_mut(key) {
                tile.shift(dx, dy);
            }
        }
        env.surface.translate(self.location, dx, dy);
        self.fill(false, env)?;
        self.fill(true, env)
    }

    pub fn get_border_tiles_x(&self) -> BorderTiles {
        self.border_tiles(Axis::Horizontal)
    }

    pub fn get_border_tiles_y(&self) -> BorderTiles {
        self.border_tiles(Axis::Vertical)
    }

    pub fn border_tiles(&self, axis: Axis) -> BorderTiles {
        let extent = self.bounds.extent(axis);
        let last = self.tile_extent.along(axis).saturating_sub(1);
        let mut border = BorderTiles::default();
        let mut leading_start = f64::NEG_INFINITY;
        let mut trailing_start = f64::INFINITY;
        let mut any = false;

        for key in &self.displayed {
            let Some(tile) = self.tiles.get(key) else {
                continue;
            };
            let (start, end) = span(tile.bounds(), axis);
            if any {
                border.start_px = border.start_px.min(start);
                border.end_px = border.end_px.max(end);
            } else {
                border.start_px = start;
                border.end_px = end;
                any = true;
            }
            // Prefer the tile that actually extends past the edge over one that only touches it
            if start <= 0.0 && 0.0 <= end && start > leading_start {
                border.leading = Some(*key);
                leading_start = start;
            }
            if start <= extent && extent <= end && start < trailing_start {
                border.trailing = Some(*key);
                trailing_start = start;
            }
            let index = key.along(axis);
            border.first_resident |= index == 0;
            border.last_resident |= index == last;
        }
        border
    }

    /// Fractional absolute indices at the region's leading and trailing edges.
    ///
    /// When the displayed content does not reach an edge, the first (last)
    /// displayed index is used instead. `None` when nothing is displayed.
    pub fn visible_span(&self, axis: Axis) -> Option<(f64, f64)> {
        if self.displayed.is_empty() {
            return None;
        }
        let border = self.border_tiles(axis);
        let start = match border.leading.and_then(|k| self.tiles.get(&k)) {
            Some(tile) => tile.index_at(axis, 0.0),
            None => self
                .displayed_tiles()
                .map(|t| f64::from(t.range().start(axis)))
                .fold(f64::INFINITY, f64::min),
        };
        let end = match border.trailing.and_then(|k| self.tiles.get(&k)) {
            Some(tile) => tile.index_at(axis, self.bounds.extent(axis)),
            None => self
                .displayed_tiles()
                .map(|t| f64::from(t.range().end(axis)) + 1.0)
                .fold(f64::NEG_INFINITY, f64::max),
        };
        Some((start, end))
    }

    /// Pixel extent of the whole region along `axis`, creating the tiles of
    /// the first tile row/column as needed. Used to size fixed bands.
    pub fn measure_extent(&mut self, axis: Axis, env: &mut TileEnv<'_>) -> Px {
        let mut total = 0.0;
        for index in 0..self.tile_extent.along(axis) {
            let key = match axis {
                Axis::Horizontal => TileKey::new(index, 0),
                Axis::Vertical => TileKey::new(0, index),
            };
            if let Some(tile) = self.get_tile(key, env) {
                total += match axis {
                    Axis::Horizontal => tile.width(),
                    Axis::Vertical => tile.height(),
                };
            }
        }
        total
    }

    /// Height of every tile row stacked, measured down the column of the
    /// first displayed tile (tile column 0 when nothing is displayed).
    pub fn stacked_extent(&mut self, env: &mut TileEnv<'_>) -> Px {
        let column = self.displayed.iter().next().map_or(0, |k| k.column);
        (0..self.tile_extent.rows)
            .filter_map(|row| self.get_tile(TileKey::new(column, row), env).map(|t| t.height()))
            .sum()
    }

    /// Raise `tallest` to the height of every row shown here, keyed by
    /// absolute row.
    pub fn collect_row_heights(&self, tallest: &mut BTreeMap<u32, Px>) {
        for tile in self.displayed_tiles() {
            for (row, height) in (tile.range().top..).zip(tile.row_heights()) {
                let entry = tallest.entry(row).or_insert(*height);
                *entry = entry.max(*height);
            }
        }
    }

    /// Displayed tile rows, top to bottom, with their offsets.
    pub fn row_layout(&self) -> Vec<(u32, Px)> {
        let mut layout: Vec<(u32, Px)> = Vec::new();
        for tile in self.displayed_tiles() {
            let row = tile.key().row;
            if layout.last().map(|(r, _)| *r) != Some(row) {
                layout.push((row, tile.bounds().y));
            }
        }
        layout
    }

    /// Grow displayed rows to `tallest` and restack the tile rows below the
    /// topmost one, which keeps its offset. Returns whether any tile moved.
    pub fn grow_rows(&mut self, tallest: &BTreeMap<u32, Px>, surface: &mut dyn Surface) -> bool {
        let location = self.location;
        let mut changed = false;
        let mut next_top: Option<Px> = None;
        for (row, y) in self.row_layout() {
            let top = next_top.unwrap_or(y);
            let mut bottom = top;
            for key in self.row_keys(row) {
                let Some(tile) = self.tiles.peek_mut(&key) else {
                    continue;
                };
                let grew = tile.grow_rows_to(tallest);
                let dy = top - tile.bounds().y;
                if grew || dy.abs() > 0.0 {
                    tile.shift(0.0, dy);
                    surface.reposition(location, key, tile.bounds());
                    changed = true;
                }
                bottom = bottom.max(tile.bounds().bottom());
            }
            next_top = Some(bottom);
        }
        if changed {
            self.release_offscreen(surface);
        }
        changed
    }

    /// Show exactly the tile rows of `layout` at its offsets, each row
    /// starting from tile column 0 at the left edge. Only meaningful for
    /// regions that do not scroll horizontally.
    ///
    /// Rows are grown to `tallest`. A row taller than `tallest` raises it,
    /// and the return value says so.
    pub fn mirror_rows(
        &mut self,
        layout: &[(u32, Px)],
        tallest: &mut BTreeMap<u32, Px>,
        env: &mut TileEnv<'_>,
    ) -> Result<bool> {
        let rows: BTreeSet<u32> = layout.iter().map(|(row, _)| *row).collect();
        let gone: Vec<TileKey> = self
            .displayed
            .iter()
            .filter(|k| !rows.contains(&k.row))
            .copied()
            .collect();
        for key in gone {
            self.remove_from_display(key, &mut *env.surface);
        }

        let location = self.location;
        let mut raised = false;
        for &(row, y) in layout {
            if row >= self.tile_extent.rows {
                continue;
            }
            for key in self.row_keys(row) {
                if let Some(tile) = self.tiles.peek_mut(&key) {
                    let dy = y - tile.bounds().y;
                    if dy.abs() > 0.0 {
                        tile.shift(0.0, dy);
                        env.surface.reposition(location, key, tile.bounds());
                    }
                }
            }

            let first = TileKey::new(0, row);
            let Some(tile) = self.get_tile(first, env) else {
                return Err(self.edge_error(row));
            };
            tile.display(Anchor::top_left(0.0, y), location, &mut *env.surface);
            self.displayed.insert(first);
            let right = self.walk_to_right_edge(first, env)?;
            self.release_row_outside(row, 0, right.column, &mut *env.surface);

            let keys = self.row_keys(row);
            for key in &keys {
                if let Some(tile) = self.tiles.get(key) {
                    for (abs, height) in (tile.range().top..).zip(tile.row_heights()) {
                        let entry = tallest.entry(abs).or_insert(0.0);
                        if *entry < *height {
                            *entry = *height;
                            raised = true;
                        }
                    }
                }
            }
            for key in keys {
                if let Some(tile) = self.tiles.peek_mut(&key) {
                    if tile.grow_rows_to(tallest) {
                        env.surface.reposition(location, key, tile.bounds());
                    }
                }
            }
        }
        Ok(raised)
    }

    /// Detach every displayed tile, keeping the cache.
    pub fn remove_all_displayed(&mut self, surface: &mut dyn Surface) {
        let keys: Vec<TileKey> = self.displayed.iter().copied().collect();
        for key in keys {
            self.remove_from_display(key, surface);
        }
    }

    /// Detach and dispose every tile.
    pub fn clear(&mut self, renderer: &mut dyn CellRenderer, surface: &mut dyn Surface) {
        self.remove_all_displayed(surface);
        for (_, mut tile) in self.tiles.drain() {
            tile.dispose(renderer);
        }
    }

    fn edge_error(&self, tile_row: u32) -> GridError {
        warn!(region = %self.location, tile_row, "edge tile not found, abandoning fill");
        GridError::EdgeTileNotFound {
            region: self.location,
            tile_row,
        }
    }

    /// The on-screen displayed tile with the smallest top (or largest bottom).
    fn find_vertical_edge_tile(&self, from_bottom: bool) -> Option<TileKey> {
        let (width, height) = (self.bounds.width, self.bounds.height);
        let mut best: Option<(TileKey, Px)> = None;
        for key in &self.displayed {
            let Some(tile) = self.tiles.get(key) else {
                continue;
            };
            if !tile.is_on_screen(width, height) {
                continue;
            }
            let bounds = tile.bounds();
            let edge = if from_bottom { bounds.bottom() } else { bounds.y };
            let better = match best {
                None => true,
                Some((_, current)) if from_bottom => edge > current,
                Some((_, current)) => edge < current,
            };
            if better {
                best = Some((*key, edge));
            }
        }
        best.map(|(key, _)| key)
    }

    fn place_adjacent(
        &mut self,
        key: TileKey,
        neighbour: Rect,
        side: Side,
        env: &mut TileEnv<'_>,
    ) -> Option<Rect> {
        let anchor = match side {
            Side::Left => Anchor::top_right(neighbour.x, neighbour.y),
            Side::Right => Anchor::top_left(neighbour.right(), neighbour.y),
            Side::Above => Anchor::bottom_left(neighbour.x, neighbour.y),
            Side::Below => Anchor::top_left(neighbour.x, neighbour.bottom()),
        };
        let location = self.location;
        let tile = self.get_tile(key, env)?;
        tile.display(anchor, location, &mut *env.surface);
        let bounds = tile.bounds();
        self.displayed.insert(key);
        Some(bounds)
    }

    fn walk_to_left_edge(&mut self, start: TileKey, env: &mut TileEnv<'_>) -> Result<TileKey> {
        let mut key = start;
        for _ in 0..=self.tile_extent.columns {
            let Some(tile) = self.tiles.get(&key).filter(|t| t.is_displayed()) else {
                return Err(self.edge_error(key.row));
            };
            if tile.is_edge_left() || key.column == 0 {
                return Ok(key);
            }
            let bounds = tile.bounds();
            if bounds.right() < 0.0 {
                return Err(self.edge_error(key.row));
            }
            let next = TileKey::new(key.column - 1, key.row);
            if self.place_adjacent(next, bounds, Side::Left, env).is_none() {
                return Err(self.edge_error(key.row));
            }
            key = next;
        }
        Err(self.edge_error(start.row))
    }

    fn walk_to_right_edge(&mut self, start: TileKey, env: &mut TileEnv<'_>) -> Result<TileKey> {
        let width = self.bounds.width;
        let mut key = start;
        for _ in 0..=self.tile_extent.columns {
            let Some(tile) = self.tiles.get(&key).filter(|t| t.is_displayed()) else {
                return Err(self.edge_error(key.row));
            };
            if tile.is_edge_right(width) || key.column + 1 >= self.tile_extent.columns {
                return Ok(key);
            }
            let bounds = tile.bounds();
            if bounds.x > width {
                return Err(self.edge_error(key.row));
            }
            let next = TileKey::new(key.column + 1, key.row);
            if self.place_adjacent(next, bounds, Side::Right, env).is_none() {
                return Err(self.edge_error(key.row));
            }
            key = next;
        }
        Err(self.edge_error(start.row))
    }

    fn row_keys(&self, row: u32) -> Vec<TileKey> {
        self.displayed
            .range(TileKey::new(0, row)..=TileKey::new(u32::MAX, row))
            .copied()
            .collect()
    }

    /// Equalize each row height across the displayed tiles of a tile row.
    ///
    /// The growth of `reference` is then absorbed either by moving this row
    /// and every displayed row above it up (`shift_row_up`, used while walking
    /// upward) or by moving every displayed row below it down.
    fn synchronize_heights(
        &mut self,
        row: u32,
        reference: TileKey,
        shift_row_up: bool,
        surface: &mut dyn Surface,
    ) {
        let keys = self.row_keys(row);
        let before = self.tiles.get(&reference).map_or(0.0, Tile::height);

        let mut tallest: Vec<Px> = Vec::new();
        for key in &keys {
            if let Some(tile) = self.tiles.get(key) {
                for (i, h) in tile.row_heights().iter().enumerate() {
                    match tallest.get_mut(i) {
                        Some(t) => *t = t.max(*h),
                        None => tallest.push(*h),
                    }
                }
            }
        }

        let location = self.location;
        for key in &keys {
            let Some(tile) = self.tiles.peek_mut(key) else {
                continue;
            };
            let mut changed = false;
            for (i, h) in tallest.iter().enumerate() {
                if tile.row_heights().get(i).is_some_and(|current| current < h) {
                    tile.set_row_height(i, *h);
                    changed = true;
                }
            }
            if changed {
                surface.reposition(location, *key, tile.bounds());
            }
        }

        let growth = self.tiles.get(&reference).map_or(0.0, Tile::height) - before;
        if growth <= 0.0 {
            return;
        }
        let (moved, dy): (Vec<TileKey>, Px) = if shift_row_up {
            let at_or_above = self
                .displayed
                .range(..=TileKey::new(u32::MAX, row))
                .copied()
                .collect();
            (at_or_above, -growth)
        } else {
            let below = self
                .displayed
                .range(TileKey::new(0, row.saturating_add(1))..)
                .copied()
                .filter(|k| k.row > row)
                .collect();
            (below, growth)
        };
        for key in moved {
            if let Some(tile) = self.tiles.peek_mut(&key) {
                tile.shift(0.0, dy);
                surface.reposition(location, key, tile.bounds());
            }
        }
        trace!(region = %location, row, growth, "row heights synchronized");
    }

    fn remove_from_display(&mut self, key: TileKey, surface: &mut dyn Surface) {
        self.displayed.remove(&key);
        if let Some(tile) = self.tiles.peek_mut(&key) {
            tile.remove(self.location, surface);
        }
    }

    fn release_offscreen(&mut self, surface: &mut dyn Surface) {
        let (width, height) = (self.bounds.width, self.bounds.height);
        let gone: Vec<TileKey> = self
            .displayed
            .iter()
            .filter(|k| {
                !self
                    .tiles
                    .get(k)
                    .is_some_and(|t| t.is_on_screen(width, height))
            })
            .copied()
            .collect();
        for key in gone {
            self.remove_from_display(key, surface);
        }
    }

    fn release_row_outside(&mut self, row: u32, first: u32, last: u32, surface: &mut dyn Surface) {
        let gone: Vec<TileKey> = self
            .row_keys(row)
            .into_iter()
            .filter(|k| k.column < first || k.column > last)
            .collect();
        for key in gone {
            self.remove_from_display(key, surface);
        }
    }

    /// Detach rows past the one where a fill walk stopped.
    fn release_rows_beyond(&mut self, last_row: u32, upward: bool, surface: &mut dyn Surface) {
        let gone: Vec<TileKey> = self
            .displayed
            .iter()
            .filter(|k| if upward { k.row < last_row } else { k.row > last_row })
            .copied()
            .collect();
        for key in gone {
            self.remove_from_display(key, surface);
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
    use crate::config::GridConfig;
    use crate::render::{MetricSurface, TextRenderer, TileLayout, TileMetrics};
    use crate::source::{DataSource, FnSource};
    use crate::types::{CellValue, FixedBands};

    struct Harness<S, U> {
        source: S,
        renderer: TextRenderer,
        surface: U,
        config: GridConfig,
    }

    impl<S: DataSource, U: Surface> Harness<S, U> {
        fn env(&mut self) -> TileEnv<'_> {
            TileEnv {
                counts: self.source.extent(),
                source: &self.source,
                renderer: &mut self.renderer,
                surface: &mut self.surface,
                config: &self.config,
                bands: FixedBands::default(),
            }
        }

        fn region(&self, width: Px, height: Px) -> Region {
            Region::new(
                RegionLocation::CENTER,
                Rect::new(0.0, 0.0, width, height),
                self.source.extent(),
                self.config.tile_size,
                self.config.max_cached_tiles,
            )
        }
    }

    fn numbers(columns: u32, rows: u32) -> impl DataSource {
        FnSource::new(columns, rows, |c, r| {
            Some(CellValue::Number(f64::from(c) * 1000.0 + f64::from(r)))
        })
    }

    fn harness(columns: u32, rows: u32, tile: (u32, u32)) -> Harness<impl DataSource, MetricSurface> {
        Harness {
            source: numbers(columns, rows),
            renderer: TextRenderer::default(),
            surface: MetricSurface,
            config: GridConfig::default().with_tile_size(tile.0, tile.1),
        }
    }

    fn displayed_keys(region: &Region) -> Vec<(u32, u32)> {
        region
            .displayed_tiles()
            .map(|t| (t.key().column, t.key().row))
            .collect()
    }

    #[test]
    fn test_seed_fills_viewport() {
        let mut h = harness(20, 100, (5, 3));
        let mut region = h.region(500.0, 200.0);
        let seeded = region
            .seed(TileKey::new(0, 0), &mut h.env(), |_| Anchor::top_left(0.0, 0.0))
            .unwrap();
        assert!(seeded);

        // 320px wide tiles, 60px tall: two columns, four rows
        assert_eq!(region.displayed_count(), 8);
        let last = region.tile(TileKey::new(1, 3)).unwrap().bounds();
        assert_eq!(last, Rect::new(320.0, 180.0, 320.0, 60.0));
    }

    #[test]
    fn test_scroll_releases_and_adds_rows() {
        let mut h = harness(20, 100, (5, 3));
        let mut region = h.region(500.0, 200.0);
        region
            .seed(TileKey::new(0, 0), &mut h.env(), |_| Anchor::top_left(0.0, 0.0))
            .unwrap();

        region
            .adjust_position_px(-50.0, Axis::Vertical, &mut h.env())
            .unwrap();
        assert_eq!(region.displayed_count(), 10);

        region
            .adjust_position_px(-100.0, Axis::Vertical, &mut h.env())
            .unwrap();
        let rows: BTreeSet<u32> = region.displayed_tiles().map(|t| t.key().row).collect();
        assert_eq!(rows.into_iter().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        // Released tiles stay cached
        assert!(region.tile(TileKey::new(0, 0)).is_some());
        assert!(!region.is_displayed(TileKey::new(0, 0)));

        let border = region.get_border_tiles_y();
        assert_eq!(border.leading, Some(TileKey::new(0, 2)));
        assert_eq!(border.trailing, Some(TileKey::new(0, 5)));
        assert_eq!(border.start_px, -30.0);
        assert_eq!(border.end_px, 210.0);
        assert!(!border.first_resident);
        assert!(!border.last_resident);

        assert_eq!(region.visible_span(Axis::Vertical), Some((7.5, 17.5)));
        assert_eq!(region.visible_span(Axis::Horizontal), Some((0.0, 7.8125)));
    }

    #[test]
    fn test_partially_visible_tile_kept_offscreen_tile_released() {
        let mut h = harness(10, 1, (1, 1));
        h.config.column_width = vec![50.0; 10];
        let mut region = h.region(100.0, 20.0);
        region
            .seed(TileKey::new(0, 0), &mut h.env(), |_| Anchor::top_left(-10.0, 0.0))
            .unwrap();
        assert_eq!(displayed_keys(&region), vec![(0, 0), (1, 0), (2, 0)]);

        region
            .adjust_position_px(0.0, Axis::Horizontal, &mut h.env())
            .unwrap();
        assert!(region.is_displayed(TileKey::new(0, 0)));

        region
            .adjust_position_px(-140.0, Axis::Horizontal, &mut h.env())
            .unwrap();
        assert!(!region.is_displayed(TileKey::new(0, 0)));
        assert!(!region.is_displayed(TileKey::new(1, 0)));
        assert_eq!(displayed_keys(&region), vec![(2, 0), (3, 0), (4, 0)]);
    }

    #[test]
    fn test_border_tiles_at_start() {
        let mut h = harness(20, 100, (5, 3));
        let mut region = h.region(500.0, 200.0);
        region
            .seed(TileKey::new(0, 0), &mut h.env(), |_| Anchor::top_left(0.0, 0.0))
            .unwrap();
        let border = region.get_border_tiles_x();
        assert!(border.first_resident);
        assert!(!border.last_resident);
        assert_eq!(border.start_px, 0.0);
        assert_eq!(border.end_px, 640.0);
    }

    #[test]
    fn test_get_tile_out_of_range() {
        let mut h = harness(7, 7, (5, 5));
        let mut region = h.region(100.0, 100.0);
        assert_eq!(region.tile_extent(), GridExtent::new(2, 2));
        assert!(region.get_tile(TileKey::new(2, 0), &mut h.env()).is_none());
        let tile = region.get_tile(TileKey::new(1, 1), &mut h.env()).unwrap();
        assert_eq!(tile.range().left, 5);
        assert_eq!(tile.range().right, 6);
        assert!(!tile.is_displayed());
    }

    #[test]
    fn test_cache_bound_evicts_only_hidden_tiles() {
        let mut h = harness(10, 10_000, (5, 2));
        h.config.max_cached_tiles = Some(12);
        let mut region = h.region(300.0, 100.0);
        region
            .seed(TileKey::new(0, 0), &mut h.env(), |_| Anchor::top_left(0.0, 0.0))
            .unwrap();
        for _ in 0..50 {
            region
                .adjust_position_px(-40.0, Axis::Vertical, &mut h.env())
                .unwrap();
            assert!(region.cached_count() <= 12 + region.displayed_count());
            for tile in region.displayed_tiles() {
                assert!(tile.is_created());
            }
        }
        assert!(region.tile(TileKey::new(0, 0)).is_none());
    }

    /// Surface measuring every tile 100px wide; tiles starting at column 5
    /// get a taller row.
    struct TallMiddle;

    impl Surface for TallMiddle {
        fn measure(&mut self, layout: &TileLayout<'_>) -> TileMetrics {
            let height = if layout.range.left == 5 { 55.0 } else { 40.0 };
            TileMetrics {
                width: 100.0,
                row_heights: vec![height; layout.range.rows() as usize],
            }
        }
    }

    fn tall_harness() -> Harness<impl DataSource, TallMiddle> {
        Harness {
            source: numbers(15, 20),
            renderer: TextRenderer::default(),
            surface: TallMiddle,
            config: GridConfig::default().with_tile_size(5, 1),
        }
    }

    #[test]
    fn test_row_heights_synchronized_downward() {
        let mut h = tall_harness();
        let mut region = h.region(250.0, 200.0);
        region
            .seed(TileKey::new(0, 0), &mut h.env(), |_| Anchor::top_left(0.0, 0.0))
            .unwrap();

        for tile in region.displayed_tiles() {
            assert_eq!(tile.height(), 55.0);
            assert_eq!(tile.bounds().y, 55.0 * f64::from(tile.key().row));
        }
        // 200 / 55 -> four rows of three tiles
        assert_eq!(region.displayed_count(), 12);
    }

    #[test]
    fn test_row_heights_synchronized_upward_stay_adjacent() {
        let mut h = tall_harness();
        let mut region = h.region(250.0, 200.0);
        region
            .seed(TileKey::new(0, 10), &mut h.env(), |_| {
                Anchor::bottom_left(0.0, 200.0)
            })
            .unwrap();

        let tiles: Vec<_> = region.displayed_tiles().collect();
        assert!(tiles.iter().all(|t| t.height() == 55.0));
        for tile in &tiles {
            if let Some(below) = region.tile(TileKey::new(tile.key().column, tile.key().row + 1)) {
                if below.is_displayed() {
                    assert_eq!(tile.bounds().bottom(), below.bounds().y);
                }
            }
        }
        let top = tiles.iter().map(|t| t.bounds().y).fold(f64::INFINITY, f64::min);
        assert!(top <= 0.0);
    }

    #[test]
    fn test_fill_reports_missing_edge_tile() {
        // Region laid out for 12 rows while the source now reports 6
        let mut h = harness(10, 12, (5, 3));
        let mut region = h.region(300.0, 400.0);
        let shrunk = numbers(10, 6);
        let mut env = TileEnv {
            counts: shrunk.extent(),
            source: &shrunk,
            renderer: &mut h.renderer,
            surface: &mut h.surface,
            config: &h.config,
            bands: FixedBands::default(),
        };

        let err = region
            .seed(TileKey::new(0, 0), &mut env, |_| Anchor::top_left(0.0, 0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            GridError::EdgeTileNotFound { tile_row: 2, region: location } if location == RegionLocation::CENTER
        ));
        assert_eq!(displayed_keys(&region), vec![(0, 0), (0, 1)]);

        let again = region.fill(false, &mut env).unwrap_err();
        assert!(matches!(again, GridError::EdgeTileNotFound { tile_row: 2, .. }));
        assert_eq!(region.displayed_count(), 2);
    }

    #[test]
    fn test_fill_without_on_screen_tile_is_noop() {
        let mut h = harness(10, 10, (5, 5));
        let mut region = h.region(100.0, 100.0);
        region.fill(false, &mut h.env()).unwrap();
        assert_eq!(region.displayed_count(), 0);
        assert_eq!(region.visible_span(Axis::Vertical), None);
    }

    #[test]
    fn test_clear_disposes_everything() {
        let mut h = harness(20, 100, (5, 3));
        let mut region = h.region(500.0, 200.0);
        region
            .seed(TileKey::new(0, 0), &mut h.env(), |_| Anchor::top_left(0.0, 0.0))
            .unwrap();
        region.clear(&mut h.renderer, &mut h.surface);
        assert_eq!(region.displayed_count(), 0);
        assert_eq!(region.cached_count(), 0);
    }

    #[test]
    fn test_measure_extent() {
        let mut h = harness(12, 4, (5, 3));
        let mut region = h.region(100.0, 100.0);
        assert_eq!(region.measure_extent(Axis::Horizontal, &mut h.env()), 12.0 * 64.0);
        assert_eq!(region.measure_extent(Axis::Vertical, &mut h.env()), 4.0 * 20.0);
    }
}
