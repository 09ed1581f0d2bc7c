//! `GridController` - the entry point of the grid engine.
//!
//! This module provides the controller that:
//! - Partitions the viewport into up to nine regions around the fixed bands
//! - Measures the separator offsets between fixed and scrolling regions
//! - Seeds and fills tiles at the current scroll position
//! - Applies bounded pixel adjustments and corrects overscroll at the ends
//! - Keeps regions of a row band on shared row heights and offsets
//! - Bridges the percentage scrollbar proxy and wheel accumulator
//!
//! All state is owned here; regions and tiles only ever see a borrowed
//! `TileEnv` for the duration of one call.

mod scroll;
pub mod timer;

pub use scroll::{ScrollContainer, ScrollEvent, ScrollOrigin};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use web_time::Instant;

use crate::config::GridConfig;
use crate::error::Result;
use crate::layout::{Anchor, AxisPosition, Region, ScrollPosition, Tile, TileEnv};
use crate::render::{CellRenderer, MetricSurface, Surface, TextRenderer};
use crate::source::{DataSource, EmptySource};
use crate::types::{
    floor_index, Axis, Band, ComponentState, FixedBands, GridExtent, Px, Rect, RegionLocation,
    TileKey,
};

/// Upper bound on correction passes after a seed or an adjustment.
const MAX_OVERSCROLL_PASSES: usize = 4;

/// Upper bound on row reconciliation passes between regions of a row band.
const MAX_RECONCILE_PASSES: usize = 8;

/// Separator changes smaller than this are ignored.
const SEPARATOR_TOLERANCE: Px = 1e-9;

/// Pixel offsets between fixed and scrolling regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Separators {
    pub left: Px,
    pub top: Px,
    pub right: Px,
    pub bottom: Px,
}

/// Absolute indices of the scrolling cells that intersect the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleRange {
    pub first_column: u32,
    pub last_column: u32,
    pub first_row: u32,
    pub last_row: u32,
}

/// Where the seed tile of a structural build goes along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SeedPoint {
    tile: u32,
    offset: SeedOffset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SeedOffset {
    /// Tile's leading edge at pixel 0.
    Origin,
    /// Absolute index whose leading edge goes at pixel 0.
    Index(u32),
    /// Fraction of the tile's extent scrolled past pixel 0.
    Fraction(f64),
}

impl SeedPoint {
    const ORIGIN: SeedPoint = SeedPoint {
        tile: 0,
        offset: SeedOffset::Origin,
    };

    fn position(&self, tile: &Tile, axis: Axis) -> Px {
        let extent = match axis {
            Axis::Horizontal => tile.width(),
            Axis::Vertical => tile.height(),
        };
        match self.offset {
            SeedOffset::Origin => 0.0,
            SeedOffset::Index(index) => -tile.offset_of(axis, index),
            SeedOffset::Fraction(f) => -f * extent,
        }
    }
}

pub struct GridController {
    config: GridConfig,
    source: Box<dyn DataSource>,
    renderer: Box<dyn CellRenderer>,
    surface: Box<dyn Surface>,
    bands: FixedBands,
    /// Source counts captured at the last build.
    counts: GridExtent,
    viewport_width: Px,
    viewport_height: Px,
    regions: Vec<Region>,
    separators: Separators,
    position: ScrollPosition,
    container: ScrollContainer,
    built: bool,
}

impl std::fmt::Debug for GridController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridController")
            .field("bands", &self.bands)
            .field("counts", &self.counts)
            .field("viewport", &(self.viewport_width, self.viewport_height))
            .field("regions", &self.regions)
            .field("separators", &self.separators)
            .field("position", &self.position)
            .field("built", &self.built)
            .finish_non_exhaustive()
    }
}

impl GridController {
    /// Create a controller with no data, the text renderer and the metric surface.
    pub fn new(config: GridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            container: ScrollContainer::new(&config),
            config,
            source: Box::new(EmptySource),
            renderer: Box::new(TextRenderer::default()),
            surface: Box::new(MetricSurface),
            bands: FixedBands::default(),
            counts: GridExtent::default(),
            viewport_width: 0.0,
            viewport_height: 0.0,
            regions: Vec::new(),
            separators: Separators::default(),
            position: ScrollPosition::new(),
            built: false,
        })
    }

    /// Create a controller over `source` with a viewport of the given size.
    pub fn with_source(
        config: GridConfig,
        source: Box<dyn DataSource>,
        width: Px,
        height: Px,
    ) -> Result<Self> {
        let mut controller = Self::new(config)?;
        controller.source = source;
        controller.viewport_width = width.max(0.0);
        controller.viewport_height = height.max(0.0);
        controller.container.set_viewport_size(width, height);
        Ok(controller)
    }

    /// Replace the data source and rebuild if already built.
    pub fn set_source(&mut self, source: Box<dyn DataSource>) -> Result<()> {
        self.source = source;
        self.rebuild_if_built()
    }

    /// Replace the cell renderer. Existing tiles are disposed with the old one.
    pub fn set_renderer(&mut self, renderer: Box<dyn CellRenderer>) -> Result<()> {
        let rebuild = self.built;
        self.clear_regions();
        self.renderer = renderer;
        if rebuild {
            self.render()
        } else {
            Ok(())
        }
    }

    pub fn set_surface(&mut self, surface: Box<dyn Surface>) -> Result<()> {
        let rebuild = self.built;
        self.clear_regions();
        self.surface = surface;
        if rebuild {
            self.render()
        } else {
            Ok(())
        }
    }

    pub fn set_viewport_size(&mut self, width: Px, height: Px) -> Result<()> {
        self.viewport_width = width.max(0.0);
        self.viewport_height = height.max(0.0);
        self.container.set_viewport_size(width, height);
        debug!(width, height, "viewport resized");
        self.rebuild_if_built()
    }

    /// Change the fixed bands. Rejected when they do not fit the source.
    pub fn set_fixed_bands(&mut self, bands: FixedBands) -> Result<()> {
        let extent = self.source.extent();
        bands.validate(extent.columns, extent.rows)?;
        self.bands = bands;
        self.rebuild_if_built()
    }

    pub fn set_column_widths(&mut self, widths: Vec<Px>) -> Result<()> {
        self.config.column_width = widths;
        self.rebuild_if_built()
    }

    /// Re-read the source (counts and values) and rebuild.
    pub fn refresh(&mut self) -> Result<()> {
        self.render()
    }

    /// Apply persisted state. Takes effect on the next build.
    pub fn load_state(&mut self, state: &ComponentState) -> Result<()> {
        self.bands = state.fixed_bands();
        self.config.column_width = state.column_width.clone();
        self.config.cell_border = state.cell_border;
        self.position.load(state);
        self.rebuild_if_built()
    }

    pub fn store_state(&self) -> ComponentState {
        let mut state = ComponentState {
            column_width: self.config.column_width.clone(),
            cell_border: self.config.cell_border,
            ..ComponentState::default()
        };
        state.set_fixed_bands(self.bands);
        self.position.store(&mut state);
        state
    }

    /// Structural (re)build: snapshot counts, lay out regions, seed tiles.
    pub fn render(&mut self) -> Result<()> {
        let counts = self.source.extent();
        self.bands.validate(counts.columns, counts.rows)?;

        self.clear_regions();
        self.container.cancel_pending();
        self.counts = counts;
        let scrollable = self.scrollable_counts();
        self.position
            .clamp_indices(scrollable.columns, scrollable.rows);

        self.build_regions();
        self.built = true;
        debug!(
            columns = counts.columns,
            rows = counts.rows,
            regions = self.regions.len(),
            separators = ?self.separators,
            "grid rebuilt"
        );
        self.render_region_tiles()
    }

    /// Seed every region at the current scroll position and fill it.
    pub fn render_region_tiles(&mut self) -> Result<()> {
        if !self.built || !self.has_viewport() {
            return Ok(());
        }
        let column = self.seed_point(Axis::Horizontal);
        let row = self.seed_point(Axis::Vertical);
        trace!(?column, ?row, "seeding regions");

        let (regions, mut env) = self.split();
        for region in regions.iter_mut() {
            let location = region.location();
            let column = if location.scrolls(Axis::Horizontal) {
                column
            } else {
                SeedPoint::ORIGIN
            };
            let row = if location.scrolls(Axis::Vertical) {
                row
            } else {
                SeedPoint::ORIGIN
            };
            region.seed(TileKey::new(column.tile, row.tile), &mut env, |tile| {
                Anchor::top_left(
                    column.position(tile, Axis::Horizontal),
                    row.position(tile, Axis::Vertical),
                )
            })?;
        }
        self.reconcile_rows()?;
        self.correct_overscroll(Axis::Horizontal)?;
        self.correct_overscroll(Axis::Vertical)
    }

    /// Scroll by `px` along `axis`; positive values move content right/down.
    ///
    /// The delta is bounded to half the scrolling region's extent and to the
    /// resident ends of the content. Returns the delta actually applied.
    pub fn adjust_position_px(
        &mut self,
        px: Px,
        axis: Axis,
        origin: ScrollOrigin,
        now: Instant,
    ) -> Result<Px> {
        if !self.built || !px.is_finite() {
            return Ok(0.0);
        }
        let Some(driver) = self.driver(axis) else {
            return Ok(0.0);
        };
        let extent = driver.bounds().extent(axis);
        if extent <= 0.0 {
            return Ok(0.0);
        }

        let half = extent / 2.0;
        let border = driver.border_tiles(axis);
        let upper = if border.first_resident {
            -border.start_px
        } else {
            f64::INFINITY
        };
        let lower = if border.last_resident {
            (extent - border.end_px).min(upper)
        } else {
            f64::NEG_INFINITY
        };
        let delta = px.clamp(-half, half).clamp(lower, upper.max(lower));

        let (regions, mut env) = self.split();
        for region in regions.iter_mut().filter(|r| r.location().scrolls(axis)) {
            region.adjust_position_px(delta, axis, &mut env)?;
        }
        self.reconcile_rows()?;
        self.correct_overscroll(axis)?;
        self.update_position(axis);
        if origin.syncs_container() {
            self.sync_container(axis, now);
        }
        trace!(px, delta, ?axis, ?origin, "position adjusted");
        Ok(delta)
    }

    /// Apply a scroll event from the container or the host.
    pub fn handle_scroll(
        &mut self,
        event: ScrollEvent,
        origin: ScrollOrigin,
        now: Instant,
    ) -> Result<()> {
        match event {
            ScrollEvent::Incremental {
                horizontal_increment,
                vertical_increment,
            } => {
                if !self.has_viewport() {
                    return Ok(());
                }
                if horizontal_increment.abs() > 0.0 {
                    self.adjust_position_px(-horizontal_increment, Axis::Horizontal, origin, now)?;
                }
                if vertical_increment.abs() > 0.0 {
                    self.adjust_position_px(-vertical_increment, Axis::Vertical, origin, now)?;
                }
                Ok(())
            }
            ScrollEvent::Absolute {
                horizontal,
                vertical,
            } => {
                self.position.set_scroll(horizontal, vertical);
                self.reseed()
            }
        }
    }

    /// Feed a wheel tick. Returns `false` when absorbed (no viewport yet).
    pub fn wheel(&mut self, dx: Px, dy: Px, now: Instant) -> bool {
        self.container.wheel(dx, dy, now)
    }

    /// Flush accumulated wheel input if its debounce expired. Returns whether
    /// a scroll was applied.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        match self.container.poll(now) {
            Some(event) => {
                self.handle_scroll(event, ScrollOrigin::Wheel, now)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Native scrollbar callback in percent. Echoes of programmatic moves are ignored.
    pub fn native_scroll(&mut self, x: Option<f64>, y: Option<f64>, now: Instant) -> Result<bool> {
        match self.container.native_scroll(x, y, now) {
            Some(event) => {
                self.handle_scroll(event, ScrollOrigin::Drag, now)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Scrollbar thumb drag in percent, applied immediately.
    pub fn drag_to(&mut self, x: Option<f64>, y: Option<f64>, now: Instant) -> Result<()> {
        if !self.has_viewport() {
            return Ok(());
        }
        let event = self.container.drag_to(x, y);
        self.handle_scroll(event, ScrollOrigin::Drag, now)
    }

    /// Jump so the given scrollable-band indices sit at the leading edges.
    pub fn scroll_to_index(
        &mut self,
        column: Option<u32>,
        row: Option<u32>,
        now: Instant,
    ) -> Result<()> {
        self.position.set_index(column, row);
        let scrollable = self.scrollable_counts();
        self.position
            .clamp_indices(scrollable.columns, scrollable.rows);
        self.reseed()?;
        if column.is_some() {
            self.sync_container(Axis::Horizontal, now);
        }
        if row.is_some() {
            self.sync_container(Axis::Vertical, now);
        }
        Ok(())
    }

    /// Jump to percent positions and move the scrollbar proxy to match.
    pub fn scroll_to_percent(
        &mut self,
        column: Option<f64>,
        row: Option<f64>,
        now: Instant,
    ) -> Result<()> {
        self.handle_scroll(
            ScrollEvent::Absolute {
                horizontal: column,
                vertical: row,
            },
            ScrollOrigin::Programmatic,
            now,
        )?;
        self.container.set_position(column, row, now);
        Ok(())
    }

    /// Scrolling cells currently intersecting the viewport.
    pub fn visible_range(&self) -> Option<VisibleRange> {
        let (first_column, last_column) = self.visible_indices(Axis::Horizontal)?;
        let (first_row, last_row) = self.visible_indices(Axis::Vertical)?;
        Some(VisibleRange {
            first_column,
            last_column,
            first_row,
            last_row,
        })
    }

    pub fn separators(&self) -> Separators {
        self.separators
    }

    pub fn region(&self, location: RegionLocation) -> Option<&Region> {
        self.regions.iter().find(|r| r.location() == location)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn scroll_position(&self) -> &ScrollPosition {
        &self.position
    }

    pub fn scroll_container(&self) -> &ScrollContainer {
        &self.container
    }

    pub fn displayed_tile_count(&self) -> usize {
        self.regions.iter().map(Region::displayed_count).sum()
    }

    pub fn cached_tile_count(&self) -> usize {
        self.regions.iter().map(Region::cached_count).sum()
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn fixed_bands(&self) -> FixedBands {
        self.bands
    }

    /// Source counts captured at the last build.
    pub fn counts(&self) -> GridExtent {
        self.counts
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn has_viewport(&self) -> bool {
        self.viewport_width > 0.0 && self.viewport_height > 0.0
    }

    fn rebuild_if_built(&mut self) -> Result<()> {
        if self.built {
            self.render()
        } else {
            Ok(())
        }
    }

    fn split(&mut self) -> (&mut Vec<Region>, TileEnv<'_>) {
        let Self {
            regions,
            source,
            renderer,
            surface,
            config,
            bands,
            counts,
            ..
        } = self;
        let env = TileEnv {
            source: &**source,
            renderer: &mut **renderer,
            surface: &mut **surface,
            config,
            bands: *bands,
            counts: *counts,
        };
        (regions, env)
    }

    fn clear_regions(&mut self) {
        for region in &mut self.regions {
            region.clear(&mut *self.renderer, &mut *self.surface);
        }
        self.regions.clear();
        self.built = false;
    }

    /// Detach every displayed tile and seed again from the scroll position.
    fn reseed(&mut self) -> Result<()> {
        if !self.built {
            return Ok(());
        }
        for region in &mut self.regions {
            region.remove_all_displayed(&mut *self.surface);
        }
        self.render_region_tiles()
    }

    fn scrollable_counts(&self) -> GridExtent {
        let (_, columns) = self
            .counts
            .band_span(Axis::Horizontal, Band::Center, &self.bands);
        let (_, rows) = self
            .counts
            .band_span(Axis::Vertical, Band::Center, &self.bands);
        GridExtent::new(columns, rows)
    }

    /// Lay out the regions around the fixed bands and measure the separators.
    fn build_regions(&mut self) {
        let tile_size = self.config.tile_size;
        let max_cached = self.config.max_cached_tiles;
        for location in RegionLocation::all() {
            let (_, columns) = self
                .counts
                .band_span(Axis::Horizontal, location.h, &self.bands);
            let (_, rows) = self
                .counts
                .band_span(Axis::Vertical, location.v, &self.bands);
            if columns == 0 || rows == 0 {
                continue;
            }
            self.regions.push(Region::new(
                location,
                Rect::default(),
                GridExtent::new(columns, rows),
                tile_size,
                max_cached,
            ));
        }

        let (left_first, left) = self
            .counts
            .band_span(Axis::Horizontal, Band::Leading, &self.bands);
        let (right_first, right) = self
            .counts
            .band_span(Axis::Horizontal, Band::Trailing, &self.bands);
        self.separators = Separators {
            left: self.config.columns_width(left_first, left),
            right: self.config.columns_width(right_first, right),
            top: self.measure_fixed_rows(Band::Leading),
            bottom: self.measure_fixed_rows(Band::Trailing),
        };
        debug!(separators = ?self.separators, "separators measured");
        self.layout_regions();
    }

    /// Place every region around the current separators.
    fn layout_regions(&mut self) {
        let (width, height) = (self.viewport_width, self.viewport_height);
        let sep = self.separators;
        for region in &mut self.regions {
            let location = region.location();
            let (x, w) = match location.h {
                Band::Leading => (0.0, sep.left),
                Band::Center => (sep.left, (width - sep.left - sep.right).max(0.0)),
                Band::Trailing => (width - sep.right, sep.right),
            };
            let (y, h) = match location.v {
                Band::Leading => (0.0, sep.top),
                Band::Center => (sep.top, (height - sep.top - sep.bottom).max(0.0)),
                Band::Trailing => (height - sep.bottom, sep.bottom),
            };
            region.set_bounds(Rect::new(x, y, w, h));
        }
    }

    /// First estimate of a fixed row band's height: the tallest first tile
    /// column among its regions. Refitted once rows are reconciled.
    fn measure_fixed_rows(&mut self, band: Band) -> Px {
        let (regions, mut env) = self.split();
        regions
            .iter_mut()
            .filter(|r| r.location().v == band)
            .map(|region| region.measure_extent(Axis::Vertical, &mut env))
            .fold(0.0, f64::max)
    }

    /// Region that drives scrolling along `axis`: the center region, or any
    /// region scrolling on that axis when there is no center.
    fn driver(&self, axis: Axis) -> Option<&Region> {
        self.region(RegionLocation::CENTER).or_else(|| {
            self.regions
                .iter()
                .find(|r| r.location().scrolls(axis))
        })
    }

    fn seed_point(&self, axis: Axis) -> SeedPoint {
        let per_tile = self.config.tile_size.along(axis);
        let (first, count) = self.counts.band_span(axis, Band::Center, &self.bands);
        if count == 0 {
            return SeedPoint::ORIGIN;
        }
        match self.position.axis(axis) {
            AxisPosition::Unset => SeedPoint::ORIGIN,
            AxisPosition::Index(index) => {
                let index = index.min(count - 1);
                SeedPoint {
                    tile: index / per_tile,
                    offset: SeedOffset::Index(first + index),
                }
            }
            AxisPosition::Percent(percent) => {
                let extent = self.driver(axis).map_or(0.0, |r| r.bounds().extent(axis));
                let default_size = match axis {
                    Axis::Horizontal => self.config.default_column_width,
                    Axis::Vertical => self.config.default_row_height,
                };
                let span = extent / default_size;
                let target = percent / 100.0 * (f64::from(count) - span).max(0.0);
                let tile = floor_index(target, count) / per_tile;
                let tile_start = f64::from(tile * per_tile);
                let tile_cells = f64::from(per_tile.min(count - tile * per_tile));
                let fraction = ((target - tile_start) / tile_cells).clamp(0.0, 1.0);
                SeedPoint {
                    tile,
                    offset: SeedOffset::Fraction(fraction),
                }
            }
        }
    }

    /// Pull content back when a resident end tile was pushed past the
    /// scrolling region's edge.
    fn correct_overscroll(&mut self, axis: Axis) -> Result<()> {
        for _ in 0..MAX_OVERSCROLL_PASSES {
            let Some(driver) = self.driver(axis) else {
                return Ok(());
            };
            let extent = driver.bounds().extent(axis);
            let border = driver.border_tiles(axis);
            let correction = if border.first_resident && border.start_px > 0.0 {
                -border.start_px
            } else if border.last_resident && border.end_px < extent {
                let gap = extent - border.end_px;
                if border.first_resident {
                    gap.min(-border.start_px)
                } else {
                    gap
                }
            } else {
                return Ok(());
            };
            if correction.abs() <= f64::EPSILON {
                return Ok(());
            }
            trace!(?axis, correction, "correcting overscroll");

            let (regions, mut env) = self.split();
            for region in regions.iter_mut().filter(|r| r.location().scrolls(axis)) {
                region.adjust_position_px(correction, axis, &mut env)?;
            }
            self.reconcile_rows()?;
        }
        Ok(())
    }

    /// Keep the regions of each row band on the same row heights and
    /// offsets, and size the fixed row bands to fit them.
    fn reconcile_rows(&mut self) -> Result<()> {
        for _ in 0..MAX_RECONCILE_PASSES {
            let mut raised = false;
            for band in Band::ALL {
                raised |= self.align_band(band)?;
            }
            let refitted = self.refit_separators()?;
            if !raised && !refitted {
                return Ok(());
            }
        }
        debug!("row reconciliation did not settle");
        Ok(())
    }

    /// Region whose rows the rest of a row band follows: the scrolling
    /// column region when it shows anything, else the first that does.
    fn band_reference(&self, band: Band) -> Option<usize> {
        let showing = || {
            self.regions
                .iter()
                .enumerate()
                .filter(move |(_, r)| r.location().v == band && r.displayed_count() > 0)
        };
        showing()
            .find(|(_, r)| r.location().h == Band::Center)
            .or_else(|| showing().next())
            .map(|(i, _)| i)
    }

    /// Equalize row heights over the regions of one row band and move the
    /// frozen column regions onto the reference region's row offsets.
    ///
    /// Returns whether a frozen column raised a row past the reference.
    fn align_band(&mut self, band: Band) -> Result<bool> {
        let Some(reference) = self.band_reference(band) else {
            return Ok(false);
        };
        let followers: Vec<usize> = self
            .regions
            .iter()
            .enumerate()
            .filter(|(i, r)| {
                *i != reference && r.location().v == band && r.location().h != Band::Center
            })
            .map(|(i, _)| i)
            .collect();
        if followers.is_empty() {
            return Ok(false);
        }

        let mut tallest = BTreeMap::new();
        for region in self.regions.iter().filter(|r| r.location().v == band) {
            region.collect_row_heights(&mut tallest);
        }
        let (regions, mut env) = self.split();
        let Some(leader) = regions.get_mut(reference) else {
            return Ok(false);
        };
        leader.grow_rows(&tallest, &mut *env.surface);
        let layout = leader.row_layout();

        let mut raised = false;
        for index in followers {
            if let Some(region) = regions.get_mut(index) {
                raised |= region.mirror_rows(&layout, &mut tallest, &mut env)?;
            }
        }
        if raised {
            trace!(?band, "frozen columns raised row heights");
        }
        Ok(raised)
    }

    /// Resize the fixed row bands to their stacked tile rows. Returns whether
    /// the region layout changed.
    fn refit_separators(&mut self) -> Result<bool> {
        let top = self
            .fixed_rows_extent(Band::Leading)
            .unwrap_or(self.separators.top);
        let bottom = self
            .fixed_rows_extent(Band::Trailing)
            .unwrap_or(self.separators.bottom);
        if (top - self.separators.top).abs() <= SEPARATOR_TOLERANCE
            && (bottom - self.separators.bottom).abs() <= SEPARATOR_TOLERANCE
        {
            return Ok(false);
        }
        self.separators.top = top;
        self.separators.bottom = bottom;
        debug!(separators = ?self.separators, "fixed rows refitted");
        self.layout_regions();

        let (regions, mut env) = self.split();
        for region in regions.iter_mut() {
            region.fill(false, &mut env)?;
            region.fill(true, &mut env)?;
        }
        Ok(true)
    }

    fn fixed_rows_extent(&mut self, band: Band) -> Option<Px> {
        let reference = self.band_reference(band)?;
        let (regions, mut env) = self.split();
        regions
            .get_mut(reference)
            .map(|region| region.stacked_extent(&mut env))
    }

    /// Record the first visible scrollable index as the authoritative position.
    fn update_position(&mut self, axis: Axis) {
        let Some((start, _)) = self.driver(axis).and_then(|r| r.visible_span(axis)) else {
            return;
        };
        let (first, count) = self.counts.band_span(axis, Band::Center, &self.bands);
        let index = floor_index(start - f64::from(first), count);
        self.position.set_axis(axis, AxisPosition::Index(index));
    }

    /// Move the scrollbar proxy to the current position along `axis`.
    fn sync_container(&mut self, axis: Axis, now: Instant) {
        let Some((start, end)) = self.driver(axis).and_then(|r| r.visible_span(axis)) else {
            return;
        };
        let (first, count) = self.counts.band_span(axis, Band::Center, &self.bands);
        let scrollable = f64::from(count) - (end - start);
        let percent = if scrollable > 0.0 {
            (start - f64::from(first)) / scrollable * 100.0
        } else {
            0.0
        };
        match axis {
            Axis::Horizontal => self.container.set_position(Some(percent), None, now),
            Axis::Vertical => self.container.set_position(None, Some(percent), now),
        }
    }

    fn visible_indices(&self, axis: Axis) -> Option<(u32, u32)> {
        let (start, end) = self.driver(axis)?.visible_span(axis)?;
        let upper = self.counts.along(axis);
        let first = floor_index(start, upper);
        let last = floor_index(end.ceil() - 1.0, upper).max(first);
        Some((first, last))
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
    use crate::source::FnSource;
    use crate::types::CellValue;

    fn controller(columns: u32, rows: u32) -> GridController {
        let source = FnSource::new(columns, rows, |c, r| {
            Some(CellValue::Text(format!("{c}:{r}")))
        });
        let config = GridConfig::default().with_tile_size(5, 3);
        GridController::with_source(config, Box::new(source), 640.0, 400.0).unwrap()
    }

    #[test]
    fn test_not_built_until_render() {
        let mut grid = controller(10, 10);
        assert!(!grid.is_built());
        assert_eq!(grid.displayed_tile_count(), 0);
        let applied = grid
            .adjust_position_px(-50.0, Axis::Vertical, ScrollOrigin::Wheel, Instant::now())
            .unwrap();
        assert_eq!(applied, 0.0);
        grid.render().unwrap();
        assert!(grid.is_built());
        assert!(grid.displayed_tile_count() > 0);
    }

    #[test]
    fn test_regions_follow_fixed_bands() {
        let mut grid = controller(20, 100);
        grid.set_fixed_bands(FixedBands::new(1, 2, 0, 1)).unwrap();
        grid.render().unwrap();
        // Leading/center columns x leading/center/trailing rows
        assert_eq!(grid.regions().len(), 6);
        let sep = grid.separators();
        assert_eq!(sep.left, 64.0);
        assert_eq!(sep.right, 0.0);
        assert_eq!(sep.top, 40.0);
        assert_eq!(sep.bottom, 20.0);

        let center = grid.region(RegionLocation::CENTER).unwrap();
        assert_eq!(center.bounds(), Rect::new(64.0, 40.0, 576.0, 340.0));
        let corner = grid
            .region(RegionLocation::new(Band::Leading, Band::Trailing))
            .unwrap();
        assert_eq!(corner.bounds(), Rect::new(0.0, 380.0, 64.0, 20.0));
    }

    #[test]
    fn test_invalid_bands_rejected() {
        let mut grid = controller(4, 4);
        let err = grid.set_fixed_bands(FixedBands::new(3, 0, 2, 0)).unwrap_err();
        assert!(matches!(err, crate::GridError::InvalidFixedBands { .. }));
        assert_eq!(grid.fixed_bands(), FixedBands::default());
    }

    #[test]
    fn test_scroll_to_index_aligns_row() {
        let mut grid = controller(10, 1000);
        grid.render().unwrap();
        grid.scroll_to_index(None, Some(100), Instant::now()).unwrap();
        let range = grid.visible_range().unwrap();
        assert_eq!(range.first_row, 100);
        assert_eq!(range.last_row, 119);
        assert_eq!(grid.scroll_position().row_index(), Some(100));
    }

    #[test]
    fn test_overscroll_at_start_is_corrected() {
        let mut grid = controller(10, 1000);
        grid.render().unwrap();
        let applied = grid
            .adjust_position_px(150.0, Axis::Vertical, ScrollOrigin::Wheel, Instant::now())
            .unwrap();
        assert_eq!(applied, 0.0);
        let border = grid.region(RegionLocation::CENTER).unwrap().get_border_tiles_y();
        assert_eq!(border.start_px, 0.0);
    }

    #[test]
    fn test_absolute_percent_reaches_end() {
        let mut grid = controller(10, 1000);
        grid.render().unwrap();
        grid.scroll_to_percent(None, Some(100.0), Instant::now())
            .unwrap();
        let range = grid.visible_range().unwrap();
        assert_eq!(range.last_row, 999);
        let border = grid.region(RegionLocation::CENTER).unwrap().get_border_tiles_y();
        assert!(border.last_resident);
        assert!((border.end_px - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_store_state_reflects_position() {
        let mut grid = controller(10, 1000);
        grid.set_fixed_bands(FixedBands::new(0, 1, 0, 0)).unwrap();
        grid.render().unwrap();
        grid.scroll_to_index(None, Some(42), Instant::now()).unwrap();
        let state = grid.store_state();
        assert_eq!(state.fixed_rows_top, 1);
        assert_eq!(state.row_index, Some(42));
        assert_eq!(state.row_scroll, None);
    }
}
