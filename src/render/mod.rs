//! Cell rendering and measurement seams.
//!
//! This module provides:
//! - `CellRenderer`: turns a cell value into a rendered node, with per-cell
//!   private state kept in the owning tile's `CellContext`
//! - `Surface`: measures laid-out tiles and receives attach/detach notifications
//! - `cache::LruCache`: the bounded tile cache used by regions

pub mod cache;
pub mod surface;

use std::any::Any;
use std::collections::HashMap;

pub use surface::{MetricSurface, Surface, TileLayout, TileMetrics};

use crate::types::{CellValue, Px};

/// Output of a cell renderer: display text plus its preferred size.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    pub text: String,
    pub width: Px,
    pub height: Px,
}

/// Renderer-private per-cell state, scoped to one tile.
///
/// Released when the tile is disposed (after `CellRenderer::dispose` ran for
/// each cell).
#[derive(Default)]
pub struct CellContext {
    state: HashMap<(u32, u32), Box<dyn Any>>,
}

impl CellContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// State stored for `(column, row)`, if it has type `T`.
    pub fn state<T: Any>(&self, column: u32, row: u32) -> Option<&T> {
        self.state
            .get(&(column, row))
            .and_then(|s| s.downcast_ref::<T>())
    }

    pub fn set_state<T: Any>(&mut self, column: u32, row: u32, state: T) {
        self.state.insert((column, row), Box::new(state));
    }

    /// Remove and return the state for `(column, row)`, if it has type `T`.
    pub fn take_state<T: Any>(&mut self, column: u32, row: u32) -> Option<T> {
        let boxed = self.state.remove(&(column, row))?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn clear(&mut self) {
        self.state.clear();
    }
}

impl std::fmt::Debug for CellContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellContext")
            .field("cells_with_state", &self.state.len())
            .finish()
    }
}

/// Turns cell values into rendered nodes.
pub trait CellRenderer {
    /// Render one cell. `None` leaves the cell empty.
    fn render(
        &mut self,
        ctx: &mut CellContext,
        value: Option<&CellValue>,
        column: u32,
        row: u32,
    ) -> Option<RenderedCell>;

    /// Release renderer resources for a cell of a tile being disposed.
    fn dispose(&mut self, _ctx: &mut CellContext, _column: u32, _row: u32) {}
}

/// Plain-text renderer with a fixed-pitch size estimate.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    pub char_width: Px,
    pub line_height: Px,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: crate::config::DEFAULT_ROW_HEIGHT,
        }
    }
}

impl CellRenderer for TextRenderer {
    fn render(
        &mut self,
        _ctx: &mut CellContext,
        value: Option<&CellValue>,
        _column: u32,
        _row: u32,
    ) -> Option<RenderedCell> {
        let text = value?.to_string();
        let (mut lines, mut longest) = (0u32, 0u32);
        for line in text.lines() {
            lines += 1;
            longest = longest.max(u32::try_from(line.chars().count()).unwrap_or(u32::MAX));
        }
        Some(RenderedCell {
            width: f64::from(longest) * self.char_width,
            height: f64::from(lines.max(1)) * self.line_height,
            text,
        })
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

    #[test]
    fn test_context_typed_state() {
        let mut ctx = CellContext::new();
        ctx.set_state(1, 2, 42u64);
        assert_eq!(ctx.state::<u64>(1, 2), Some(&42));
        assert_eq!(ctx.state::<String>(1, 2), None);
        assert_eq!(ctx.state::<u64>(2, 1), None);
        assert_eq!(ctx.take_state::<u64>(1, 2), Some(42));
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_text_renderer_sizes() {
        let mut renderer = TextRenderer::default();
        let mut ctx = CellContext::new();
        let cell = renderer
            .render(&mut ctx, Some(&CellValue::from("ab\nlonger")), 0, 0)
            .unwrap();
        assert_eq!(cell.height, 2.0 * renderer.line_height);
        assert_eq!(cell.width, 6.0 * renderer.char_width);
        assert!(renderer.render(&mut ctx, None, 0, 0).is_none());
    }
}
