//! Where the viewport currently looks, per axis.
//!
//! Each axis is either unset, an index into the scrollable band, or a percent
//! of the scroll range. The two representations are mutually exclusive: setting
//! one clears the other on that axis.

use crate::types::{clamp_percent, Axis, ComponentState};

/// Position along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AxisPosition {
    #[default]
    Unset,
    /// Index relative to the first scrollable row/column.
    Index(u32),
    /// Percent of the scroll range, `0..=100`.
    Percent(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollPosition {
    column: AxisPosition,
    row: AxisPosition,
}

impl ScrollPosition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set indices. `None` leaves that axis as it is.
    pub fn set_index(&mut self, column: Option<u32>, row: Option<u32>) {
        if let Some(c) = column {
            self.column = AxisPosition::Index(c);
        }
        if let Some(r) = row {
            self.row = AxisPosition::Index(r);
        }
    }

    /// Set percents, clamped to `0..=100`. `None` leaves that axis as it is.
    pub fn set_scroll(&mut self, column: Option<f64>, row: Option<f64>) {
        if let Some(c) = column {
            self.column = AxisPosition::Percent(clamp_percent(c));
        }
        if let Some(r) = row {
            self.row = AxisPosition::Percent(clamp_percent(r));
        }
    }

    pub fn axis(&self, axis: Axis) -> AxisPosition {
        match axis {
            Axis::Horizontal => self.column,
            Axis::Vertical => self.row,
        }
    }

    pub fn set_axis(&mut self, axis: Axis, position: AxisPosition) {
        let position = match position {
            AxisPosition::Percent(p) => AxisPosition::Percent(clamp_percent(p)),
            other => other,
        };
        match axis {
            Axis::Horizontal => self.column = position,
            Axis::Vertical => self.row = position,
        }
    }

    pub fn column_index(&self) -> Option<u32> {
        match self.column {
            AxisPosition::Index(i) => Some(i),
            _ => None,
        }
    }

    pub fn row_index(&self) -> Option<u32> {
        match self.row {
            AxisPosition::Index(i) => Some(i),
            _ => None,
        }
    }

    pub fn column_scroll(&self) -> Option<f64> {
        match self.column {
            AxisPosition::Percent(p) => Some(p),
            _ => None,
        }
    }

    pub fn row_scroll(&self) -> Option<f64> {
        match self.row {
            AxisPosition::Percent(p) => Some(p),
            _ => None,
        }
    }

    /// Clamp indices into `[0, count)` of each scrollable band.
    pub fn clamp_indices(&mut self, columns: u32, rows: u32) {
        if let AxisPosition::Index(i) = self.column {
            self.column = AxisPosition::Index(i.min(columns.saturating_sub(1)));
        }
        if let AxisPosition::Index(i) = self.row {
            self.row = AxisPosition::Index(i.min(rows.saturating_sub(1)));
        }
    }

    /// Read the position from persisted state. An index wins over a percent.
    pub fn load(&mut self, state: &ComponentState) {
        *self = Self::default();
        self.set_scroll(state.column_scroll, state.row_scroll);
        self.set_index(state.column_index, state.row_index);
    }

    /// Write the position into persisted state, clearing the inactive representation.
    pub fn store(&self, state: &mut ComponentState) {
        state.column_index = self.column_index();
        state.column_scroll = self.column_scroll();
        state.row_index = self.row_index();
        state.row_scroll = self.row_scroll();
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
    fn test_index_clears_percent_on_same_axis_only() {
        let mut pos = ScrollPosition::new();
        pos.set_scroll(Some(30.0), Some(40.0));
        pos.set_index(Some(7), None);

        assert_eq!(pos.column_index(), Some(7));
        assert_eq!(pos.column_scroll(), None);
        assert_eq!(pos.row_scroll(), Some(40.0));
        assert_eq!(pos.row_index(), None);
    }

    #[test]
    fn test_percent_clears_index() {
        let mut pos = ScrollPosition::new();
        pos.set_index(Some(3), Some(4));
        pos.set_scroll(None, Some(10.0));

        assert_eq!(pos.row_index(), None);
        assert_eq!(pos.row_scroll(), Some(10.0));
        assert_eq!(pos.column_index(), Some(3));
    }

    #[test]
    fn test_percent_is_clamped() {
        let mut pos = ScrollPosition::new();
        pos.set_scroll(Some(-5.0), Some(250.0));
        assert_eq!(pos.column_scroll(), Some(0.0));
        assert_eq!(pos.row_scroll(), Some(100.0));
        pos.set_scroll(Some(f64::NAN), None);
        assert_eq!(pos.column_scroll(), Some(0.0));
    }

    #[test]
    fn test_store_load_round_trip() {
        let mut pos = ScrollPosition::new();
        pos.set_scroll(None, Some(12.5));
        pos.set_index(Some(5), None);

        let mut state = ComponentState::default();
        pos.store(&mut state);
        assert_eq!(state.column_index, Some(5));
        assert_eq!(state.column_scroll, None);
        assert_eq!(state.row_scroll, Some(12.5));

        let mut loaded = ScrollPosition::new();
        loaded.load(&state);
        assert_eq!(loaded, pos);
        assert_eq!(loaded.axis(Axis::Horizontal), AxisPosition::Index(5));
        assert_eq!(loaded.axis(Axis::Vertical), AxisPosition::Percent(12.5));
    }

    #[test]
    fn test_load_prefers_index() {
        let state = ComponentState {
            row_index: Some(9),
            row_scroll: Some(50.0),
            ..ComponentState::default()
        };
        let mut pos = ScrollPosition::new();
        pos.load(&state);
        assert_eq!(pos.axis(Axis::Vertical), AxisPosition::Index(9));
        assert_eq!(pos.axis(Axis::Horizontal), AxisPosition::Unset);
    }

    #[test]
    fn test_clamp_indices() {
        let mut pos = ScrollPosition::new();
        pos.set_index(Some(50), Some(0));
        pos.clamp_indices(10, 0);
        assert_eq!(pos.column_index(), Some(9));
        assert_eq!(pos.row_index(), Some(0));
    }
}
