//! Persisted component state of a grid instance.

use serde::{Deserialize, Serialize};

use super::{FixedBands, Px};
use crate::error::Result;

/// Host-persisted state: fixed bands, column extents and the scroll position.
///
/// Exactly one of `column_index` / `column_scroll` (and of `row_index` /
/// `row_scroll`) is expected to be set; when both are present the index wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentState {
    pub fixed_rows_top: u32,
    pub fixed_rows_bottom: u32,
    pub fixed_columns_left: u32,
    pub fixed_columns_right: u32,
    /// Per-column widths; missing columns use the configured default.
    pub column_width: Vec<Px>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_scroll: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_scroll: Option<f64>,
    /// Visual only.
    pub cell_border: Px,
}

impl ComponentState {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn fixed_bands(&self) -> FixedBands {
        FixedBands {
            left: self.fixed_columns_left,
            top: self.fixed_rows_top,
            right: self.fixed_columns_right,
            bottom: self.fixed_rows_bottom,
        }
    }

    pub fn set_fixed_bands(&mut self, bands: FixedBands) {
        self.fixed_columns_left = bands.left;
        self.fixed_rows_top = bands.top;
        self.fixed_columns_right = bands.right;
        self.fixed_rows_bottom = bands.bottom;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_keys() {
        let state = ComponentState::from_json(
            r#"{"fixedRowsTop": 1, "fixedColumnsLeft": 2, "rowScroll": 50.0, "columnWidth": [80, 90]}"#,
        )
        .unwrap();
        assert_eq!(state.fixed_bands(), FixedBands::new(2, 1, 0, 0));
        assert_eq!(state.row_scroll, Some(50.0));
        assert_eq!(state.column_width, vec![80.0, 90.0]);
        assert_eq!(state.row_index, None);

        let json = state.to_json().unwrap();
        assert!(json.contains("\"rowScroll\":50.0"));
        assert!(!json.contains("rowIndex"));
    }
}
