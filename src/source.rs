//! Data source contract consumed by the grid engine.
//!
//! The engine treats a source as a pure function of `(column, row)`: it may
//! call `get` more than once for the same cell and expects the same answer
//! until the host signals a refresh.

use crate::types::{CellRange, CellValue, GridExtent};

/// Cell values and dimensions of a two-dimensional dataset.
pub trait DataSource {
    fn column_count(&self) -> u32;

    fn row_count(&self) -> u32;

    /// Value at `(column, row)`. `None` renders as an empty cell.
    fn get(&self, column: u32, row: u32) -> Option<CellValue>;

    /// Hint that `range` is about to be read.
    ///
    /// Implementations may start asynchronous loading; the engine never waits
    /// for it and may call this any number of times before the reads.
    fn prefetch(&self, _range: CellRange) {}

    fn extent(&self) -> GridExtent {
        GridExtent::new(self.column_count(), self.row_count())
    }
}

/// Null source used when no model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl DataSource for EmptySource {
    fn column_count(&self) -> u32 {
        0
    }

    fn row_count(&self) -> u32 {
        0
    }

    fn get(&self, _column: u32, _row: u32) -> Option<CellValue> {
        None
    }
}

/// In-memory table of rows.
#[derive(Debug, Clone, Default)]
pub struct TableSource {
    columns: u32,
    rows: Vec<Vec<Option<CellValue>>>,
}

impl TableSource {
    /// Build from row vectors. The column count is the widest row.
    pub fn new(rows: Vec<Vec<Option<CellValue>>>) -> Self {
        let columns = rows
            .iter()
            .map(|r| u32::try_from(r.len()).unwrap_or(u32::MAX))
            .max()
            .unwrap_or(0);
        Self { columns, rows }
    }

    /// Table of text values.
    pub fn from_text<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .map(|r| {
                    r.into_iter()
                        .map(|s| Some(CellValue::Text(s.into())))
                        .collect()
                })
                .collect(),
        )
    }
}

impl DataSource for TableSource {
    fn column_count(&self) -> u32 {
        self.columns
    }

    fn row_count(&self) -> u32 {
        u32::try_from(self.rows.len()).unwrap_or(u32::MAX)
    }

    fn get(&self, column: u32, row: u32) -> Option<CellValue> {
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(column as usize))
            .cloned()
            .flatten()
    }
}

/// Source computing each cell from a function, for synthetic or very large datasets.
pub struct FnSource<F> {
    columns: u32,
    rows: u32,
    cell: F,
}

impl<F> FnSource<F>
where
    F: Fn(u32, u32) -> Option<CellValue>,
{
    pub fn new(columns: u32, rows: u32, cell: F) -> Self {
        Self {
            columns,
            rows,
            cell,
        }
    }
}

impl<F> DataSource for FnSource<F>
where
    F: Fn(u32, u32) -> Option<CellValue>,
{
    fn column_count(&self) -> u32 {
        self.columns
    }

    fn row_count(&self) -> u32 {
        self.rows
    }

    fn get(&self, column: u32, row: u32) -> Option<CellValue> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        (self.cell)(column, row)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source() {
        let source = EmptySource;
        assert_eq!(source.extent(), GridExtent::new(0, 0));
        assert_eq!(source.get(0, 0), None);
    }

    #[test]
    fn test_table_source_ragged_rows() {
        let source = TableSource::from_text(vec![vec!["a", "b", "c"], vec!["d"]]);
        assert_eq!(source.column_count(), 3);
        assert_eq!(source.row_count(), 2);
        assert_eq!(source.get(1, 0), Some(CellValue::from("b")));
        assert_eq!(source.get(1, 1), None);
        assert_eq!(source.get(0, 5), None);
    }

    #[test]
    fn test_fn_source_bounds() {
        let source = FnSource::new(2, 1_000_000, |c, r| {
            Some(CellValue::Number(f64::from(c) + f64::from(r)))
        });
        assert_eq!(source.get(1, 999_999), Some(CellValue::Number(1_000_000.0)));
        assert_eq!(source.get(2, 0), None);
        assert_eq!(source.get(0, 1_000_000), None);
    }
}
