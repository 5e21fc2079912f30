use serde::{Deserialize, Serialize};

/// A solved result table laid out the way pandapower stores `res_*` frames:
/// one row per element, keyed by the element's index, with float columns.
///
/// Cells that have no value (isolated buses, NaN) are stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub index: Vec<i64>,
    pub data: Vec<Vec<Option<f64>>>,
}

impl ResultTable {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            index: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Appends one row. Non-finite values are stored as missing.
    pub fn push(&mut self, index: i64, values: &[f64]) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.index.push(index);
        self.data
            .push(values.iter().map(|v| v.is_finite().then_some(*v)).collect());
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Present values of one column, in row order.
    pub fn values<'a>(&'a self, name: &str) -> impl Iterator<Item = f64> + 'a {
        let pos = self.column_position(name);
        self.data
            .iter()
            .filter_map(move |row| pos.and_then(|p| row.get(p).copied().flatten()))
    }

    /// Value at (`index`, `column`), if the row exists and the cell is set.
    pub fn get(&self, index: i64, name: &str) -> Option<f64> {
        let col = self.column_position(name)?;
        let row = self.index.iter().position(|i| *i == index)?;
        self.data[row][col]
    }
}
