//! A small column/row shape shared by the dashboard tables and the export.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Number(v) => write!(f, "{v:.2}"),
            CellValue::Text(v) => f.write_str(v),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Empty, Into::into)
    }
}

/// Record types that can be laid out as a table row.
pub trait TableRow {
    const COLUMNS: &'static [&'static str];

    fn cells(&self) -> Vec<CellValue>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn from_rows<T: TableRow>(title: &str, rows: &[T]) -> Self {
        Self {
            title: title.to_string(),
            columns: T::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: rows.iter().map(TableRow::cells).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows rendered to display strings, for HTML templates.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair(i64, Option<String>);

    impl TableRow for Pair {
        const COLUMNS: &'static [&'static str] = &["id", "note"];

        fn cells(&self) -> Vec<CellValue> {
            vec![self.0.into(), self.1.clone().into()]
        }
    }

    #[test]
    fn builds_from_rows() {
        let table = Table::from_rows("Pairs", &[Pair(1, Some("a".into())), Pair(2, None)]);
        assert_eq!(table.columns, vec!["id", "note"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1][1], CellValue::Empty);
        assert_eq!(table.display_rows()[0], vec!["1", "a"]);
    }

    #[test]
    fn numbers_display_with_two_decimals() {
        assert_eq!(CellValue::Number(3.456).to_string(), "3.46");
        assert_eq!(CellValue::Empty.to_string(), "");
    }
}
