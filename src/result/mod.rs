use std::fmt;

use crate::core::{ColumnDefinition, PersistenceError, Result, Value};
use crate::storage::ColumnValueReader;

pub type Row = Vec<Value>;

/// Rows returned by the driver, with the column names of the result set.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names compare case-insensitively, like SQL identifiers.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn data_rows(&self) -> impl Iterator<Item = DataRow<'_>> {
        self.rows.iter().map(move |row| DataRow { result: self, row })
    }
}

/// One row of a [`QueryResult`] with by-name column access.
#[derive(Debug, Clone, Copy)]
pub struct DataRow<'a> {
    result: &'a QueryResult,
    row: &'a Row,
}

impl<'a> DataRow<'a> {
    pub fn get(&self, column: &str) -> Result<&'a Value> {
        self.result
            .column_index(column)
            .and_then(|index| self.row.get(index))
            .ok_or_else(|| PersistenceError::Query(format!("Column '{}' is not part of the result", column)))
    }

    pub fn values(&self) -> &'a [Value] {
        self.row
    }
}

impl ColumnValueReader for DataRow<'_> {
    fn read(&self, column: &ColumnDefinition) -> Result<Value> {
        self.get(&column.name).cloned()
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return writeln!(f, "Empty result set");
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (i, value) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(value.to_string().len());
            }
        }

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{:width$}", col, width = widths[i]))
            .collect();
        writeln!(f, "{}", header.join(" | "))?;

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(f, "{}", separator)?;

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .take(widths.len())
                .map(|(i, val)| format!("{:width$}", val.to_string(), width = widths[i]))
                .collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }

        write!(f, "\n{} row(s)", self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DbType, StorageTypeInformation};

    #[test]
    fn test_data_row_lookup_ignores_case() {
        let result = QueryResult::new(
            vec!["ID".into(), "Name".into()],
            vec![vec![Value::Integer(1), Value::Text("a".into())]],
        );
        let row = result.data_rows().next().unwrap();

        assert_eq!(row.get("name").unwrap(), &Value::Text("a".into()));
        assert!(row.get("Missing").is_err());

        let column = ColumnDefinition::new("id", StorageTypeInformation::new("int", DbType::Int32, None));
        assert_eq!(row.read(&column).unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_display() {
        let result = QueryResult::new(vec!["A".into()], vec![vec![Value::Integer(42)]]);
        let text = result.to_string();
        assert!(text.starts_with("A "));
        assert!(text.ends_with("1 row(s)"));
        assert_eq!(QueryResult::empty().to_string(), "Empty result set\n");
    }
}
