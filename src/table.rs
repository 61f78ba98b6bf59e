//! Flat, column-oriented view of the activity records returned by the API.
//!
//! Nested JSON objects are flattened into dotted column names, so
//! `{"map": {"id": "a1"}}` becomes a `map.id` column. Arrays and scalars are
//! kept as single cells. Columns keep the order in which they first appear
//! and rows keep API order.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::GpsPoint;

/// A single value in the activity table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Path(Vec<GpsPoint>),
    /// Arrays and anything else that has no flat representation
    Json(Value),
}

impl Cell {
    /// Convert a leaf JSON value into a cell.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Cell::Null, Cell::Number),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Json(other.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Cell::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&[GpsPoint]> {
        match self {
            Cell::Path(points) => Some(points),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NaN"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(d) => write!(f, "{d}"),
            Cell::Time(t) => write!(f, "{t}"),
            Cell::Path(points) => write!(f, "[{} points]", points.len()),
            Cell::Json(v) => write!(f, "{v}"),
        }
    }
}

static NULL: Cell = Cell::Null;

/// One activity: column name to value. Columns absent from a row read as null.
pub type Row = HashMap<String, Cell>;

/// In-memory table of activities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityTable {
    columns: Vec<String>,
    rows: Vec<Row>,
    /// Row labels once the table has been indexed by date
    index: Option<Vec<NaiveDate>>,
}

impl ActivityTable {
    /// Flatten a list of JSON activity objects into a table.
    ///
    /// Every record must be a JSON object.
    pub fn from_records(records: &[Value]) -> Result<Self> {
        let mut table = Self::default();

        for (i, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or_else(|| {
                Error::MalformedResponse(format!("activity #{i} is not a JSON object"))
            })?;

            let mut row = Row::new();
            table.flatten_into(None, object, &mut row);
            table.rows.push(row);
        }

        Ok(table)
    }

    fn flatten_into(&mut self, prefix: Option<&str>, object: &Map<String, Value>, row: &mut Row) {
        for (key, value) in object {
            let name = match prefix {
                Some(p) => format!("{p}.{key}"),
                None => key.clone(),
            };

            match value {
                Value::Object(nested) => self.flatten_into(Some(&name), nested, row),
                leaf => {
                    self.register_column(&name);
                    row.insert(name, Cell::from_json(leaf));
                }
            }
        }
    }

    fn register_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Value at `(row, column)`; absent cells and out-of-range rows read as null.
    pub fn get(&self, row: usize, column: &str) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    /// All values of one column in row order, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        if !self.has_column(name) {
            return None;
        }
        Some((0..self.len()).map(|i| self.get(i, name)).collect())
    }

    /// Like [`column`](Self::column) but a missing column is an error.
    pub fn require_column(&self, name: &str) -> Result<Vec<&Cell>> {
        self.column(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    /// Insert or replace a whole column. `values` must have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(Error::invalid_field(
                name,
                format!("expected {} values, got {}", self.rows.len(), values.len()),
            ));
        }

        self.register_column(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Remove a column. Returns `false` if it did not exist.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(pos) = self.columns.iter().position(|c| c == name) else {
            return false;
        };
        self.columns.remove(pos);
        for row in &mut self.rows {
            row.remove(name);
        }
        true
    }

    /// New table holding the rows for which `keep` returns true, in their
    /// original order. Columns are kept as-is; any index is filtered alongside.
    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Row) -> bool,
    {
        let mut rows = Vec::new();
        let mut index = self.index.as_ref().map(|_| Vec::new());

        for (i, row) in self.rows.iter().enumerate() {
            if keep(row) {
                rows.push(row.clone());
                if let (Some(kept), Some(all)) = (index.as_mut(), self.index.as_ref()) {
                    kept.push(all[i]);
                }
            }
        }

        Self {
            columns: self.columns.clone(),
            rows,
            index,
        }
    }

    /// Move a date column into the row index.
    ///
    /// Labels need not be unique: two activities on the same day share a label.
    pub fn set_date_index(&mut self, column: &str) -> Result<()> {
        let dates = self
            .require_column(column)?
            .into_iter()
            .map(|cell| {
                cell.as_date()
                    .ok_or_else(|| Error::invalid_field(column, format!("{cell} is not a date")))
            })
            .collect::<Result<Vec<_>>>()?;

        self.drop_column(column);
        self.index = Some(dates);
        Ok(())
    }

    pub fn index(&self) -> Option<&[NaiveDate]> {
        self.index.as_deref()
    }

    /// Index label of a row, if the table is indexed.
    pub fn label(&self, row: usize) -> Option<NaiveDate> {
        self.index.as_ref().and_then(|idx| idx.get(row).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ActivityTable {
        ActivityTable::from_records(&[
            json!({
                "id": 1,
                "name": "Ride one",
                "type": "Ride",
                "map": { "id": "a1", "summary_polyline": "??", "resource_state": 2 },
                "athlete": { "id": 7 },
                "segment_ids": [1, 2],
            }),
            json!({
                "id": 2,
                "name": "Run",
                "type": "Run",
                "map": { "id": "a2", "summary_polyline": null },
                "trainer": true,
            }),
        ])
        .unwrap()
    }

    #[test]
    fn test_flattens_nested_objects() {
        let table = sample();
        assert_eq!(table.len(), 2);
        assert!(table.has_column("map.id"));
        assert!(table.has_column("map.summary_polyline"));
        assert!(table.has_column("athlete.id"));
        assert!(!table.has_column("map"));
        assert_eq!(table.get(0, "map.id"), &Cell::Text("a1".to_string()));
        assert_eq!(table.get(0, "athlete.id"), &Cell::Number(7.0));
    }

    #[test]
    fn test_arrays_stay_in_one_cell() {
        let table = sample();
        assert_eq!(table.get(0, "segment_ids"), &Cell::Json(json!([1, 2])));
    }

    #[test]
    fn test_missing_cells_read_as_null() {
        let table = sample();
        assert!(table.get(1, "athlete.id").is_null());
        assert!(table.get(0, "trainer").is_null());
        assert!(table.get(1, "map.summary_polyline").is_null());
        assert!(table.get(99, "id").is_null());
    }

    #[test]
    fn test_columns_in_first_seen_order() {
        let table = sample();
        let pos = |name: &str| table.columns().iter().position(|c| c == name).unwrap();
        assert!(pos("map.id") < pos("trainer"));
        assert!(pos("athlete.id") < pos("trainer"));
    }

    #[test]
    fn test_rejects_non_object_record() {
        let err = ActivityTable::from_records(&[json!({"id": 1}), json!(42)]).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn test_drop_column() {
        let mut table = sample();
        assert!(table.drop_column("map.id"));
        assert!(!table.has_column("map.id"));
        assert!(table.get(0, "map.id").is_null());
        assert!(!table.drop_column("map.id"));
    }

    #[test]
    fn test_set_column_length_mismatch() {
        let mut table = sample();
        let err = table.set_column("extra", vec![Cell::Null]).unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
    }

    #[test]
    fn test_filter_keeps_order_and_index() {
        let mut table = ActivityTable::from_records(&[
            json!({"type": "Ride", "n": 1}),
            json!({"type": "Run", "n": 2}),
            json!({"type": "Ride", "n": 3}),
        ])
        .unwrap();
        let d = |day| Cell::Date(NaiveDate::from_ymd_opt(2024, 5, day).unwrap());
        table.set_column("day", vec![d(3), d(2), d(1)]).unwrap();
        table.set_date_index("day").unwrap();

        let rides = table.filter_rows(|row| row.get("type").and_then(Cell::as_str) == Some("Ride"));
        assert_eq!(rides.len(), 2);
        assert_eq!(rides.get(0, "n"), &Cell::Number(1.0));
        assert_eq!(rides.get(1, "n"), &Cell::Number(3.0));
        assert_eq!(rides.label(1), NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn test_date_index_allows_duplicates() {
        let mut table = ActivityTable::from_records(&[json!({"n": 1}), json!({"n": 2})]).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        table.set_column("day", vec![Cell::Date(day), Cell::Date(day)]).unwrap();
        table.set_date_index("day").unwrap();

        assert!(!table.has_column("day"));
        assert_eq!(table.index(), Some(&[day, day][..]));
    }

    #[test]
    fn test_date_index_requires_dates() {
        let mut table = sample();
        let err = table.set_date_index("name").unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
        let err = table.set_date_index("nope").unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));
    }
}
