//! Dataset representation for validation.
//!
//! This module provides the in-memory table that rules are evaluated against.
//! A dataset is a list of rows plus an ordered column list; a column that a row
//! does not mention reads as null for that row.

use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A value in a dataset.
///
/// Represents different types of values that can appear in data records.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Null/missing value
    Null,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Timestamp value (ISO 8601 string)
    Timestamp(String),
    /// Map/struct value
    Map(HashMap<String, DataValue>),
    /// List/array value
    List(Vec<DataValue>),
}

static NULL: DataValue = DataValue::Null;

impl DataValue {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            DataValue::Null => "null",
            DataValue::String(_) => "string",
            DataValue::Int(_) => "int64",
            DataValue::Float(_) => "float64",
            DataValue::Bool(_) => "boolean",
            DataValue::Timestamp(_) => "timestamp",
            DataValue::Map(_) => "map",
            DataValue::List(_) => "list",
        }
    }

    /// Attempts to get this value as a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get this value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to get this value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DataValue::Float(f) => Some(*f),
            DataValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns a hashable comparison key, or `None` for nulls.
    ///
    /// Integral floats share the key of the equal integer so that `1` and `1.0`
    /// compare equal, matching how a columnar engine compares numeric values.
    pub fn key(&self) -> Option<ValueKey> {
        let key = match self {
            DataValue::Null => return None,
            DataValue::String(s) | DataValue::Timestamp(s) => ValueKey::Text(s.clone()),
            DataValue::Int(i) => ValueKey::Int(*i),
            DataValue::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    ValueKey::Int(*f as i64)
                } else {
                    ValueKey::Float(f.to_bits())
                }
            }
            DataValue::Bool(b) => ValueKey::Bool(*b),
            DataValue::Map(_) | DataValue::List(_) => ValueKey::Nested(self.to_json().to_string()),
        };
        Some(key)
    }

    /// Converts this value to JSON.
    ///
    /// Map keys come out sorted, so the rendering is stable.
    pub fn to_json(&self) -> JsonValue {
        match self {
            DataValue::Null => JsonValue::Null,
            DataValue::String(s) | DataValue::Timestamp(s) => JsonValue::String(s.clone()),
            DataValue::Int(i) => JsonValue::from(*i),
            DataValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DataValue::Bool(b) => JsonValue::Bool(*b),
            DataValue::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<BTreeMap<_, _>>()
                    .into_iter()
                    .collect(),
            ),
            DataValue::List(items) => JsonValue::Array(items.iter().map(|v| v.to_json()).collect()),
        }
    }

    /// Builds a value from JSON, as found in declarative rule parameters.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => DataValue::Null,
            JsonValue::Bool(b) => DataValue::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => DataValue::Int(i),
                None => DataValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => DataValue::String(s.clone()),
            JsonValue::Array(items) => DataValue::List(items.iter().map(Self::from_json).collect()),
            JsonValue::Object(map) => DataValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "null"),
            DataValue::String(s) | DataValue::Timestamp(s) => write!(f, "{}", s),
            DataValue::Int(i) => write!(f, "{}", i),
            DataValue::Float(v) => write!(f, "{}", v),
            DataValue::Bool(b) => write!(f, "{}", b),
            DataValue::Map(_) | DataValue::List(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::String(s)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::String(s.to_string())
    }
}

impl From<i64> for DataValue {
    fn from(i: i64) -> Self {
        DataValue::Int(i)
    }
}

impl From<f64> for DataValue {
    fn from(f: f64) -> Self {
        DataValue::Float(f)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Bool(b)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DataValue::Null, Into::into)
    }
}

/// Hashable, ordered identity of a non-null [`DataValue`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    /// Boolean
    Bool(bool),
    /// Integer, or integral float
    Int(i64),
    /// Non-integral float, by bit pattern
    Float(u64),
    /// String or timestamp text
    Text(String),
    /// Map or list, by canonical JSON rendering
    Nested(String),
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKey::Bool(b) => write!(f, "{}", b),
            ValueKey::Int(i) => write!(f, "{}", i),
            ValueKey::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            ValueKey::Text(s) | ValueKey::Nested(s) => write!(f, "{}", s),
        }
    }
}

/// A single row of data.
pub type DataRow = HashMap<String, DataValue>;

/// A dataset containing multiple rows.
///
/// Column order is the order in which columns were declared or first seen.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    columns: Vec<String>,
    rows: Vec<DataRow>,
}

impl DataSet {
    /// Creates a new empty dataset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a new dataset from rows.
    ///
    /// Columns are collected from the rows. Keys within one row have no
    /// inherent order, so columns first seen in the same row are sorted.
    pub fn from_rows(rows: Vec<DataRow>) -> Self {
        let mut dataset = Self {
            columns: Vec::new(),
            rows: Vec::new(),
        };
        for row in rows {
            dataset.add_row(row);
        }
        dataset
    }

    /// Creates a dataset from column vectors.
    ///
    /// Columns shorter than the longest one are padded with nulls.
    pub fn from_columns<I, S, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<V>)>,
        S: Into<String>,
        V: Into<DataValue>,
    {
        let mut names = Vec::new();
        let mut data: Vec<Vec<DataValue>> = Vec::new();
        for (name, values) in columns {
            names.push(name.into());
            data.push(values.into_iter().map(Into::into).collect());
        }

        let height = data.iter().map(Vec::len).max().unwrap_or(0);
        let mut rows = vec![DataRow::new(); height];
        for (name, values) in names.iter().zip(data) {
            for (row, value) in rows.iter_mut().zip(values) {
                row.insert(name.clone(), value);
            }
        }

        Self {
            columns: names,
            rows,
        }
    }

    /// Declares columns that exist even if no row mentions them.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        self
    }

    /// Returns the number of rows in the dataset.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if the dataset has the column.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Returns an iterator over the rows.
    pub fn rows(&self) -> impl Iterator<Item = &DataRow> {
        self.rows.iter()
    }

    /// Gets a specific row by index.
    pub fn get_row(&self, index: usize) -> Option<&DataRow> {
        self.rows.get(index)
    }

    /// Returns the values of one column, or `None` if the column is unknown.
    ///
    /// Rows without the key yield [`DataValue::Null`].
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &DataValue>> {
        if !self.has_column(name) {
            return None;
        }
        let name = name.to_string();
        Some(self.rows.iter().map(move |row| row.get(&name).unwrap_or(&NULL)))
    }

    /// Adds a row to the dataset.
    pub fn add_row(&mut self, row: DataRow) {
        let mut new_columns: Vec<&String> = row
            .keys()
            .filter(|key| !self.columns.contains(key))
            .collect();
        new_columns.sort();
        let new_columns: Vec<String> = new_columns.into_iter().cloned().collect();
        self.columns.extend(new_columns);
        self.rows.push(row);
    }
}

impl FromIterator<DataRow> for DataSet {
    fn from_iter<T: IntoIterator<Item = DataRow>>(iter: T) -> Self {
        Self::from_rows(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_data_value_types() {
        assert_eq!(DataValue::Null.type_name(), "null");
        assert_eq!(DataValue::String("test".into()).type_name(), "string");
        assert_eq!(DataValue::Int(42).type_name(), "int64");
        assert_eq!(DataValue::Float(3.5).type_name(), "float64");
        assert_eq!(DataValue::Bool(true).type_name(), "boolean");
    }

    #[test]
    fn test_data_value_conversions() {
        let val = DataValue::String("hello".into());
        assert_eq!(val.as_string(), Some("hello"));
        assert_eq!(val.as_int(), None);

        let val = DataValue::Int(42);
        assert_eq!(val.as_int(), Some(42));
        assert_eq!(val.as_float(), Some(42.0));
        assert_eq!(val.as_string(), None);

        assert_eq!(DataValue::from(None::<i64>), DataValue::Null);
        assert_eq!(DataValue::from(Some(3_i64)), DataValue::Int(3));
    }

    #[test]
    fn test_numeric_keys_compare_by_value() {
        assert_eq!(DataValue::Int(1).key(), DataValue::Float(1.0).key());
        assert_ne!(DataValue::Int(1).key(), DataValue::Float(1.5).key());
        assert_ne!(DataValue::Int(1).key(), DataValue::String("1".into()).key());
        assert_eq!(DataValue::Null.key(), None);
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!(["pending", 3, 2.5, true, null]);
        let value = DataValue::from_json(&json);
        assert_eq!(
            value,
            DataValue::List(vec![
                DataValue::String("pending".into()),
                DataValue::Int(3),
                DataValue::Float(2.5),
                DataValue::Bool(true),
                DataValue::Null,
            ])
        );
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_dataset_operations() {
        let mut dataset = DataSet::empty();
        assert_eq!(dataset.len(), 0);
        assert!(dataset.is_empty());

        let mut row = HashMap::new();
        row.insert("id".to_string(), DataValue::Int(1));
        dataset.add_row(row);

        assert_eq!(dataset.len(), 1);
        assert!(!dataset.is_empty());
        assert!(dataset.has_column("id"));

        let row = dataset.get_row(0).unwrap();
        assert_eq!(row.get("id"), Some(&DataValue::Int(1)));
    }

    #[test]
    fn test_from_columns_keeps_order_and_pads() {
        let dataset = DataSet::from_columns([
            ("order_id", vec![Some(1_i64), None, Some(3)]),
            ("amount", vec![Some(10_i64)]),
        ]);

        assert_eq!(dataset.columns(), ["order_id", "amount"]);
        assert_eq!(dataset.len(), 3);

        let amounts: Vec<_> = dataset.column("amount").unwrap().cloned().collect();
        assert_eq!(
            amounts,
            vec![DataValue::Int(10), DataValue::Null, DataValue::Null]
        );
        assert!(dataset.column("missing").is_none());
    }

    #[test]
    fn test_declared_columns_on_empty_dataset() {
        let dataset = DataSet::empty().with_columns(["id", "status"]);
        assert!(dataset.is_empty());
        assert!(dataset.has_column("status"));
        assert_eq!(dataset.column("id").unwrap().count(), 0);
    }
}
