//! Type conversion between datasets and Arrow record batches.
//!
//! - [`to_record_batch`] turns an in-memory [`DataSet`] into a single batch so
//!   DataFusion can query it
//! - [`batches_to_dataset`] goes the other way for files read by DataFusion

use crate::EngineError;
use aqualisys_core::{DataRow, DataSet, DataValue};
use arrow_array::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float32Array, Float64Array, Int8Array,
    Int16Array, Int32Array, Int64Array, LargeStringArray, NullArray, StringArray,
    StringViewArray, TimestampMicrosecondArray, TimestampMillisecondArray,
    TimestampNanosecondArray, TimestampSecondArray, UInt8Array, UInt16Array, UInt32Array,
    UInt64Array,
};
use arrow_array::{RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use datafusion::arrow::util::display::{ArrayFormatter, FormatOptions};
use std::sync::Arc;

/// Arrow type chosen for one dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Null,
    Int,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Null => DataType::Null,
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Bool => DataType::Boolean,
            ColumnKind::Text => DataType::Utf8,
        }
    }

    /// Widens the kind so that it can also hold `value`.
    fn widen(self, value: &DataValue) -> Self {
        let incoming = match value {
            DataValue::Null => return self,
            DataValue::Int(_) => ColumnKind::Int,
            DataValue::Float(_) => ColumnKind::Float,
            DataValue::Bool(_) => ColumnKind::Bool,
            DataValue::String(_)
            | DataValue::Timestamp(_)
            | DataValue::Map(_)
            | DataValue::List(_) => ColumnKind::Text,
        };

        match (self, incoming) {
            (ColumnKind::Null, kind) => kind,
            (a, b) if a == b => a,
            (ColumnKind::Int, ColumnKind::Float) | (ColumnKind::Float, ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => ColumnKind::Text,
        }
    }
}

/// Converts a dataset into one Arrow record batch.
///
/// Each column gets the narrowest Arrow type holding all of its values:
/// integers become `Int64`, integers mixed with floats become `Float64`,
/// booleans become `Boolean` and everything else is rendered as `Utf8`.
/// A column with no non-null value becomes a `Null` column.
pub fn to_record_batch(dataset: &DataSet) -> Result<RecordBatch, EngineError> {
    let mut fields = Vec::with_capacity(dataset.columns().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(dataset.columns().len());

    for name in dataset.columns() {
        let values: Vec<&DataValue> = match dataset.column(name) {
            Some(values) => values.collect(),
            None => continue,
        };
        let kind = values
            .iter()
            .fold(ColumnKind::Null, |kind, value| kind.widen(value));

        fields.push(Field::new(name, kind.data_type(), true));
        arrays.push(build_array(kind, &values));
    }

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(dataset.len()));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

fn build_array(kind: ColumnKind, values: &[&DataValue]) -> ArrayRef {
    match kind {
        ColumnKind::Null => Arc::new(NullArray::new(values.len())),
        ColumnKind::Int => Arc::new(Int64Array::from(
            values.iter().map(|v| v.as_int()).collect::<Vec<_>>(),
        )),
        ColumnKind::Float => Arc::new(Float64Array::from(
            values
                .iter()
                .map(|v| match v {
                    DataValue::Int(i) => Some(*i as f64),
                    other => other.as_float(),
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Bool => Arc::new(BooleanArray::from(
            values.iter().map(|v| v.as_bool()).collect::<Vec<_>>(),
        )),
        ColumnKind::Text => Arc::new(StringArray::from(
            values
                .iter()
                .map(|v| match v {
                    DataValue::Null => None,
                    DataValue::Map(_) | DataValue::List(_) => Some(v.to_json().to_string()),
                    other => Some(other.to_string()),
                })
                .collect::<Vec<Option<String>>>(),
        )),
    }
}

/// Converts record batches read by DataFusion into a dataset.
///
/// Column order follows the batch schema.
pub fn batches_to_dataset(schema: &Schema, batches: &[RecordBatch]) -> Result<DataSet, EngineError> {
    let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let mut dataset = DataSet::empty().with_columns(names.iter().cloned());

    for batch in batches {
        for row_idx in 0..batch.num_rows() {
            let mut row = DataRow::with_capacity(names.len());
            for (name, column) in names.iter().zip(batch.columns()) {
                row.insert(name.clone(), arrow_value_to_data_value(column, row_idx)?);
            }
            dataset.add_row(row);
        }
    }

    Ok(dataset)
}

/// Converts one Arrow value to a [`DataValue`].
///
/// Decimals become floats. Other types without a direct counterpart (dates
/// with millisecond precision, times, binary, nested and dictionary columns)
/// are rendered as text with Arrow's display formatter, so they keep their
/// presence and identity for rule evaluation.
pub fn arrow_value_to_data_value(value: &ArrayRef, row_idx: usize) -> Result<DataValue, EngineError> {
    if value.is_null(row_idx) {
        return Ok(DataValue::Null);
    }

    macro_rules! downcast {
        ($array_type:ty) => {
            value.as_any().downcast_ref::<$array_type>().ok_or_else(|| {
                EngineError::conversion(format!(
                    "Failed to downcast to {}",
                    stringify!($array_type)
                ))
            })?
        };
    }

    let converted = match value.data_type() {
        DataType::Boolean => DataValue::Bool(downcast!(BooleanArray).value(row_idx)),
        DataType::Int8 => DataValue::Int(downcast!(Int8Array).value(row_idx) as i64),
        DataType::Int16 => DataValue::Int(downcast!(Int16Array).value(row_idx) as i64),
        DataType::Int32 => DataValue::Int(downcast!(Int32Array).value(row_idx) as i64),
        DataType::Int64 => DataValue::Int(downcast!(Int64Array).value(row_idx)),
        DataType::UInt8 => DataValue::Int(downcast!(UInt8Array).value(row_idx) as i64),
        DataType::UInt16 => DataValue::Int(downcast!(UInt16Array).value(row_idx) as i64),
        DataType::UInt32 => DataValue::Int(downcast!(UInt32Array).value(row_idx) as i64),
        DataType::UInt64 => {
            let raw = downcast!(UInt64Array).value(row_idx);
            match i64::try_from(raw) {
                Ok(v) => DataValue::Int(v),
                Err(_) => DataValue::Float(raw as f64),
            }
        }
        DataType::Float32 => DataValue::Float(downcast!(Float32Array).value(row_idx) as f64),
        DataType::Float64 => DataValue::Float(downcast!(Float64Array).value(row_idx)),
        DataType::Utf8 => DataValue::String(downcast!(StringArray).value(row_idx).to_string()),
        DataType::LargeUtf8 => {
            DataValue::String(downcast!(LargeStringArray).value(row_idx).to_string())
        }
        DataType::Utf8View => {
            DataValue::String(downcast!(StringViewArray).value(row_idx).to_string())
        }
        DataType::Date32 => {
            let days = downcast!(Date32Array).value(row_idx);
            let date = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
                .ok_or_else(|| EngineError::conversion("Invalid date value"))?;
            DataValue::Timestamp(date.format("%Y-%m-%d").to_string())
        }
        DataType::Timestamp(unit, _) => {
            let datetime = match unit {
                TimeUnit::Second => {
                    chrono::DateTime::from_timestamp(downcast!(TimestampSecondArray).value(row_idx), 0)
                }
                TimeUnit::Millisecond => chrono::DateTime::from_timestamp_millis(
                    downcast!(TimestampMillisecondArray).value(row_idx),
                ),
                TimeUnit::Microsecond => chrono::DateTime::from_timestamp_micros(
                    downcast!(TimestampMicrosecondArray).value(row_idx),
                ),
                TimeUnit::Nanosecond => Some(chrono::DateTime::from_timestamp_nanos(
                    downcast!(TimestampNanosecondArray).value(row_idx),
                )),
            }
            .ok_or_else(|| EngineError::conversion("Invalid timestamp value"))?;
            DataValue::Timestamp(datetime.to_rfc3339())
        }
        DataType::Decimal128(..) | DataType::Decimal256(..) => {
            let text = display_value(value, row_idx)?;
            text.parse::<f64>()
                .map(DataValue::Float)
                .map_err(|e| EngineError::conversion(format!("Invalid decimal '{}': {}", text, e)))?
        }
        DataType::Date64 => DataValue::Timestamp(display_value(value, row_idx)?),
        _ => DataValue::String(display_value(value, row_idx)?),
    };

    Ok(converted)
}

/// Renders one value with Arrow's display formatter.
fn display_value(value: &ArrayRef, row_idx: usize) -> Result<String, EngineError> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(value.as_ref(), &options)?;
    Ok(formatter.value(row_idx).to_string())
}
