//! DataFusion session plumbing.
//!
//! The checker is synchronous, while DataFusion is async. Every query runs on a
//! private current-thread Tokio runtime hosted by a scoped worker thread, so the
//! helpers here can be called both from plain code and from inside an existing
//! Tokio runtime without nesting `block_on` calls.

use crate::EngineError;
use crate::convert::{batches_to_dataset, to_record_batch};
use aqualisys_core::{DataFormat, DataSet};
use arrow_array::{Array, Int64Array};
use datafusion::datasource::MemTable;
use datafusion::prelude::{CsvReadOptions, NdJsonReadOptions, ParquetReadOptions, SessionContext};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Table name under which a dataset is registered for expression queries.
pub const DATASET_TABLE: &str = "dataset";

/// Runs a future to completion on a private runtime.
pub(crate) fn block_on<F, T>(future: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>> + Send,
    T: Send,
{
    std::thread::scope(|scope| {
        scope
            .spawn(|| {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(future)
            })
            .join()
            .map_err(|_| EngineError::runtime("query worker thread panicked"))?
    })
}

/// Creates a session with `dataset` registered as [`DATASET_TABLE`].
pub(crate) fn session_with_dataset(dataset: &DataSet) -> Result<SessionContext, EngineError> {
    let batch = to_record_batch(dataset)?;
    let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;

    let ctx = SessionContext::new();
    ctx.register_table(DATASET_TABLE, Arc::new(table))?;
    Ok(ctx)
}

/// Runs a single-row query whose columns are all `COUNT` aggregates.
pub(crate) async fn query_counts(ctx: &SessionContext, sql: &str) -> Result<Vec<i64>, EngineError> {
    debug!(sql, "Running count query");
    let batches = ctx.sql(sql).await?.collect().await?;

    let batch = batches
        .iter()
        .find(|b| b.num_rows() > 0)
        .ok_or_else(|| EngineError::unexpected("count query returned no rows"))?;

    batch
        .columns()
        .iter()
        .map(|column| {
            column
                .as_any()
                .downcast_ref::<Int64Array>()
                .map(|counts| counts.value(0))
                .ok_or_else(|| {
                    EngineError::unexpected(format!(
                        "expected Int64 counter, got {}",
                        column.data_type()
                    ))
                })
        })
        .collect()
}

/// Reads a data file into a dataset.
///
/// CSV files must have a header row; JSON files are newline-delimited.
pub async fn read_dataset(path: &Path, format: DataFormat) -> Result<DataSet, EngineError> {
    if !path.exists() {
        return Err(EngineError::Load {
            path: path.display().to_string(),
            message: "file does not exist".to_string(),
        });
    }

    let location = path.to_string_lossy().to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let ctx = SessionContext::new();
    let frame = match format {
        DataFormat::Csv => {
            ctx.read_csv(
                location,
                CsvReadOptions::new().has_header(true).file_extension(&extension),
            )
            .await?
        }
        DataFormat::Parquet => {
            ctx.read_parquet(
                location,
                ParquetReadOptions {
                    file_extension: &extension,
                    ..Default::default()
                },
            )
            .await?
        }
        DataFormat::Json => {
            ctx.read_json(
                location,
                NdJsonReadOptions {
                    file_extension: &extension,
                    ..Default::default()
                },
            )
            .await?
        }
    };

    let schema = frame.schema().as_arrow().clone();
    let batches = frame.collect().await?;
    let dataset = batches_to_dataset(&schema, &batches)?;

    debug!(
        path = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Blocking variant of [`read_dataset`].
pub fn load_dataset(path: &Path, format: DataFormat) -> Result<DataSet, EngineError> {
    block_on(read_dataset(path, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqualisys_core::DataValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_count_query_against_dataset() {
        let dataset = DataSet::from_columns([("amount", vec![Some(5_i64), Some(-1), None])]);

        let counts = block_on(async {
            let ctx = session_with_dataset(&dataset)?;
            query_counts(
                &ctx,
                "SELECT COUNT(*) AS total, COUNT(CASE WHEN amount >= 0 THEN 1 END) AS ok FROM dataset",
            )
            .await
        })
        .unwrap();

        assert_eq!(counts, vec![3, 1]);
    }

    #[test]
    fn test_block_on_inside_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let value = runtime.block_on(async { block_on(async { Ok(7) }) }).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_load_csv_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, "order_id,status\n1,pending\n2,shipped\n").unwrap();

        let dataset = load_dataset(&path, DataFormat::Csv).unwrap();

        assert_eq!(dataset.columns(), &["order_id".to_string(), "status".to_string()]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get_row(0).unwrap()["order_id"], DataValue::Int(1));
        assert_eq!(
            dataset.get_row(1).unwrap()["status"],
            DataValue::String("shipped".to_string())
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_dataset(Path::new("/no/such/orders.csv"), DataFormat::Csv).unwrap_err();
        assert!(matches!(err, EngineError::Load { .. }));
    }
}
