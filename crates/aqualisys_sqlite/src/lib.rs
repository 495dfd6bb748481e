//! # Aqualisys SQLite
//!
//! SQLite backend for the run logger contract. Each checker run becomes one
//! row in `runs` and one row per rule in `rule_results`.
//!
//! - WAL journal and a busy timeout for concurrent readers
//! - Re-recording a run id replaces its rows
//! - Additive migrations for databases written by older versions
//!
//! ## Example
//!
//! ```rust,no_run
//! use aqualisys_sqlite::SqliteRunLogger;
//!
//! let logger = SqliteRunLogger::open("aqualisys_runs.db").unwrap();
//! for run in logger.recent_runs(Some("orders"), 10).unwrap() {
//!     println!("{} passed={}", run.run_id, run.passed);
//! }
//! ```

mod error;
mod logger;
mod schema;

pub use error::{Result, SqliteLoggerError};
pub use logger::SqliteRunLogger;
