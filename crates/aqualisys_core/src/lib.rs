//! # Aqualisys Core
//!
//! Core data structures and contracts for the Aqualisys data-quality engine.
//!
//! This crate defines the pieces every other crate agrees on: the in-memory
//! dataset rules read, the [`Rule`] contract, the run [`Report`], the run-time
//! selectors in [`RunOptions`], the [`RunLogger`] persistence contract and the
//! declarative suite model the parser produces.
//!
//! ## Key Concepts
//!
//! - **Rule**: one declarative check producing a single outcome per evaluation
//! - **Severity**: whether a failing rule fails the run (`error`) or is only recorded (`warn`)
//! - **Tag**: label used to include or exclude rules at run time
//! - **Run**: one checker invocation against one dataset, identified by a run id
//!
//! ## Example
//!
//! ```rust
//! use aqualisys_core::{DataSet, RuleMeta, RunOptions, Severity};
//!
//! let dataset = DataSet::from_columns([("order_id", vec![Some(1_i64), None, Some(3)])]);
//! assert_eq!(dataset.len(), 3);
//!
//! let meta = RuleMeta::new("NotNullRule", ["order_id"]).with_tags(["integrity"]);
//! let options = RunOptions::new().with_include_tags(["integrity"]);
//! assert!(options.selects(meta.tags()));
//! assert_eq!(meta.severity(), Severity::Error);
//! ```

pub mod builder;
pub mod dataset;
pub mod error;
pub mod logger;
pub mod options;
pub mod report;
pub mod rule;
pub mod suite;

pub use builder::*;
pub use dataset::*;
pub use error::*;
pub use logger::*;
pub use options::*;
pub use report::*;
pub use rule::*;
pub use suite::*;
