//! `rollcall-recon` — attendance reconciliation engine.
//!
//! Pure engine crate: receives loaded tables, returns a discrepancy report.
//! No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod model;
pub mod normalize;
pub mod report;

pub use config::ReconConfig;
pub use engine::{reconcile, run, RunOptions, RunOutcome};
pub use error::ReconError;
pub use index::{index, DuplicatePolicy};
pub use model::{CellValue, ColumnLabel, ComparisonRecord, IndexedTable, NormalizedTable, RawTable, Side};
pub use normalize::{normalize, NormalizeOptions, NormalizeWarning};
pub use report::{assemble_report, DiscrepancyReport};
