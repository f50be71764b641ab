//! `rollcall-io` — table loading and report writing.
//!
//! Loads CSV and spreadsheet files into [`RawTable`](rollcall_recon::RawTable)s
//! and writes finished discrepancy reports back out.

pub mod csv;
pub mod error;
pub mod load;
pub mod report;
pub mod xlsx;

pub use error::{LoadError, WriteError};
pub use load::{discover_backend, load, SheetSelector, BACKEND_EXTENSIONS, SUPPORTED_EXTENSIONS};
pub use report::write_report;
