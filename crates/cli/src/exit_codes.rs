//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success, no mismatches                               |
//! | 1    | Reconciliation ran and found mismatches              |
//! | 2    | Usage error (bad arguments, conflicting flags)       |
//! | 3    | I/O error (missing file, unreadable sheet, write)    |
//! | 4    | Unsupported file format                              |
//! | 5    | Schema error (identity or name column not found)     |
//! | 6    | Duplicate employee codes under the reject policy     |
//! | 7    | Batch: at least one submission failed                |
//! | 8    | Invalid config file                                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant with the next free number
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed, nothing to report.
pub const EXIT_SUCCESS: u8 = 0;

/// Mismatches found. Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_MISMATCHES: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// File could not be found, read, parsed or written.
pub const EXIT_IO: u8 = 3;

/// Input or report extension not supported.
pub const EXIT_UNSUPPORTED_FORMAT: u8 = 4;

/// Identity column (or display-name column) missing after normalization.
pub const EXIT_SCHEMA: u8 = 5;

/// Duplicate identity values with `on_duplicate = "reject"`.
pub const EXIT_DUPLICATE_KEY: u8 = 6;

/// Batch mode: one or more submissions failed; the rest still ran.
pub const EXIT_BATCH_PARTIAL: u8 = 7;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 8;
