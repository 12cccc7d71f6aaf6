//! Import and export service implementations.
//!
//! Orchestrates transfer encoding, validation, and store writes.

pub mod export;
pub mod import;

pub use export::{DEFAULT_EXPORT_SOURCE, ExportResult, ExportService};
pub use import::{ImportOptions, ImportResult, ImportService};
