//! Import/Export I/O subsystem.
//!
//! Shares a single prompt, together with the partials it references, as one
//! copy-pasteable transfer string.
//!
//! # Architecture
//!
//! - **Transfer codec** turns a [`TransferPayload`](crate::models::TransferPayload)
//!   into `PROMPTSHELF1:<base64(zlib(json))>` and back
//! - **Validation layer** rejects unsafe relative paths and maps items onto
//!   store coordinates
//! - **Services** collect dependencies on export and write through the
//!   stores on import
//!
//! # Examples
//!
//! ```rust,no_run
//! use promptshelf::io::{ExportService, ImportOptions, ImportService};
//! use promptshelf::Workspace;
//! use std::path::Path;
//!
//! let source = Workspace::open("/home/me/shelf")?;
//! let exported = ExportService::new(&source)
//!     .export_prompt(Path::new("/home/me/shelf/prompts/mail/Reply.md"))?;
//!
//! let mut target = Workspace::open("/home/me/other-shelf")?;
//! let result = ImportService::new(&mut target)
//!     .import_str(&exported.transfer, ImportOptions::default())?;
//! println!("Imported {} files", result.imported.len());
//! # Ok::<(), promptshelf::Error>(())
//! ```

pub mod services;
pub mod transfer;
pub mod validation;

// Re-exports for convenience
pub use services::export::{DEFAULT_EXPORT_SOURCE, ExportResult, ExportService};
pub use services::import::{ImportOptions, ImportResult, ImportService};
pub use transfer::{TRANSFER_PREFIX, decode, encode};
pub use validation::{ImportTarget, import_target, validate_relative_path};
