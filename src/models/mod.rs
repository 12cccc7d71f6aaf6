//! Data models for promptshelf.
//!
//! This module contains the prompt, partial and transfer structures plus the
//! template syntax extraction they are derived with.

mod partial;
mod prompt;
mod template;
mod transfer;

pub use partial::Partial;
pub use prompt::Prompt;
pub use template::{
    ParsedTemplate, PartialPicker, PartialReference, contains_partial_reference,
    extract_parameters, parse_template, scan_references, substitute_parameters,
};
pub use transfer::{TRANSFER_VERSION, TransferItem, TransferPayload};
