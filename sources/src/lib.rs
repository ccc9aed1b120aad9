//! Source adapters
//!
//! Turns the inputs a user can hand to the dashboard into a
//! [`PendingContactBatch`] that is ready for the enrichment confirmation step.
//!
//! # Available adapters
//!
//! - `FileAdapter`: a spreadsheet (`.csv`, `.xls`, `.xlsx`) picked for upload
//! - `ManualContactAdapter`: contacts typed in (or pasted) one by one
//!
//! CRM imports need the remote API and live with the orchestrator.
//!
//! # Example
//!
//! ```rust,ignore
//! use sources::{ManualContactAdapter, SourceAdapter};
//! use shared_types::ContactDraft;
//!
//! let mut adapter = ManualContactAdapter::new();
//! adapter.add(ContactDraft::new("John", "Doe", "Acme"))?;
//! let batch = adapter.produce(())?;
//! ```

pub mod file_upload;
pub mod manual_entry;

pub use file_upload::{guess_mime_type, FileAdapter};
pub use manual_entry::{CsvImportReport, ManualContactAdapter};

use shared_types::{PendingContactBatch, ValidationError};

/// Common shape of the local adapters
pub trait SourceAdapter {
    type Input;

    fn produce(&self, input: Self::Input) -> Result<PendingContactBatch, ValidationError>;
}
