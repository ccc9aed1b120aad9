use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Contact fields that must be filled in before a contact can be enriched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    FirstName,
    LastName,
    Company,
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactField::FirstName => write!(f, "first name"),
            ContactField::LastName => write!(f, "last name"),
            ContactField::Company => write!(f, "company"),
        }
    }
}

/// Locally recoverable input errors. These are shown inline and never sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unsupported file type for {filename}: only .csv, .xls and .xlsx files can be imported")]
    UnsupportedFileType { filename: String },

    #[error("Unsupported content type {mime}: expected a CSV or Excel spreadsheet")]
    UnsupportedMimeType { mime: String },

    #[error("File is too large ({size} bytes): the maximum upload size is {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File is empty")]
    EmptyFile,

    #[error("File could not be read: {0}")]
    Unreadable(String),

    #[error("The {0} is required")]
    MissingField(ContactField),

    #[error("No contacts to enrich")]
    EmptyBatch,

    #[error("Select at least one of email or phone enrichment")]
    NoEnrichmentField,

    #[error("Invalid output filename: {0}")]
    InvalidFilename(String),

    #[error("Row {row}: {message}")]
    Csv { row: usize, message: String },
}
