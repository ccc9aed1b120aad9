use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub mod api;
pub mod batch;
pub mod contact;
pub mod credits;
pub mod enrichment;
pub mod integration;
pub mod job;
pub mod validation;

pub use api::{
    CreditBalanceResponse, CrmImportResponse, EnrichRequest, ExportRequest, ExportResponse,
    ManualImportRequest, ManualImportResponse, UploadResponse,
};
pub use batch::{BatchPayload, PendingContactBatch, SourceKind, UploadFile};
pub use contact::ContactDraft;
pub use credits::{CreditLedgerState, LedgerEvent};
pub use enrichment::{ConfirmationRequest, ConfirmedEnrichment, EnrichmentChoice, EnrichmentConfig};
pub use integration::Provider;
pub use job::{EnrichmentJob, JobHandle, JobStatus, JobsResponse};
pub use validation::{ContactField, ValidationError};

/// Maximum size of a spreadsheet accepted by the upload endpoint (50 MB)
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Error body returned by the API. Servers are not consistent about the key,
/// so every known spelling is accepted.
#[derive(Debug, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn into_message(self) -> Option<String> {
        [self.error, self.message, self.detail]
            .into_iter()
            .flatten()
            .map(|m| m.trim().to_string())
            .find(|m| !m.is_empty())
    }
}
