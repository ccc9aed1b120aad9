//! Request and response bodies of the enrichment API.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::contact::ContactDraft;
use crate::enrichment::EnrichmentConfig;

/// Response of `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UploadResponse {
    pub job_id: String,
    /// Rows the server accepted, when it reports them
    #[serde(default)]
    pub contact_count: Option<u32>,
}

/// Body of `POST /imports/manual`
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ManualImportRequest {
    pub contacts: Vec<ContactDraft>,
    pub config: EnrichmentConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub filename: Option<String>,
}

/// Response of `POST /imports/manual`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ManualImportResponse {
    pub job_id: String,
}

/// Response of `POST /integrations/{provider}/import`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CrmImportResponse {
    pub job_id: String,
    pub imported_count: u32,
}

/// Body of `POST /import/jobs/{job_id}/enrich`
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct EnrichRequest {
    pub config: EnrichmentConfig,
}

/// Response of `GET /credits`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditBalanceResponse {
    pub remaining: i64,
}

/// Body of `POST /integrations/{provider}/export`
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ExportRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExportResponse {
    #[serde(default)]
    pub exported_count: u32,
    #[serde(default)]
    pub message: Option<String>,
}
