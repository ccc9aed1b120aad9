use async_trait::async_trait;
use shared_types::{
    ConfirmedEnrichment, CrmImportResponse, EnrichmentConfig, EnrichmentJob, ExportResponse,
    ManualImportRequest, ManualImportResponse, Provider, UploadFile, UploadResponse,
};

/// Failure talking to the enrichment API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response came back (connection refused, DNS, timeout, ...)
    #[error("Could not reach the enrichment service: {0}")]
    Transport(String),

    /// The server answered with an error status. `message` is the server's own wording.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response from the enrichment service: {0}")]
    Decode(String),

    #[error("Could not read {path}: {message}")]
    LocalFile { path: String, message: String },
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// Remote endpoints the orchestrator drives. The HTTP implementation lives in
/// [`crate::integrations::http_api`]; tests substitute their own.
#[async_trait]
pub trait EnrichmentApi: Send + Sync {
    /// `POST /upload`
    async fn upload_file(
        &self,
        file: &UploadFile,
        enrichment: &ConfirmedEnrichment,
    ) -> Result<UploadResponse, ApiError>;

    /// `POST /imports/manual`
    async fn import_manual(
        &self,
        request: &ManualImportRequest,
    ) -> Result<ManualImportResponse, ApiError>;

    /// `POST /integrations/{provider}/import`
    async fn import_from_provider(&self, provider: Provider)
        -> Result<CrmImportResponse, ApiError>;

    /// `POST /import/jobs/{job_id}/enrich`
    async fn enrich_imported_job(
        &self,
        job_id: &str,
        config: EnrichmentConfig,
    ) -> Result<(), ApiError>;

    /// `GET /credits`
    async fn credit_balance(&self) -> Result<i64, ApiError>;

    /// `GET /jobs`
    async fn list_jobs(&self, limit: u32) -> Result<Vec<EnrichmentJob>, ApiError>;

    /// `POST /integrations/{provider}/export`
    async fn export_job(&self, provider: Provider, job_id: &str)
        -> Result<ExportResponse, ApiError>;
}
