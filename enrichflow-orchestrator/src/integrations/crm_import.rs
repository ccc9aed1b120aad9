use shared_types::{PendingContactBatch, Provider, ValidationError};
use std::sync::Arc;

use super::enrichment_api::{ApiError, EnrichmentApi};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrmImportError {
    /// The provider cannot be imported from. Raised before any request is made.
    #[error("{0}")]
    UnsupportedOperation(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Pulls a provider's contact list into a new server-side job.
///
/// Unlike the local adapters the contacts never reach the client: the batch
/// only carries the job id the server created for them.
pub struct CrmImportAdapter {
    api: Arc<dyn EnrichmentApi>,
}

impl CrmImportAdapter {
    pub fn new(api: Arc<dyn EnrichmentApi>) -> Self {
        Self { api }
    }

    pub async fn produce(&self, provider: Provider) -> Result<PendingContactBatch, CrmImportError> {
        if let Some(reason) = provider.import_unsupported_reason() {
            return Err(CrmImportError::UnsupportedOperation(reason));
        }

        tracing::info!("Importing contacts from {}", provider);

        let response = self.api.import_from_provider(provider).await?;

        if response.imported_count == 0 {
            tracing::info!(
                "{} import {} returned no contacts",
                provider,
                response.job_id
            );
            return Err(ValidationError::EmptyBatch.into());
        }

        tracing::info!(
            "Imported {} contacts from {} into job {}",
            response.imported_count,
            provider,
            response.job_id
        );

        Ok(PendingContactBatch::crm_import(
            Some(provider),
            response.job_id,
            response.imported_count,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use shared_types::{CrmImportResponse, SourceKind};

    #[tokio::test]
    async fn test_zapier_rejected_without_network_call() {
        let api = Arc::new(FakeApi::new());
        let adapter = CrmImportAdapter::new(api.clone());

        let result = adapter.produce(Provider::Zapier).await;

        match result {
            Err(CrmImportError::UnsupportedOperation(message)) => {
                assert!(message.contains("export-only"))
            }
            other => panic!("Expected UnsupportedOperation, got {:?}", other),
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_hubspot_import_wraps_remote_job() {
        let api = Arc::new(FakeApi::new());
        api.set_crm_import(Ok(CrmImportResponse {
            job_id: "job-42".to_string(),
            imported_count: 10,
        }));
        let adapter = CrmImportAdapter::new(api.clone());

        let batch = adapter.produce(Provider::HubSpot).await.unwrap();

        assert_eq!(batch.source_kind(), SourceKind::CrmImport);
        assert_eq!(batch.remote_job_id(), Some("job-42"));
        assert!(batch.contacts().is_none());
        assert_eq!(api.calls(), vec!["import_from_provider:hubspot".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_import_is_validation_error() {
        let api = Arc::new(FakeApi::new());
        api.set_crm_import(Ok(CrmImportResponse {
            job_id: "job-0".to_string(),
            imported_count: 0,
        }));
        let adapter = CrmImportAdapter::new(api);

        assert_eq!(
            adapter.produce(Provider::Lemlist).await,
            Err(CrmImportError::Validation(ValidationError::EmptyBatch))
        );
    }

    #[tokio::test]
    async fn test_server_error_propagates() {
        let api = Arc::new(FakeApi::new());
        api.set_crm_import(Err(ApiError::Rejected {
            status: 401,
            message: "Lemlist is not connected".to_string(),
        }));
        let adapter = CrmImportAdapter::new(api);

        let err = adapter.produce(Provider::Lemlist).await.unwrap_err();
        assert_eq!(err.to_string(), "Lemlist is not connected");
    }
}
