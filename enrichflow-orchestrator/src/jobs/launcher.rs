use chrono::Utc;
use shared_types::{
    BatchPayload, ConfirmedEnrichment, JobHandle, ManualImportRequest, PendingContactBatch,
    Provider, SourceKind,
};
use std::sync::Arc;
use std::time::Duration;

use crate::helpers::credit_ledger::{CreditCosts, CreditLedger};
use crate::integrations::{ApiError, EnrichmentApi};

/// Fallback message when no response came back at all
const TRANSPORT_FAILURE_MESSAGE: &str =
    "Could not reach the enrichment service. Check your connection and try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    #[error("{}", TRANSPORT_FAILURE_MESSAGE)]
    TransportFailure { detail: String },

    /// Server refused the launch; `message` is shown as the server wrote it.
    #[error("{message}")]
    ServerRejected { status: Option<u16>, message: String },

    #[error("{message}")]
    FileUnavailable { message: String },

    /// The CRM import went through but the enrich call did not.
    #[error(
        "{imported_count} contacts were imported from {} but not yet enriched ({reason}). \
         They are kept in job {job_id} and can be enriched later.",
        .provider.map(|p| p.display_name()).unwrap_or("your CRM")
    )]
    PartialImport {
        job_id: String,
        provider: Option<Provider>,
        imported_count: u32,
        reason: String,
    },
}

impl LaunchError {
    fn user_reason(&self) -> String {
        match self {
            LaunchError::TransportFailure { .. } => "the enrichment service could not be reached".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ApiError> for LaunchError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Transport(detail) => LaunchError::TransportFailure { detail },
            ApiError::Rejected { status, message } => LaunchError::ServerRejected {
                status: Some(status),
                message,
            },
            ApiError::Decode(detail) => LaunchError::ServerRejected {
                status: None,
                message: format!("Unexpected response from the enrichment service: {}", detail),
            },
            ApiError::LocalFile { path, message } => LaunchError::FileUnavailable {
                message: format!("Could not read {}: {}", path, message),
            },
        }
    }
}

/// Turns a confirmed batch into a server-side enrichment job.
///
/// The request sent depends on where the batch came from: uploads and manual
/// lists create the job in one call, CRM imports already have a job and only
/// need the enrich call. The credit ledger is debited only after the server
/// accepted the launch.
pub struct JobLauncher {
    api: Arc<dyn EnrichmentApi>,
    ledger: Arc<CreditLedger>,
    costs: CreditCosts,
    resync_delay: Duration,
}

impl JobLauncher {
    pub fn new(
        api: Arc<dyn EnrichmentApi>,
        ledger: Arc<CreditLedger>,
        costs: CreditCosts,
        resync_delay: Duration,
    ) -> Self {
        Self {
            api,
            ledger,
            costs,
            resync_delay,
        }
    }

    pub fn ledger(&self) -> &Arc<CreditLedger> {
        &self.ledger
    }

    pub async fn launch(
        &self,
        batch: PendingContactBatch,
        enrichment: ConfirmedEnrichment,
    ) -> Result<JobHandle, LaunchError> {
        let source_kind = batch.source_kind();
        let label = batch.label().to_string();
        let known_count = batch.known_contact_count();

        tracing::info!(
            "Launching {} enrichment for {} ({:?})",
            enrichment.config.describe(),
            label,
            source_kind
        );

        let launched = match batch.into_payload() {
            BatchPayload::File(file) => {
                let response = self.api.upload_file(&file, &enrichment).await;
                response.map(|r| (r.job_id, r.contact_count))
            }
            BatchPayload::Manual(contacts) => {
                let request = ManualImportRequest {
                    contacts,
                    config: enrichment.config,
                    filename: enrichment.filename.clone(),
                };
                let response = self.api.import_manual(&request).await;
                response.map(|r| (r.job_id, None))
            }
            BatchPayload::CrmImport {
                provider,
                remote_job_id,
                imported_count,
            } => {
                let enriched = self
                    .api
                    .enrich_imported_job(&remote_job_id, enrichment.config)
                    .await;

                if let Err(e) = enriched {
                    let reason = LaunchError::from(e).user_reason();
                    tracing::error!(
                        "Enrich call failed for imported job {}: {}",
                        remote_job_id,
                        reason
                    );
                    return Err(LaunchError::PartialImport {
                        job_id: remote_job_id,
                        provider,
                        imported_count,
                        reason,
                    });
                }

                Ok((remote_job_id, None))
            }
        };

        let (job_id, counted) = match launched {
            Ok(launched) => launched,
            Err(e) => {
                tracing::error!("Launch failed for {}: {}", label, e);
                return Err(e.into());
            }
        };

        // Uploads are counted by the server; unknown counts are charged as one contact.
        let contacts = counted.or(known_count).unwrap_or(1);
        let estimated_credits = self.costs.estimate(contacts, enrichment.config);
        self.ledger
            .debit(estimated_credits, &format!("enrichment job {}", job_id))
            .await;
        self.ledger.schedule_resync(self.resync_delay);

        tracing::info!(
            "Started job {} for {} (~{} credits)",
            job_id,
            label,
            estimated_credits
        );

        Ok(JobHandle {
            job_id,
            source_kind,
            estimated_credits,
            launched_at: Utc::now(),
        })
    }
}

/// Label for the source kind in user messages
pub fn describe_source(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::File => "file upload",
        SourceKind::Manual => "manual contacts",
        SourceKind::CrmImport => "CRM import",
    }
}
