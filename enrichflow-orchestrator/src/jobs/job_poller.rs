use shared_types::{EnrichmentJob, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::integrations::{ApiError, EnrichmentApi};
use crate::jobs::refresh_registry::RefreshRegistry;

pub const JOB_POLLER: &str = "jobs";

/// Latest page of enrichment jobs, refreshed in the background for the job table.
pub struct JobPoller {
    api: Arc<dyn EnrichmentApi>,
    limit: u32,
    jobs: watch::Sender<Vec<EnrichmentJob>>,
}

impl JobPoller {
    pub fn new(api: Arc<dyn EnrichmentApi>, limit: u32) -> Self {
        let (jobs, _) = watch::channel(Vec::new());
        Self { api, limit, jobs }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<EnrichmentJob>> {
        self.jobs.subscribe()
    }

    pub fn latest(&self) -> Vec<EnrichmentJob> {
        self.jobs.borrow().clone()
    }

    pub async fn refresh(&self) -> Result<Vec<EnrichmentJob>, ApiError> {
        let jobs = self.api.list_jobs(self.limit).await?;

        let previous: HashMap<String, JobStatus> = self
            .jobs
            .borrow()
            .iter()
            .map(|job| (job.id.clone(), job.status))
            .collect();

        for job in &jobs {
            match previous.get(&job.id) {
                Some(status) if *status != job.status && job.status.is_terminal() => {
                    tracing::info!(
                        "Job {} finished as {:?}: {}/{} contacts enriched",
                        job.id,
                        job.status,
                        job.enriched_contacts,
                        job.total_contacts
                    );
                }
                Some(status) if *status != job.status => {
                    tracing::debug!("Job {} moved from {:?} to {:?}", job.id, status, job.status);
                }
                _ => {}
            }
        }

        self.jobs.send_replace(jobs.clone());
        Ok(jobs)
    }

    pub async fn register(self: &Arc<Self>, registry: &Arc<RefreshRegistry>, period: Duration) {
        let poller = self.clone();
        registry
            .register(JOB_POLLER, period, move || {
                let poller = poller.clone();
                async move {
                    poller.refresh().await?;
                    anyhow::Ok(())
                }
            })
            .await;
    }
}
