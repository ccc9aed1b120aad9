use shared_types::{JobHandle, PendingContactBatch, Provider};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::helpers::confirmation_gate::ConfirmationGate;
use crate::helpers::navigator::Navigator;
use crate::jobs::launcher::{JobLauncher, LaunchError};

/// Query parameter names a CRM import redirect comes back with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumptionMarkers {
    pub job: String,
    pub count: String,
    pub provider: String,
}

impl Default for ResumptionMarkers {
    fn default() -> Self {
        Self {
            job: "import_job_id".to_string(),
            count: "imported_count".to_string(),
            provider: "provider".to_string(),
        }
    }
}

/// Markers read back from the address, already validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMarkers {
    pub job_id: String,
    pub imported_count: u32,
    pub provider: Option<Provider>,
}

#[derive(Debug)]
pub enum ResumptionOutcome {
    Launched(JobHandle),
    Cancelled,
    Failed(LaunchError),
    /// Another confirmation was open when the resumed import asked for one.
    GateBusy,
}

/// Picks an import back up after the browser returns from the CRM's
/// authorization page.
///
/// The markers are removed from the address synchronously, before anything
/// is awaited, so a reload or a second check can never start the same
/// import twice.
pub struct RedirectResumption {
    navigator: Arc<dyn Navigator>,
    gate: Arc<ConfirmationGate>,
    launcher: Arc<JobLauncher>,
    markers: ResumptionMarkers,
    delay: Duration,
}

impl RedirectResumption {
    pub fn new(
        navigator: Arc<dyn Navigator>,
        gate: Arc<ConfirmationGate>,
        launcher: Arc<JobLauncher>,
    ) -> Self {
        Self {
            navigator,
            gate,
            launcher,
            markers: ResumptionMarkers::default(),
            delay: Duration::from_millis(500),
        }
    }

    pub fn with_markers(mut self, markers: ResumptionMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Time given to the page to settle before the modal opens
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Strips the import markers from the current address and returns them.
    ///
    /// Nothing changes unless both the job and the count marker are present.
    /// Markers with unusable values are still stripped but yield `None`.
    pub fn take_markers(&self) -> Option<ImportMarkers> {
        let url = self.navigator.current_url();

        let mut job_id = None;
        let mut count = None;
        let mut provider = None;
        let mut kept = Vec::new();

        for (key, value) in url.query_pairs() {
            if key == self.markers.job.as_str() {
                job_id = Some(value.into_owned());
            } else if key == self.markers.count.as_str() {
                count = Some(value.into_owned());
            } else if key == self.markers.provider.as_str() {
                provider = Some(value.into_owned());
            } else {
                kept.push((key.into_owned(), value.into_owned()));
            }
        }

        let (job_id, count) = match (job_id, count) {
            (Some(job_id), Some(count)) => (job_id, count),
            _ => return None,
        };

        let mut stripped = url.clone();
        if kept.is_empty() {
            stripped.set_query(None);
        } else {
            stripped.query_pairs_mut().clear().extend_pairs(&kept);
        }
        self.navigator.replace_url(stripped);

        let job_id = job_id.trim().to_string();
        if job_id.is_empty() {
            tracing::warn!("Ignoring import redirect with an empty job id");
            return None;
        }

        let imported_count = match count.trim().parse::<u32>() {
            Ok(count) if count > 0 => count,
            _ => {
                tracing::warn!(
                    "Ignoring import redirect for job {} with invalid count {:?}",
                    job_id,
                    count
                );
                return None;
            }
        };

        let provider = provider.and_then(|value| match value.parse::<Provider>() {
            Ok(provider) => Some(provider),
            Err(e) => {
                tracing::debug!("Unrecognised provider marker: {}", e);
                None
            }
        });

        Some(ImportMarkers {
            job_id,
            imported_count,
            provider,
        })
    }

    /// Starts the resumed import if the address carries import markers.
    pub fn check_and_resume(self: &Arc<Self>) -> Option<JoinHandle<ResumptionOutcome>> {
        let markers = self.take_markers()?;

        tracing::info!(
            "Resuming import of {} contacts from job {}",
            markers.imported_count,
            markers.job_id
        );

        let resumption = self.clone();
        Some(tokio::spawn(async move { resumption.resume(markers).await }))
    }

    async fn resume(&self, markers: ImportMarkers) -> ResumptionOutcome {
        tokio::time::sleep(self.delay).await;

        let batch = PendingContactBatch::crm_import(
            markers.provider,
            markers.job_id,
            markers.imported_count,
        );

        let confirmed = match self.gate.confirm(batch.label()).await {
            Ok(Some(confirmed)) => confirmed,
            Ok(None) => return ResumptionOutcome::Cancelled,
            Err(e) => {
                tracing::warn!("Could not resume {}: {}", batch.label(), e);
                return ResumptionOutcome::GateBusy;
            }
        };

        match self.launcher.launch(batch, confirmed).await {
            Ok(handle) => ResumptionOutcome::Launched(handle),
            Err(e) => ResumptionOutcome::Failed(e),
        }
    }
}
