use anyhow::Result;
use shared_types::{
    ExportResponse, JobHandle, PendingContactBatch, Provider, UploadFile, ValidationError,
};
use sources::{FileAdapter, ManualContactAdapter, SourceAdapter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::handlers::redirect_resumption::{RedirectResumption, ResumptionMarkers};
use crate::helpers::confirmation_gate::{ConfirmationGate, GateError};
use crate::helpers::credit_ledger::CreditLedger;
use crate::helpers::navigator::Navigator;
use crate::integrations::{
    ApiError, CrmImportAdapter, CrmImportError, EnrichmentApi, HttpEnrichmentApi,
};
use crate::jobs::credit_poller;
use crate::jobs::job_poller::JobPoller;
use crate::jobs::launcher::{JobLauncher, LaunchError};
use crate::jobs::refresh_registry::RefreshRegistry;

#[derive(Debug)]
pub enum ImportOutcome {
    Launched(JobHandle),
    /// The user closed the confirmation without choosing; nothing was launched.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    UnsupportedOperation(String),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Launch(#[from] LaunchError),
}

impl From<CrmImportError> for ImportError {
    fn from(error: CrmImportError) -> Self {
        match error {
            CrmImportError::UnsupportedOperation(reason) => ImportError::UnsupportedOperation(reason),
            CrmImportError::Validation(e) => ImportError::Validation(e),
            CrmImportError::Api(e) => ImportError::Api(e),
        }
    }
}

/// Entry point the dashboard drives: every import source goes through the
/// same confirmation gate and launcher.
pub struct ImportOrchestrator {
    api: Arc<dyn EnrichmentApi>,
    refresh: Arc<RefreshRegistry>,
    gate: Arc<ConfirmationGate>,
    ledger: Arc<CreditLedger>,
    launcher: Arc<JobLauncher>,
    file_adapter: FileAdapter,
    crm_adapter: CrmImportAdapter,
    config: ClientConfig,
}

impl ImportOrchestrator {
    pub fn new(api: Arc<dyn EnrichmentApi>, config: ClientConfig) -> Self {
        let refresh = Arc::new(RefreshRegistry::new());
        let gate = Arc::new(ConfirmationGate::new(Some(refresh.clone())));
        let ledger = Arc::new(CreditLedger::new(api.clone()).with_refresh(refresh.clone()));
        let launcher = Arc::new(JobLauncher::new(
            api.clone(),
            ledger.clone(),
            config.credits.costs(),
            config.credits.resync_delay(),
        ));

        Self {
            file_adapter: FileAdapter::new(config.upload.max_bytes),
            crm_adapter: CrmImportAdapter::new(api.clone()),
            api,
            refresh,
            gate,
            ledger,
            launcher,
            config,
        }
    }

    /// Wires the HTTP client described by `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let api = HttpEnrichmentApi::new(
            &config.api.base_url,
            config.api.api_key.clone(),
            config.request_timeout(),
        )?;
        tracing::info!("Using enrichment API at {}", api.base_url());
        Ok(Self::new(Arc::new(api), config))
    }

    pub fn gate(&self) -> &Arc<ConfirmationGate> {
        &self.gate
    }

    pub fn ledger(&self) -> &Arc<CreditLedger> {
        &self.ledger
    }

    pub fn refresh(&self) -> &Arc<RefreshRegistry> {
        &self.refresh
    }

    pub fn api(&self) -> &Arc<dyn EnrichmentApi> {
        &self.api
    }

    pub async fn import_file(&self, path: &Path) -> Result<ImportOutcome, ImportError> {
        let batch = self.file_adapter.produce_path(path)?;
        self.confirm_and_launch(batch).await
    }

    pub async fn import_upload(&self, file: UploadFile) -> Result<ImportOutcome, ImportError> {
        let batch = self.file_adapter.produce(file)?;
        self.confirm_and_launch(batch).await
    }

    /// Launches the entered contacts. The list is cleared only once the job
    /// has started, so a cancel or a failure leaves it intact for another try.
    pub async fn import_manual(
        &self,
        adapter: &mut ManualContactAdapter,
    ) -> Result<ImportOutcome, ImportError> {
        let batch = adapter.commit()?;
        let outcome = self.confirm_and_launch(batch).await?;

        if let ImportOutcome::Launched(_) = outcome {
            adapter.clear();
        }

        Ok(outcome)
    }

    /// Imports from the provider, then asks how to enrich. Cancelling at that
    /// point leaves the imported contacts in their server-side job.
    pub async fn import_from_crm(&self, provider: Provider) -> Result<ImportOutcome, ImportError> {
        let batch = self.crm_adapter.produce(provider).await?;
        let outcome = self.confirm_and_launch(batch).await?;

        if let ImportOutcome::Cancelled = outcome {
            tracing::info!(
                "{} import kept without enrichment after cancel",
                provider
            );
        }

        Ok(outcome)
    }

    pub async fn export_job(
        &self,
        job_id: &str,
        provider: Provider,
    ) -> Result<ExportResponse, ImportError> {
        if !provider.supports_export() {
            return Err(ImportError::UnsupportedOperation(format!(
                "Cannot export to {}",
                provider
            )));
        }

        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(ImportError::UnsupportedOperation(
                "A job id is required to export".to_string(),
            ));
        }

        let response = self.api.export_job(provider, job_id).await?;
        tracing::info!(
            "Exported {} contacts from job {} to {}",
            response.exported_count,
            job_id,
            provider
        );
        Ok(response)
    }

    pub fn redirect_resumption(&self, navigator: Arc<dyn Navigator>) -> Arc<RedirectResumption> {
        let markers: ResumptionMarkers = self.config.resumption.markers();
        Arc::new(
            RedirectResumption::new(navigator, self.gate.clone(), self.launcher.clone())
                .with_markers(markers)
                .with_delay(self.config.resumption.delay()),
        )
    }

    /// Registers the credit and job pollers with the refresh registry.
    pub async fn start_background_refresh(&self) -> Arc<JobPoller> {
        let refresh = &self.config.refresh;

        credit_poller::register(
            &self.refresh,
            self.ledger.clone(),
            Duration::from_secs(refresh.credit_poll_secs),
        )
        .await;

        let poller = Arc::new(JobPoller::new(self.api.clone(), refresh.job_limit));
        poller
            .register(&self.refresh, Duration::from_secs(refresh.job_poll_secs))
            .await;

        poller
    }

    pub async fn shutdown(&self) {
        self.refresh.shutdown().await;
    }

    async fn confirm_and_launch(
        &self,
        batch: PendingContactBatch,
    ) -> Result<ImportOutcome, ImportError> {
        let confirmed = match self.gate.confirm(batch.label()).await? {
            Some(confirmed) => confirmed,
            None => return Ok(ImportOutcome::Cancelled),
        };

        let handle = self.launcher.launch(batch, confirmed).await?;
        Ok(ImportOutcome::Launched(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use shared_types::{
        ConfirmationRequest, ContactDraft, CrmImportResponse, EnrichmentChoice, EnrichmentConfig,
        SourceKind,
    };
    use std::io::Write;

    fn orchestrator(api: Arc<FakeApi>) -> Arc<ImportOrchestrator> {
        Arc::new(ImportOrchestrator::new(api, ClientConfig::default()))
    }

    async fn wait_for_request(gate: &ConfirmationGate) -> ConfirmationRequest {
        let mut current = gate.subscribe();
        let request = current
            .wait_for(|request| request.is_some())
            .await
            .unwrap()
            .clone();
        request.unwrap()
    }

    fn email_only() -> EnrichmentChoice {
        EnrichmentChoice {
            email: true,
            phone: false,
            filename: None,
        }
    }

    #[tokio::test]
    async fn test_manual_import_sends_contact_and_clears_list() {
        let api = Arc::new(FakeApi::new());
        let orchestrator = orchestrator(api.clone());
        let contact = ContactDraft::new("John", "Doe", "Acme");

        let task = {
            let orchestrator = orchestrator.clone();
            let contact = contact.clone();
            tokio::spawn(async move {
                let mut adapter = ManualContactAdapter::new();
                adapter.add(contact).unwrap();
                let outcome = orchestrator.import_manual(&mut adapter).await;
                (outcome, adapter.len())
            })
        };

        let request = wait_for_request(orchestrator.gate()).await;
        assert_eq!(request.label, "1 manual contact");
        orchestrator.gate().submit(request.id, email_only()).unwrap();

        let (outcome, remaining_contacts) = task.await.unwrap();
        match outcome.unwrap() {
            ImportOutcome::Launched(handle) => {
                assert_eq!(handle.source_kind, SourceKind::Manual);
                assert_eq!(handle.estimated_credits, 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(remaining_contacts, 0);

        let requests = api.manual_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].contacts, vec![contact]);
        assert_eq!(requests[0].config, EnrichmentConfig::new(true, false).unwrap());
        assert_eq!(requests[0].filename, None);
        assert_eq!(orchestrator.ledger().remaining().await, -1);
    }

    #[tokio::test]
    async fn test_manual_cancel_keeps_contacts() {
        let api = Arc::new(FakeApi::new());
        let orchestrator = orchestrator(api.clone());

        let task = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let mut adapter = ManualContactAdapter::new();
                adapter.add(ContactDraft::new("Ada", "Lovelace", "Analytical")).unwrap();
                let outcome = orchestrator.import_manual(&mut adapter).await;
                (outcome, adapter.len())
            })
        };

        let request = wait_for_request(orchestrator.gate()).await;
        orchestrator.gate().cancel(request.id).unwrap();

        let (outcome, remaining_contacts) = task.await.unwrap();
        assert!(matches!(outcome.unwrap(), ImportOutcome::Cancelled));
        assert_eq!(remaining_contacts, 1);
        assert_eq!(api.count_calls("import_manual"), 0);
    }

    #[tokio::test]
    async fn test_empty_manual_list_never_opens_gate() {
        let api = Arc::new(FakeApi::new());
        let orchestrator = orchestrator(api.clone());
        let mut adapter = ManualContactAdapter::new();

        let err = orchestrator.import_manual(&mut adapter).await.unwrap_err();

        assert!(matches!(err, ImportError::Validation(ValidationError::EmptyBatch)));
        assert!(!orchestrator.gate().is_pending());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_crm_cancel_leaves_import_unenriched() {
        let api = Arc::new(FakeApi::new());
        api.set_crm_import(Ok(CrmImportResponse {
            job_id: "crm-42".to_string(),
            imported_count: 10,
        }));
        let orchestrator = orchestrator(api.clone());
        let mut events = orchestrator.ledger().subscribe();

        let task = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.import_from_crm(Provider::HubSpot).await })
        };

        let request = wait_for_request(orchestrator.gate()).await;
        assert_eq!(request.label, "10 contacts imported from HubSpot");
        orchestrator.gate().cancel(request.id).unwrap();

        assert!(matches!(task.await.unwrap().unwrap(), ImportOutcome::Cancelled));
        assert_eq!(api.calls(), vec!["import_from_provider:hubspot".to_string()]);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_zapier_import_rejected_before_any_call() {
        let api = Arc::new(FakeApi::new());
        let orchestrator = orchestrator(api.clone());

        let err = orchestrator.import_from_crm(Provider::Zapier).await.unwrap_err();

        match err {
            ImportError::UnsupportedOperation(reason) => assert!(reason.contains("export-only")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(api.calls().is_empty());
        assert!(!orchestrator.gate().is_pending());
    }

    #[tokio::test]
    async fn test_file_import_uploads_confirmed_file() {
        let api = Arc::new(FakeApi::new());
        let orchestrator = orchestrator(api.clone());

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "first_name,last_name,company\nJohn,Doe,Acme").unwrap();
        let path = file.path().to_path_buf();
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();

        let task = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.import_file(&path).await })
        };

        let request = wait_for_request(orchestrator.gate()).await;
        assert_eq!(request.label, file_name);
        orchestrator
            .gate()
            .submit(request.id, EnrichmentChoice {
                email: true,
                phone: true,
                filename: Some("Q3 leads".to_string()),
            })
            .unwrap();

        match task.await.unwrap().unwrap() {
            ImportOutcome::Launched(handle) => assert_eq!(handle.job_id, "upload-1"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(api.calls()[0], format!("upload_file:{}", file_name));
    }

    #[tokio::test]
    async fn test_unsupported_file_never_opens_gate() {
        let api = Arc::new(FakeApi::new());
        let orchestrator = orchestrator(api.clone());
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        writeln!(file, "%PDF-1.4").unwrap();

        let err = orchestrator.import_file(file.path()).await.unwrap_err();

        assert!(matches!(
            err,
            ImportError::Validation(ValidationError::UnsupportedFileType { .. })
        ));
        assert!(!orchestrator.gate().is_pending());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_export_job_calls_provider_endpoint() {
        let api = Arc::new(FakeApi::new());
        let orchestrator = orchestrator(api.clone());

        orchestrator.export_job(" job-5 ", Provider::Zapier).await.unwrap();
        assert_eq!(api.calls(), vec!["export_job:zapier:job-5".to_string()]);

        let err = orchestrator.export_job("  ", Provider::Lemlist).await.unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedOperation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_pauses_while_confirming() {
        let api = Arc::new(FakeApi::new());
        let orchestrator = orchestrator(api.clone());

        orchestrator.start_background_refresh().await;
        assert_eq!(
            orchestrator.refresh().registered().await,
            vec!["credits".to_string(), "jobs".to_string()]
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        let credit_calls = api.count_calls("credit_balance");
        assert_eq!(credit_calls, 1);

        let task = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.import_from_crm(Provider::Lemlist).await })
        };
        let request = wait_for_request(orchestrator.gate()).await;
        assert!(orchestrator.refresh().is_paused());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(api.count_calls("credit_balance"), credit_calls);

        orchestrator.gate().cancel(request.id).unwrap();
        task.await.unwrap().unwrap();
        assert!(!orchestrator.refresh().is_paused());

        orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_launch_resync_held_while_next_confirmation_open() {
        let api = Arc::new(FakeApi::new());
        let orchestrator = orchestrator(api.clone());

        let manual = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let mut adapter = ManualContactAdapter::new();
                adapter.add(ContactDraft::new("John", "Doe", "Acme")).unwrap();
                orchestrator.import_manual(&mut adapter).await
            })
        };
        let request = wait_for_request(orchestrator.gate()).await;
        orchestrator.gate().submit(request.id, email_only()).unwrap();
        assert!(matches!(manual.await.unwrap().unwrap(), ImportOutcome::Launched(_)));

        let crm = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.import_from_crm(Provider::Lemlist).await })
        };
        let request = wait_for_request(orchestrator.gate()).await;
        assert!(orchestrator.refresh().is_paused());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(api.count_calls("credit_balance"), 0);

        orchestrator.gate().cancel(request.id).unwrap();
        assert!(matches!(crm.await.unwrap().unwrap(), ImportOutcome::Cancelled));

        // deferred, not dropped
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.count_calls("credit_balance"), 1);

        orchestrator.shutdown().await;
    }
}
