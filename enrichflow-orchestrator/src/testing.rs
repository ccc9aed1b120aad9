//! Scriptable in-memory API used by the unit tests.

use async_trait::async_trait;
use shared_types::{
    ConfirmedEnrichment, CrmImportResponse, EnrichmentConfig, EnrichmentJob, ExportResponse,
    ManualImportRequest, ManualImportResponse, Provider, UploadFile, UploadResponse,
};
use std::sync::Mutex;

use crate::integrations::{ApiError, EnrichmentApi};

pub struct FakeApi {
    upload: Mutex<Result<UploadResponse, ApiError>>,
    manual: Mutex<Result<ManualImportResponse, ApiError>>,
    crm_import: Mutex<Result<CrmImportResponse, ApiError>>,
    enrich: Mutex<Result<(), ApiError>>,
    credits: Mutex<Result<i64, ApiError>>,
    jobs: Mutex<Result<Vec<EnrichmentJob>, ApiError>>,
    export: Mutex<Result<ExportResponse, ApiError>>,
    calls: Mutex<Vec<String>>,
    manual_requests: Mutex<Vec<ManualImportRequest>>,
    enrich_configs: Mutex<Vec<EnrichmentConfig>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            upload: Mutex::new(Ok(UploadResponse {
                job_id: "upload-1".to_string(),
                contact_count: None,
            })),
            manual: Mutex::new(Ok(ManualImportResponse {
                job_id: "manual-1".to_string(),
            })),
            crm_import: Mutex::new(Ok(CrmImportResponse {
                job_id: "crm-1".to_string(),
                imported_count: 10,
            })),
            enrich: Mutex::new(Ok(())),
            credits: Mutex::new(Ok(100)),
            jobs: Mutex::new(Ok(Vec::new())),
            export: Mutex::new(Ok(ExportResponse {
                exported_count: 0,
                message: None,
            })),
            calls: Mutex::new(Vec::new()),
            manual_requests: Mutex::new(Vec::new()),
            enrich_configs: Mutex::new(Vec::new()),
        }
    }

    pub fn set_upload(&self, result: Result<UploadResponse, ApiError>) {
        *self.upload.lock().unwrap() = result;
    }

    pub fn set_manual(&self, result: Result<ManualImportResponse, ApiError>) {
        *self.manual.lock().unwrap() = result;
    }

    pub fn set_crm_import(&self, result: Result<CrmImportResponse, ApiError>) {
        *self.crm_import.lock().unwrap() = result;
    }

    pub fn set_enrich(&self, result: Result<(), ApiError>) {
        *self.enrich.lock().unwrap() = result;
    }

    pub fn set_credits(&self, result: Result<i64, ApiError>) {
        *self.credits.lock().unwrap() = result;
    }

    pub fn set_jobs(&self, result: Result<Vec<EnrichmentJob>, ApiError>) {
        *self.jobs.lock().unwrap() = result;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn manual_requests(&self) -> Vec<ManualImportRequest> {
        self.manual_requests.lock().unwrap().clone()
    }

    pub fn enrich_configs(&self) -> Vec<EnrichmentConfig> {
        self.enrich_configs.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EnrichmentApi for FakeApi {
    async fn upload_file(
        &self,
        file: &UploadFile,
        _enrichment: &ConfirmedEnrichment,
    ) -> Result<UploadResponse, ApiError> {
        self.record(format!("upload_file:{}", file.file_name));
        self.upload.lock().unwrap().clone()
    }

    async fn import_manual(
        &self,
        request: &ManualImportRequest,
    ) -> Result<ManualImportResponse, ApiError> {
        self.record("import_manual".to_string());
        self.manual_requests.lock().unwrap().push(request.clone());
        self.manual.lock().unwrap().clone()
    }

    async fn import_from_provider(
        &self,
        provider: Provider,
    ) -> Result<CrmImportResponse, ApiError> {
        self.record(format!("import_from_provider:{}", provider.slug()));
        self.crm_import.lock().unwrap().clone()
    }

    async fn enrich_imported_job(
        &self,
        job_id: &str,
        config: EnrichmentConfig,
    ) -> Result<(), ApiError> {
        self.record(format!("enrich_imported_job:{}", job_id));
        self.enrich_configs.lock().unwrap().push(config);
        self.enrich.lock().unwrap().clone()
    }

    async fn credit_balance(&self) -> Result<i64, ApiError> {
        self.record("credit_balance".to_string());
        self.credits.lock().unwrap().clone()
    }

    async fn list_jobs(&self, _limit: u32) -> Result<Vec<EnrichmentJob>, ApiError> {
        self.record("list_jobs".to_string());
        self.jobs.lock().unwrap().clone()
    }

    async fn export_job(
        &self,
        provider: Provider,
        job_id: &str,
    ) -> Result<ExportResponse, ApiError> {
        self.record(format!("export_job:{}:{}", provider.slug(), job_id));
        self.export.lock().unwrap().clone()
    }
}
