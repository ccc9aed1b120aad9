use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared_types::{
    ConfirmedEnrichment, CreditBalanceResponse, CrmImportResponse, EnrichRequest,
    EnrichmentConfig, EnrichmentJob, ErrorResponse, ExportRequest, ExportResponse, JobsResponse,
    ManualImportRequest, ManualImportResponse, Provider, UploadFile, UploadResponse,
};
use std::time::Duration;
use url::Url;

use super::enrichment_api::{ApiError, EnrichmentApi};

/// Longest plain-text error body shown to the user as-is
const MAX_PLAIN_ERROR_LEN: usize = 300;

pub struct HttpEnrichmentApi {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpEnrichmentApi {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL {} cannot be used as a base", base_url);
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("enrichflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("Invalid API base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| format!("Request failed with status {}", status));

        tracing::debug!("API rejected request with {}: {}", status, message);

        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Pulls a human readable message out of an error body: a JSON
/// `error`/`message`/`detail` field, or a short plain-text body.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(message) = parsed.into_message() {
            return Some(message);
        }
    }

    let looks_like_markup = body.starts_with('<');
    let looks_like_json = body.starts_with('{') || body.starts_with('[');
    if looks_like_markup || looks_like_json || body.len() > MAX_PLAIN_ERROR_LEN {
        return None;
    }

    Some(body.to_string())
}

#[async_trait]
impl EnrichmentApi for HttpEnrichmentApi {
    async fn upload_file(
        &self,
        file: &UploadFile,
        enrichment: &ConfirmedEnrichment,
    ) -> Result<UploadResponse, ApiError> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| ApiError::LocalFile {
                path: file.path.display().to_string(),
                message: e.to_string(),
            })?;

        let mime = file
            .mime_type
            .clone()
            .or_else(|| sources::guess_mime_type(&file.file_name).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let part = Part::bytes(bytes)
            .file_name(file.file_name.clone())
            .mime_str(&mime)
            .map_err(|e| ApiError::LocalFile {
                path: file.path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut form = Form::new()
            .part("file", part)
            .text("email", enrichment.config.email().to_string())
            .text("phone", enrichment.config.phone().to_string());
        if let Some(filename) = &enrichment.filename {
            form = form.text("filename", filename.clone());
        }

        let url = self.endpoint(&["upload"])?;
        self.send_json(self.client.post(url).multipart(form)).await
    }

    async fn import_manual(
        &self,
        request: &ManualImportRequest,
    ) -> Result<ManualImportResponse, ApiError> {
        let url = self.endpoint(&["imports", "manual"])?;
        self.send_json(self.client.post(url).json(request)).await
    }

    async fn import_from_provider(
        &self,
        provider: Provider,
    ) -> Result<CrmImportResponse, ApiError> {
        let url = self.endpoint(&["integrations", provider.slug(), "import"])?;
        self.send_json(self.client.post(url).json(&serde_json::json!({})))
            .await
    }

    async fn enrich_imported_job(
        &self,
        job_id: &str,
        config: EnrichmentConfig,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["import", "jobs", job_id, "enrich"])?;
        self.send(self.client.post(url).json(&EnrichRequest { config }))
            .await?;
        Ok(())
    }

    async fn credit_balance(&self) -> Result<i64, ApiError> {
        let url = self.endpoint(&["credits"])?;
        let balance: CreditBalanceResponse = self.send_json(self.client.get(url)).await?;
        Ok(balance.remaining)
    }

    async fn list_jobs(&self, limit: u32) -> Result<Vec<EnrichmentJob>, ApiError> {
        let url = self.endpoint(&["jobs"])?;
        let response: JobsResponse = self
            .send_json(self.client.get(url).query(&[("limit", limit)]))
            .await?;
        Ok(response.jobs)
    }

    async fn export_job(
        &self,
        provider: Provider,
        job_id: &str,
    ) -> Result<ExportResponse, ApiError> {
        let url = self.endpoint(&["integrations", provider.slug(), "export"])?;
        let request = ExportRequest {
            job_id: job_id.to_string(),
        };
        self.send_json(self.client.post(url).json(&request)).await
    }
}
