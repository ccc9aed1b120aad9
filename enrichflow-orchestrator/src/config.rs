use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::handlers::redirect_resumption::ResumptionMarkers;
use crate::helpers::credit_ledger::CreditCosts;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub credits: CreditsSection,
    #[serde(default)]
    pub refresh: RefreshSection,
    #[serde(default)]
    pub resumption: ResumptionSection,
    #[serde(default)]
    pub upload: UploadSection,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CreditsSection {
    #[serde(default = "default_email_cost")]
    pub email_cost: u64,
    #[serde(default = "default_phone_cost")]
    pub phone_cost: u64,
    #[serde(default = "default_resync_delay_ms")]
    pub resync_delay_ms: u64,
}

impl Default for CreditsSection {
    fn default() -> Self {
        Self {
            email_cost: default_email_cost(),
            phone_cost: default_phone_cost(),
            resync_delay_ms: default_resync_delay_ms(),
        }
    }
}

impl CreditsSection {
    pub fn costs(&self) -> CreditCosts {
        CreditCosts {
            email_per_contact: self.email_cost,
            phone_per_contact: self.phone_cost,
        }
    }

    pub fn resync_delay(&self) -> Duration {
        Duration::from_millis(self.resync_delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RefreshSection {
    #[serde(default = "default_credit_poll_secs")]
    pub credit_poll_secs: u64,
    #[serde(default = "default_job_poll_secs")]
    pub job_poll_secs: u64,
    #[serde(default = "default_job_limit")]
    pub job_limit: u32,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            credit_poll_secs: default_credit_poll_secs(),
            job_poll_secs: default_job_poll_secs(),
            job_limit: default_job_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResumptionSection {
    #[serde(default = "default_job_marker")]
    pub job_marker: String,
    #[serde(default = "default_count_marker")]
    pub count_marker: String,
    #[serde(default = "default_provider_marker")]
    pub provider_marker: String,
    #[serde(default = "default_resumption_delay_ms")]
    pub delay_ms: u64,
}

impl Default for ResumptionSection {
    fn default() -> Self {
        Self {
            job_marker: default_job_marker(),
            count_marker: default_count_marker(),
            provider_marker: default_provider_marker(),
            delay_ms: default_resumption_delay_ms(),
        }
    }
}

impl ResumptionSection {
    pub fn markers(&self) -> ResumptionMarkers {
        ResumptionMarkers {
            job: self.job_marker.clone(),
            count: self.count_marker.clone(),
            provider: self.provider_marker.clone(),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadSection {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_email_cost() -> u64 {
    CreditCosts::default().email_per_contact
}

fn default_phone_cost() -> u64 {
    CreditCosts::default().phone_per_contact
}

fn default_resync_delay_ms() -> u64 {
    2000
}

fn default_credit_poll_secs() -> u64 {
    60
}

fn default_job_poll_secs() -> u64 {
    10
}

fn default_job_limit() -> u32 {
    20
}

fn default_job_marker() -> String {
    "import_job_id".to_string()
}

fn default_count_marker() -> String {
    "imported_count".to_string()
}

fn default_provider_marker() -> String {
    "provider".to_string()
}

fn default_resumption_delay_ms() -> u64 {
    500
}

fn default_max_bytes() -> u64 {
    shared_types::MAX_UPLOAD_BYTES
}

const DEFAULT_CONFIG: &str = r#"
[api]
base_url = "http://localhost:8000/api/"
# api_key = "your-api-key"
timeout_secs = 30

[credits]
# Credits charged per contact, used for the local estimate only
email_cost = 1
phone_cost = 10
resync_delay_ms = 2000

[refresh]
credit_poll_secs = 60
job_poll_secs = 10
job_limit = 20

[resumption]
# Query parameters the CRM import redirect comes back with
job_marker = "import_job_id"
count_marker = "imported_count"
provider_marker = "provider"
delay_ms = 500

[upload]
# 50 MB
max_bytes = 52428800
"#;

impl ClientConfig {
    /// Loads the user's config file, writing the default one on first run.
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        if !config_path.exists() {
            std::fs::write(&config_path, DEFAULT_CONFIG).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
            tracing::info!("Wrote default config to {}", config_path.display());
        }

        let config = Self::load_from(&config_path)?;
        Ok((config, config_path))
    }

    /// Reads `path` (which may be missing) and applies `ENRICHFLOW__SECTION__KEY`
    /// environment overrides on top.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("ENRICHFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("enrichflow").join("client.toml")
    } else {
        PathBuf::from("client.toml")
    }
}
