use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::batch::SourceKind;

/// Returned by a successful launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub job_id: String,
    pub source_kind: SourceKind,
    pub estimated_credits: u64,
    pub launched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    Importing,
    Imported,
    Enriching,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Server-side enrichment job as listed by the jobs endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EnrichmentJob {
    pub id: String,
    pub status: JobStatus,
    pub filename: Option<String>,
    #[serde(default)]
    pub total_contacts: u64,
    #[serde(default)]
    pub enriched_contacts: u64,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JobsResponse {
    pub jobs: Vec<EnrichmentJob>,
}
