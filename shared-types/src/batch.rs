use serde::Serialize;
use std::path::PathBuf;

use crate::contact::ContactDraft;
use crate::integration::Provider;
use crate::validation::ValidationError;

/// Where a pending batch came from. Selects the launch protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    File,
    Manual,
    CrmImport,
}

/// A spreadsheet picked for upload. The file is never parsed client-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchPayload {
    File(UploadFile),
    Manual(Vec<ContactDraft>),
    /// Contacts already imported server-side; only the job id travels.
    CrmImport {
        provider: Option<Provider>,
        remote_job_id: String,
        imported_count: u32,
    },
}

/// Contacts waiting for the user to pick an enrichment configuration.
///
/// Either local contacts (file or manual entry) or a remote job id (CRM
/// import) are carried, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingContactBatch {
    label: String,
    payload: BatchPayload,
}

impl PendingContactBatch {
    pub fn from_file(file: UploadFile) -> Self {
        Self {
            label: file.file_name.clone(),
            payload: BatchPayload::File(file),
        }
    }

    pub fn manual(contacts: Vec<ContactDraft>) -> Result<Self, ValidationError> {
        if contacts.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }

        let label = match contacts.len() {
            1 => "1 manual contact".to_string(),
            n => format!("{} manual contacts", n),
        };

        Ok(Self {
            label,
            payload: BatchPayload::Manual(contacts),
        })
    }

    /// `provider` is `None` when a redirect did not say where the contacts came from.
    pub fn crm_import(
        provider: Option<Provider>,
        remote_job_id: impl Into<String>,
        imported_count: u32,
    ) -> Self {
        let source = provider
            .map(|p| p.display_name())
            .unwrap_or("your CRM");

        Self {
            label: format!("{} contacts imported from {}", imported_count, source),
            payload: BatchPayload::CrmImport {
                provider,
                remote_job_id: remote_job_id.into(),
                imported_count,
            },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn payload(&self) -> &BatchPayload {
        &self.payload
    }

    pub fn into_payload(self) -> BatchPayload {
        self.payload
    }

    pub fn source_kind(&self) -> SourceKind {
        match self.payload {
            BatchPayload::File(_) => SourceKind::File,
            BatchPayload::Manual(_) => SourceKind::Manual,
            BatchPayload::CrmImport { .. } => SourceKind::CrmImport,
        }
    }

    pub fn contacts(&self) -> Option<&[ContactDraft]> {
        match &self.payload {
            BatchPayload::Manual(contacts) => Some(contacts),
            _ => None,
        }
    }

    pub fn remote_job_id(&self) -> Option<&str> {
        match &self.payload {
            BatchPayload::CrmImport { remote_job_id, .. } => Some(remote_job_id),
            _ => None,
        }
    }

    /// Number of contacts known client-side. `None` for uploads, which are counted by the server.
    pub fn known_contact_count(&self) -> Option<u32> {
        match &self.payload {
            BatchPayload::File(_) => None,
            BatchPayload::Manual(contacts) => Some(contacts.len() as u32),
            BatchPayload::CrmImport { imported_count, .. } => Some(*imported_count),
        }
    }
}
