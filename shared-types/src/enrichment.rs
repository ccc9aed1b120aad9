use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::validation::ValidationError;

const MAX_FILENAME_LEN: usize = 255;

/// Which fields the server should look up for each contact.
///
/// At least one of `email` / `phone` is always set; the only way to build one
/// is through [`EnrichmentConfig::new`], and deserialization goes through the
/// same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct EnrichmentConfig {
    email: bool,
    phone: bool,
}

impl EnrichmentConfig {
    pub fn new(email: bool, phone: bool) -> Result<Self, ValidationError> {
        if !email && !phone {
            return Err(ValidationError::NoEnrichmentField);
        }
        Ok(Self { email, phone })
    }

    pub fn email(&self) -> bool {
        self.email
    }

    pub fn phone(&self) -> bool {
        self.phone
    }

    /// Short human readable summary, used in log lines and success messages.
    pub fn describe(&self) -> &'static str {
        match (self.email, self.phone) {
            (true, true) => "email and phone",
            (true, false) => "email",
            _ => "phone",
        }
    }
}

impl<'de> Deserialize<'de> for EnrichmentConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Fields {
            #[serde(default)]
            email: bool,
            #[serde(default)]
            phone: bool,
        }

        let fields = Fields::deserialize(deserializer)?;
        EnrichmentConfig::new(fields.email, fields.phone).map_err(serde::de::Error::custom)
    }
}

/// What the user picked in the confirmation modal, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EnrichmentChoice {
    pub email: bool,
    pub phone: bool,
    pub filename: Option<String>,
}

impl EnrichmentChoice {
    pub fn validate(self) -> Result<ConfirmedEnrichment, ValidationError> {
        let config = EnrichmentConfig::new(self.email, self.phone)?;
        let filename = normalize_filename(self.filename)?;
        Ok(ConfirmedEnrichment { config, filename })
    }
}

/// A confirmed enrichment request. `filename: None` means the server picks its default name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConfirmedEnrichment {
    pub config: EnrichmentConfig,
    pub filename: Option<String>,
}

impl ConfirmedEnrichment {
    pub fn new(config: EnrichmentConfig) -> Self {
        Self {
            config,
            filename: None,
        }
    }
}

/// The request currently shown to the user by the confirmation modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConfirmationRequest {
    pub id: Uuid,
    pub label: String,
    pub requested_at: DateTime<Utc>,
}

fn normalize_filename(filename: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(name) = filename else {
        return Ok(None);
    };

    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }

    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ValidationError::InvalidFilename(format!(
            "{} must not contain path separators",
            name
        )));
    }

    if name.len() > MAX_FILENAME_LEN {
        return Err(ValidationError::InvalidFilename(format!(
            "filename is longer than {} characters",
            MAX_FILENAME_LEN
        )));
    }

    Ok(Some(name.to_string()))
}
