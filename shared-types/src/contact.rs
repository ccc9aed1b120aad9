use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::validation::{ContactField, ValidationError};

/// Identity fields of a contact waiting to be enriched.
///
/// Drafts carry no enrichment results; the server fills in email and phone
/// once the job runs. The `id` only exists client-side so entries can be
/// removed from a manual batch before it is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContactDraft {
    #[serde(skip_serializing, default = "Uuid::new_v4")]
    #[ts(skip)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub linkedin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub domain: Option<String>,
}

impl ContactDraft {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            company: company.into(),
            position: None,
            location: None,
            industry: None,
            linkedin_url: None,
            domain: None,
        }
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    /// Checks the mandatory fields, reporting every missing one at once.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (field, value) in [
            (ContactField::FirstName, &self.first_name),
            (ContactField::LastName, &self.last_name),
            (ContactField::Company, &self.company),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::MissingField(field));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Trims surrounding whitespace and turns blank optional fields into `None`.
    pub fn normalized(mut self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.company = self.company.trim().to_string();
        self.position = clean(self.position);
        self.location = clean(self.location);
        self.industry = clean(self.industry);
        self.linkedin_url = clean(self.linkedin_url);
        self.domain = clean(self.domain);
        self
    }
}
