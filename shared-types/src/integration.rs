use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Third-party CRM / outreach tools contacts can be imported from or exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    HubSpot,
    Lemlist,
    Zapier,
}

impl Provider {
    /// Path segment used by the `/integrations/{provider}/...` endpoints
    pub fn slug(&self) -> &'static str {
        match self {
            Provider::HubSpot => "hubspot",
            Provider::Lemlist => "lemlist",
            Provider::Zapier => "zapier",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::HubSpot => "HubSpot",
            Provider::Lemlist => "Lemlist",
            Provider::Zapier => "Zapier",
        }
    }

    /// Zapier only receives exported contacts; it has no contact list to pull from.
    pub fn supports_import(&self) -> bool {
        !matches!(self, Provider::Zapier)
    }

    pub fn supports_export(&self) -> bool {
        true
    }

    pub fn import_unsupported_reason(&self) -> Option<String> {
        if self.supports_import() {
            return None;
        }
        Some(format!(
            "{} is export-only: send enriched contacts to {} from a finished job, \
             or import from HubSpot or Lemlist instead",
            self.display_name(),
            self.display_name()
        ))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hubspot" => Ok(Provider::HubSpot),
            "lemlist" => Ok(Provider::Lemlist),
            "zapier" => Ok(Provider::Zapier),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        assert_eq!("HubSpot".parse::<Provider>(), Ok(Provider::HubSpot));
        assert_eq!(" lemlist ".parse::<Provider>(), Ok(Provider::Lemlist));
        assert!("salesforce".parse::<Provider>().is_err());
    }

    #[test]
    fn test_zapier_is_export_only() {
        assert!(!Provider::Zapier.supports_import());
        assert!(Provider::Zapier.supports_export());

        let reason = Provider::Zapier.import_unsupported_reason().unwrap();
        assert!(reason.contains("export-only"));
        assert!(Provider::HubSpot.import_unsupported_reason().is_none());
    }
}
