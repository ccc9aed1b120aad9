mod csv_parser;

pub use csv_parser::{normalize_header, CsvParser, CsvRow};

use crate::SourceAdapter;
use shared_types::{ContactDraft, PendingContactBatch, ValidationError};
use uuid::Uuid;

/// Outcome of adding pasted CSV rows. Valid rows are added even when others fail.
#[derive(Debug, Default)]
pub struct CsvImportReport {
    pub added: Vec<Uuid>,
    pub rejected: Vec<ValidationError>,
}

/// Collects contacts typed in one at a time until the user submits the list.
#[derive(Debug, Default)]
pub struct ManualContactAdapter {
    contacts: Vec<ContactDraft>,
}

impl ManualContactAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a contact after checking the mandatory fields. Every missing field
    /// is reported, so the form can highlight all of them at once.
    pub fn add(&mut self, draft: ContactDraft) -> Result<Uuid, Vec<ValidationError>> {
        let draft = draft.normalized();
        draft.validate()?;

        let id = draft.id;
        self.contacts.push(draft);
        Ok(id)
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.contacts.len();
        self.contacts.retain(|c| c.id != id);
        self.contacts.len() != before
    }

    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> &[ContactDraft] {
        &self.contacts
    }

    /// Snapshot of the list as a batch. The list itself is kept, so a
    /// cancelled confirmation does not lose what the user typed; clear it
    /// once the job has been launched.
    pub fn commit(&self) -> Result<PendingContactBatch, ValidationError> {
        PendingContactBatch::manual(self.contacts.clone())
    }

    /// Adds rows pasted from a spreadsheet. Expects `first_name`, `last_name`
    /// and `company` columns; `position`, `location`, `industry`,
    /// `linkedin_url` and `domain` are picked up when present.
    pub fn add_csv(&mut self, content: &[u8]) -> Result<CsvImportReport, ValidationError> {
        let parser = CsvParser::sniff(content);
        let (rows, parse_errors) = parser.parse_to_maps(content)?;

        let mut report = CsvImportReport {
            added: Vec::new(),
            rejected: parse_errors,
        };

        for (row, record) in rows {
            let field = |name: &str| record.get(name).cloned().unwrap_or_default();
            let optional = |name: &str| record.get(name).cloned();

            let mut draft = ContactDraft::new(field("first_name"), field("last_name"), field("company"));
            draft.position = optional("position").or_else(|| optional("title"));
            draft.location = optional("location");
            draft.industry = optional("industry");
            draft.linkedin_url = optional("linkedin_url");
            draft.domain = optional("domain");

            match self.add(draft) {
                Ok(id) => report.added.push(id),
                Err(errors) => {
                    report
                        .rejected
                        .extend(errors.into_iter().map(|e| ValidationError::Csv {
                            row,
                            message: e.to_string(),
                        }))
                }
            }
        }

        Ok(report)
    }
}

impl SourceAdapter for ManualContactAdapter {
    type Input = ();

    fn produce(&self, _input: ()) -> Result<PendingContactBatch, ValidationError> {
        self.commit()
    }
}
