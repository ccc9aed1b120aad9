use csv::{ReaderBuilder, Trim};
use shared_types::ValidationError;
use std::collections::HashMap;

/// Row parsed from pasted CSV, keyed by normalized header name
pub type CsvRow = HashMap<String, String>;

pub struct CsvParser {
    delimiter: u8,
}

impl CsvParser {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Tab separated input, as produced by copying cells out of a spreadsheet.
    pub fn tab_separated() -> Self {
        Self { delimiter: b'\t' }
    }

    /// Guesses the delimiter from the header line.
    pub fn sniff(content: &[u8]) -> Self {
        let header = content.split(|b| *b == b'\n').next().unwrap_or_default();
        let tabs = header.iter().filter(|b| **b == b'\t').count();
        let commas = header.iter().filter(|b| **b == b',').count();

        if tabs > commas {
            Self::tab_separated()
        } else {
            Self::new()
        }
    }

    /// Parses rows into header-keyed maps. Rows that fail to parse are
    /// returned separately with their 1-based line number (the header is line 1).
    pub fn parse_to_maps(
        &self,
        content: &[u8],
    ) -> Result<(Vec<(usize, CsvRow)>, Vec<ValidationError>), ValidationError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ValidationError::Csv {
                row: 1,
                message: e.to_string(),
            })?
            .iter()
            .map(normalize_header)
            .collect();

        let mut records = Vec::new();
        let mut errors = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let row = index + 2;
            match result {
                Ok(record) => {
                    if record.iter().all(|field| field.is_empty()) {
                        continue;
                    }
                    let mut map = HashMap::new();
                    for (i, field) in record.iter().enumerate() {
                        if let Some(header) = headers.get(i) {
                            map.insert(header.clone(), field.to_string());
                        }
                    }
                    records.push((row, map));
                }
                Err(e) => errors.push(ValidationError::Csv {
                    row,
                    message: e.to_string(),
                }),
            }
        }

        Ok((records, errors))
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

/// "First Name", "first_name" and "FIRST-NAME" all become "first_name".
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_ascii_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
