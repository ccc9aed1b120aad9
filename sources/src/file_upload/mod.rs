use crate::SourceAdapter;
use shared_types::{PendingContactBatch, UploadFile, ValidationError, MAX_UPLOAD_BYTES};
use std::fs;
use std::path::Path;

const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "xls", "xlsx"];

/// Content types browsers and OSes report for the allowed spreadsheets.
/// `application/octet-stream` shows up for .xls on some platforms.
const ALLOWED_MIME_TYPES: [&str; 6] = [
    "text/csv",
    "application/csv",
    "text/plain",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/octet-stream",
];

/// Checks a picked spreadsheet before it is handed to the upload endpoint.
/// Parsing happens server-side; only name, type and size are looked at here.
pub struct FileAdapter {
    max_bytes: u64,
}

impl FileAdapter {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn with_defaults() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn validate(&self, file: &UploadFile) -> Result<(), ValidationError> {
        let extension = Path::new(&file.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Err(ValidationError::UnsupportedFileType {
                    filename: file.file_name.clone(),
                })
            }
        }

        if let Some(mime) = &file.mime_type {
            let essence = mime
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if !essence.is_empty() && !ALLOWED_MIME_TYPES.contains(&essence.as_str()) {
                return Err(ValidationError::UnsupportedMimeType { mime: mime.clone() });
            }
        }

        if file.size_bytes == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if file.size_bytes > self.max_bytes {
            return Err(ValidationError::FileTooLarge {
                size: file.size_bytes,
                max: self.max_bytes,
            });
        }

        Ok(())
    }

    /// Builds the upload reference for a file on disk.
    pub fn produce_path(&self, path: &Path) -> Result<PendingContactBatch, ValidationError> {
        let metadata = fs::metadata(path)
            .map_err(|e| ValidationError::Unreadable(format!("{}: {}", path.display(), e)))?;

        if !metadata.is_file() {
            return Err(ValidationError::Unreadable(format!(
                "{} is not a file",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.produce(UploadFile {
            path: path.to_path_buf(),
            mime_type: guess_mime_type(&file_name).map(str::to_string),
            file_name,
            size_bytes: metadata.len(),
        })
    }
}

impl Default for FileAdapter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SourceAdapter for FileAdapter {
    type Input = UploadFile;

    fn produce(&self, file: UploadFile) -> Result<PendingContactBatch, ValidationError> {
        self.validate(&file)?;
        Ok(PendingContactBatch::from_file(file))
    }
}

/// MIME type sent with the multipart upload, derived from the extension.
pub fn guess_mime_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some("text/csv"),
        "xls" => Some("application/vnd.ms-excel"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::SourceKind;
    use std::io::Write;
    use std::path::PathBuf;

    fn upload(name: &str, size: u64) -> UploadFile {
        UploadFile {
            path: PathBuf::from(name),
            file_name: name.to_string(),
            size_bytes: size,
            mime_type: None,
        }
    }

    #[test]
    fn test_accepts_allowed_extensions() {
        let adapter = FileAdapter::with_defaults();

        for name in ["leads.csv", "leads.xls", "LEADS.XLSX"] {
            let batch = adapter.produce(upload(name, 1024)).unwrap();
            assert_eq!(batch.source_kind(), SourceKind::File);
            assert_eq!(batch.label(), name);
        }
    }

    #[test]
    fn test_rejects_other_extensions() {
        let adapter = FileAdapter::with_defaults();

        for name in ["leads.pdf", "leads", "leads.csv.exe"] {
            assert!(matches!(
                adapter.produce(upload(name, 1024)),
                Err(ValidationError::UnsupportedFileType { .. })
            ));
        }
    }

    #[test]
    fn test_size_ceiling() {
        let adapter = FileAdapter::with_defaults();

        assert!(adapter.produce(upload("leads.csv", MAX_UPLOAD_BYTES)).is_ok());
        assert_eq!(
            adapter.produce(upload("leads.csv", MAX_UPLOAD_BYTES + 1)),
            Err(ValidationError::FileTooLarge {
                size: MAX_UPLOAD_BYTES + 1,
                max: MAX_UPLOAD_BYTES,
            })
        );
        assert_eq!(
            adapter.produce(upload("leads.csv", 0)),
            Err(ValidationError::EmptyFile)
        );
    }

    #[test]
    fn test_rejects_mismatched_mime() {
        let adapter = FileAdapter::with_defaults();
        let mut file = upload("leads.csv", 10);
        file.mime_type = Some("image/png".to_string());

        assert!(matches!(
            adapter.produce(file),
            Err(ValidationError::UnsupportedMimeType { .. })
        ));

        let mut file = upload("leads.csv", 10);
        file.mime_type = Some("text/csv; charset=utf-8".to_string());
        assert!(adapter.produce(file).is_ok());
    }

    #[test]
    fn test_produce_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"first_name,last_name,company\nJohn,Doe,Acme\n")
            .unwrap();

        let batch = FileAdapter::with_defaults().produce_path(&path).unwrap();
        match batch.payload() {
            shared_types::BatchPayload::File(upload) => {
                assert_eq!(upload.file_name, "contacts.csv");
                assert_eq!(upload.size_bytes, 43);
                assert_eq!(upload.mime_type.as_deref(), Some("text/csv"));
            }
            other => panic!("Expected file payload, got {:?}", other),
        }
    }

    #[test]
    fn test_produce_path_missing_file() {
        let result = FileAdapter::with_defaults().produce_path(Path::new("/nonexistent/leads.csv"));
        assert!(matches!(result, Err(ValidationError::Unreadable(_))));
    }
}
