use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::models::sanitize_document_name;

/// Hard ceiling on attachment size (4 MiB).
pub const MAX_DOCUMENT_BYTES: u64 = 4 * 1024 * 1024;

/// The document formats accepted as attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    #[default]
    Pdf,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
        }
    }

    /// Whether a filename carries an accepted extension.
    pub fn matches_extension(name: &str) -> bool {
        let lower = name.to_lowercase();
        lower.ends_with(".pdf")
    }
}

/// A document embedded in a turn.
///
/// `name` is the sanitized identifier sent to the inference API; the original
/// filename is kept separately for display. Bytes are stored base64-encoded
/// and decoded back to raw bytes when a request is serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAttachment {
    name: String,
    display_name: String,
    format: DocumentFormat,
    data: String,
}

impl DocumentAttachment {
    pub fn from_bytes(display_name: &str, bytes: &[u8]) -> Result<Self, DomainError> {
        if !DocumentFormat::matches_extension(display_name) {
            return Err(DomainError::invalid_attachment(format!(
                "only PDF files are accepted, got '{display_name}'"
            )));
        }
        if bytes.len() as u64 > MAX_DOCUMENT_BYTES {
            return Err(DomainError::invalid_attachment(format!(
                "'{display_name}' exceeds the {} MiB limit",
                MAX_DOCUMENT_BYTES / (1024 * 1024)
            )));
        }

        Ok(Self {
            name: sanitize_document_name(display_name),
            display_name: display_name.to_string(),
            format: DocumentFormat::Pdf,
            data: BASE64.encode(bytes),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// The stored base64 representation.
    pub fn encoded_data(&self) -> &str {
        &self.data
    }

    /// Decodes the stored representation back to the original raw bytes.
    pub fn decoded_bytes(&self) -> Result<Vec<u8>, DomainError> {
        BASE64
            .decode(&self.data)
            .map_err(|e| DomainError::internal(format!("stored document data is corrupt: {e}")))
    }
}

/// A document the user has selected but not yet submitted.
///
/// Validation happens at selection time so a bad pick is rejected before it
/// can touch the conversation. The bytes themselves are read at submit.
#[derive(Debug, Clone)]
pub struct PendingAttachment {
    path: PathBuf,
    display_name: String,
    size_bytes: u64,
}

impl PendingAttachment {
    pub fn select(path: &Path) -> Result<Self, DomainError> {
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DomainError::invalid_attachment(format!("not a usable file path: {}", path.display()))
            })?
            .to_string();

        if !DocumentFormat::matches_extension(&display_name) {
            return Err(DomainError::invalid_attachment(format!(
                "only PDF files are accepted, got '{display_name}'"
            )));
        }

        let metadata = std::fs::metadata(path).map_err(|e| {
            DomainError::invalid_attachment(format!("cannot access {}: {e}", path.display()))
        })?;
        if metadata.len() > MAX_DOCUMENT_BYTES {
            return Err(DomainError::invalid_attachment(format!(
                "'{display_name}' exceeds the {} MiB limit",
                MAX_DOCUMENT_BYTES / (1024 * 1024)
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            display_name,
            size_bytes: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn summary(&self) -> String {
        format!("{} ({:.1} KiB)", self.display_name, self.size_bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rejects_wrong_extension() {
        let err = DocumentAttachment::from_bytes("notes.txt", b"hello").unwrap_err();
        assert!(err.is_invalid_attachment());
    }

    #[test]
    fn test_rejects_oversize() {
        let bytes = vec![0u8; (MAX_DOCUMENT_BYTES + 1) as usize];
        let err = DocumentAttachment::from_bytes("big.pdf", &bytes).unwrap_err();
        assert!(err.is_invalid_attachment());
    }

    #[test]
    fn test_round_trips_bytes() {
        let bytes = b"%PDF-1.4 fake content \x00\x01\x02";
        let doc = DocumentAttachment::from_bytes("report.pdf", bytes).unwrap();
        assert_eq!(doc.decoded_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_name_is_sanitized_and_display_name_kept() {
        let doc = DocumentAttachment::from_bytes("My Report!.pdf", b"%PDF").unwrap();
        assert_eq!(doc.name(), "My-Report");
        assert_eq!(doc.display_name(), "My Report!.pdf");
        assert_eq!(doc.format(), DocumentFormat::Pdf);
    }

    #[test]
    fn test_select_rejects_non_pdf_path() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"plain text").unwrap();
        let err = PendingAttachment::select(file.path()).unwrap_err();
        assert!(err.is_invalid_attachment());
    }

    #[test]
    fn test_select_rejects_missing_file() {
        let err = PendingAttachment::select(Path::new("/nonexistent/report.pdf")).unwrap_err();
        assert!(err.is_invalid_attachment());
    }

    #[test]
    fn test_select_accepts_small_pdf() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.4").unwrap();
        let pending = PendingAttachment::select(file.path()).unwrap();
        assert!(pending.display_name().ends_with(".pdf"));
        assert_eq!(pending.size_bytes(), 8);
    }
}
