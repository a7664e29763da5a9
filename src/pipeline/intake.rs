use std::path::Path;

use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use super::extraction::RawDocument;

const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024; // 100MB

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document is empty")]
    Empty,

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Identity of an accepted document, used for log correlation only.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFingerprint {
    pub filename: String,
    pub size_bytes: u64,
    /// Base64 SHA-256 of the bytes.
    pub content_hash: String,
    /// UUID v5 over the content hash; stable across runs.
    pub document_id: Uuid,
}

/// Read a document from disk without interpreting it.
pub fn read_document(path: &Path) -> Result<RawDocument, IntakeError> {
    let size = std::fs::metadata(path)?.len();
    check_size(size)?;
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string();
    Ok(RawDocument::new(sanitize_filename(&filename), bytes))
}

/// Accept or reject a document before any extraction work.
/// Format is detected from magic bytes, never from the filename.
pub fn validate(doc: &RawDocument) -> Result<DocumentFingerprint, IntakeError> {
    if doc.bytes.is_empty() {
        return Err(IntakeError::Empty);
    }
    let size = doc.bytes.len() as u64;
    check_size(size)?;

    let mime = detect_mime(&doc.bytes);
    if mime != "application/pdf" {
        return Err(IntakeError::UnsupportedFormat(mime.to_string()));
    }

    let content_hash = content_hash(&doc.bytes);
    Ok(DocumentFingerprint {
        filename: sanitize_filename(&doc.filename),
        size_bytes: size,
        document_id: document_id(&content_hash),
        content_hash,
    })
}

fn check_size(size: u64) -> Result<(), IntakeError> {
    if size > MAX_FILE_SIZE {
        return Err(IntakeError::FileTooLarge {
            size_mb: size as f64 / (1024.0 * 1024.0),
            max_mb: MAX_FILE_SIZE / (1024 * 1024),
        });
    }
    Ok(())
}

/// Best-effort MIME type from the leading bytes.
pub fn detect_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x25, 0x50, 0x44, 0x46, ..] => "application/pdf",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => "image/tiff",
        [0x50, 0x4B, 0x03, 0x04, ..] => "application/zip",
        _ if std::str::from_utf8(&bytes[..bytes.len().min(512)]).is_ok() => "text/plain",
        _ => "application/octet-stream",
    }
}

/// SHA-256 content hash, base64 encoded
pub fn content_hash(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

pub fn document_id(content_hash: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, content_hash.as_bytes())
}

/// Strip path components and limit length
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}
