//! Document versions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::entity::DocumentId;
use crate::domain::id::define_id;

define_id!(
    /// Identifier of an uploaded document revision
    VersionId,
    "ver"
);

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// An immutable uploaded revision of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: VersionId,
    pub document_id: DocumentId,
    /// Starts at 1 and increases by one per document
    pub version_number: u32,
    pub filename: String,
    pub filepath: String,
    pub mime_type: String,
    pub file_size: u64,
    pub checksum_sha256: Option<String>,
    pub is_current: bool,
    pub uploaded_by: String,
    pub comment: Option<String>,
    pub page_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Data for a version about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub filename: String,
    pub filepath: String,
    pub mime_type: String,
    pub file_size: u64,
    pub checksum_sha256: Option<String>,
    pub uploaded_by: String,
    pub comment: Option<String>,
}

impl NewVersion {
    pub fn new(
        filename: impl Into<String>,
        filepath: impl Into<String>,
        uploaded_by: impl Into<String>,
    ) -> Self {
        let filename = filename.into();
        let mime_type = guess_mime_type(&filename);
        Self {
            filename,
            filepath: filepath.into(),
            mime_type,
            file_size: 0,
            checksum_sha256: None,
            uploaded_by: uploaded_by.into(),
            comment: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    /// Records size and checksum of the uploaded bytes
    pub fn with_content(mut self, content: &[u8]) -> Self {
        self.file_size = content.len() as u64;
        self.checksum_sha256 = Some(sha256_hex(content));
        self
    }

    /// Materializes the version with its assigned number
    pub fn into_version(self, document_id: DocumentId, version_number: u32) -> DocumentVersion {
        DocumentVersion {
            id: VersionId::generate(),
            document_id,
            version_number,
            filename: self.filename,
            filepath: self.filepath,
            mime_type: self.mime_type,
            file_size: self.file_size,
            checksum_sha256: self.checksum_sha256,
            is_current: true,
            uploaded_by: self.uploaded_by,
            comment: self.comment,
            page_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// Next version number given the highest existing one
pub fn next_version_number(max_existing: Option<u32>) -> u32 {
    max_existing.map_or(1, |n| n + 1)
}

pub fn guess_mime_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
