//! Documents, their versions and rendered pages

pub mod entity;
pub mod page;
pub mod repository;
pub mod version;

pub use entity::{Document, DocumentId, DocumentStatus, GroupId};
pub use page::{DocumentPage, PageId};
pub use repository::{DocumentRepository, PageRepository, VersionRepository};
pub use version::{
    DocumentVersion, NewVersion, VersionId, guess_mime_type, next_version_number, sha256_hex,
};

#[cfg(test)]
pub use repository::{MockDocumentRepository, MockPageRepository, MockVersionRepository};
