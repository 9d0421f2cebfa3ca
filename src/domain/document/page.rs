//! Rendered document pages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::version::VersionId;
use crate::domain::id::define_id;
use crate::domain::semantic::LayoutField;

define_id!(
    /// Identifier of a rendered page
    PageId,
    "page"
);

/// One rendered page image of a version.
///
/// `page_number` is unique within its version. Only `extracted_layout` may
/// change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub id: PageId,
    pub version_id: VersionId,
    pub page_number: u32,
    pub image_path: String,
    pub extracted_layout: Option<Vec<LayoutField>>,
    pub created_at: DateTime<Utc>,
}

impl DocumentPage {
    pub fn new(version_id: VersionId, page_number: u32, image_path: impl Into<String>) -> Self {
        Self {
            id: PageId::generate(),
            version_id,
            page_number,
            image_path: image_path.into(),
            extracted_layout: None,
            created_at: Utc::now(),
        }
    }
}
