//! Rendering service boundary

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::error::DomainError;

/// A source file handed to the renderer
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub mime_type: String,
    pub content: Bytes,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, content: Bytes) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            content,
        }
    }
}

/// One rendered page image as returned by the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPayload {
    pub filename: String,
    pub content_base64: String,
}

impl RenderedPayload {
    pub fn new(filename: impl Into<String>, content_base64: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content_base64: content_base64.into(),
        }
    }
}

/// Splits a multi-page source into page images
#[async_trait]
pub trait RenderService: Send + Sync + Debug {
    /// Renders every page; an empty list means nothing could be rendered
    async fn render(&self, source: &SourceDocument) -> Result<Vec<RenderedPayload>, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::collections::HashMap;
    use std::sync::RwLock;

    use crate::domain::rendering::page_name::{file_stem, page_file_name};

    /// Renders a configured number of pages per filename
    #[derive(Debug, Default)]
    pub struct MockRenderService {
        pages: RwLock<HashMap<String, u32>>,
        failures: RwLock<HashMap<String, String>>,
        default_pages: u32,
    }

    impl MockRenderService {
        pub fn new() -> Self {
            Self {
                default_pages: 1,
                ..Default::default()
            }
        }

        pub fn with_pages(self, filename: &str, count: u32) -> Self {
            self.pages
                .write()
                .unwrap()
                .insert(filename.to_string(), count);
            self
        }

        pub fn with_failure(self, filename: &str, error: &str) -> Self {
            self.failures
                .write()
                .unwrap()
                .insert(filename.to_string(), error.to_string());
            self
        }
    }

    #[async_trait]
    impl RenderService for MockRenderService {
        async fn render(
            &self,
            source: &SourceDocument,
        ) -> Result<Vec<RenderedPayload>, DomainError> {
            if let Some(error) = self.failures.read().unwrap().get(&source.filename) {
                return Err(DomainError::external_service("renderer", error.clone()));
            }

            let count = self
                .pages
                .read()
                .unwrap()
                .get(&source.filename)
                .copied()
                .unwrap_or(self.default_pages);

            Ok((1..=count)
                .map(|n| {
                    RenderedPayload::new(
                        page_file_name(file_stem(&source.filename), n, "png"),
                        STANDARD.encode(format!("page {}", n)),
                    )
                })
                .collect())
        }
    }
}
