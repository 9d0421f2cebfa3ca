//! Rendering of source documents into page images

pub mod page_name;
pub mod provider;

pub use page_name::{file_stem, page_file_name, parse_page_number};
pub use provider::{RenderService, RenderedPayload, SourceDocument};

#[cfg(test)]
pub use provider::mock::MockRenderService;
