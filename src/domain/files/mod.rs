//! Source upload and page image storage

pub mod store;

pub use store::{PageImageStore, SourceFileStore};

#[cfg(test)]
pub use store::{MockPageImageStore, MockSourceFileStore};
