//! File store implementations

mod in_memory;
mod local;

pub use in_memory::InMemoryFileStore;
pub use local::{LocalPageImageStore, LocalSourceFileStore};
