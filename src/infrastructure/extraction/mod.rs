//! Extraction service clients

mod http;

pub use http::HttpExtractionService;
