//! Rendering service clients

mod http;

pub use http::HttpRenderService;
