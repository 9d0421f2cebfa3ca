//! Verification authority clients

mod http;

pub use http::HttpVerificationService;
