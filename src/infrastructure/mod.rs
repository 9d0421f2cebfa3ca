//! Infrastructure layer - External service implementations

pub mod events;
pub mod extraction;
pub mod files;
pub mod http_client;
pub mod logging;
pub mod metrics;
pub mod rendering;
pub mod services;
pub mod storage;
pub mod verification;
