//! Append-only audit trail of document lifecycle actions

pub mod entity;
pub mod repository;

pub use entity::{AuditAction, AuditEntryId, AuditLogEntry};
pub use repository::AuditLogRepository;

#[cfg(test)]
pub use repository::MockAuditLogRepository;
