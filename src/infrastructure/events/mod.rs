//! Event publisher implementations

mod broadcast;

pub use broadcast::BroadcastEventPublisher;
