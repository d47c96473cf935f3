// Storage layer for the Campus Notify control-plane
// Decision: Support both PostgreSQL (production) and in-memory (dev mode)
//
// StorageBackend implements the core traits for either backend:
// - NotificationStore: durable notification rows
// - UserDirectory: user existence checks and enumeration

pub mod backend;
pub mod models;
pub mod repositories;

pub use backend::StorageBackend;
pub use models::*;
pub use repositories::Database;
