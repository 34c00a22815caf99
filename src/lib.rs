pub mod config;
pub mod constants;
pub mod core;
pub mod err;
pub mod global_var;
pub mod utilities;

// Re-export the pieces external crates and tests reach for most.
pub use crate::core::{
    Collaborators, JobId, JobSource, JobStatus, MemoryJobSource, Notifier, OutputPersister,
    ProductionJob, ProgressBoard, StockCreator, TickDriver,
};
