pub mod board;
pub mod collaborators;
pub mod completion;
pub mod driver;
pub mod job;
pub mod next_unit;
pub mod progress;

pub use board::ProgressBoard;
pub use collaborators::{
    Collaborators, JobSource, MemoryJobSource, Notifier, OutputPersister, StockCreator,
};
pub use completion::{CompletionEvent, CompletionLedger};
pub use driver::TickDriver;
pub use job::{JobId, JobStatus, ProductionJob};
pub use next_unit::{NextCompletion, select_next_completion};
pub use progress::{ProgressSnapshot, compute_progress};
