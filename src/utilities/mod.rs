pub mod logger;
pub use logger::AsyncLogger;
pub use logger::init_file_logger;

mod format;
pub use format::duration_to_human_readable;
