use crate::utilities::AsyncLogger;
use std::sync::{LazyLock, OnceLock};

// Only the logger lives here. Driver state is owned by each TickDriver
// instance so a session can be torn down without leaking into the next one.
pub static LOGGER_CELL: OnceLock<AsyncLogger> = OnceLock::new();
pub(crate) static LOGGER: crate::utilities::logger::Logger = crate::utilities::logger::Logger;

pub static DEBUG_MODE: LazyLock<bool> = LazyLock::new(|| {
    let env_var = std::env::var("DEBUG_MODE").unwrap_or_default();
    env_var == "1" || env_var == "true"
});
