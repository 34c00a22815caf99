/// Default period of the fast tick that detects newly completed units.
pub const DEFAULT_FAST_TICK_SECS: u64 = 15;

/// Default period of the slow tick that refreshes progress displays.
pub const DEFAULT_SLOW_TICK_SECS: u64 = 60;

/// Default time to produce one output unit. Uniform across jobs; the pure
/// layer takes it as a parameter so a per-job override stays cheap.
pub const DEFAULT_CYCLE_DURATION_SECS: u64 = 300;

/// Stand-in expected output for job records that arrive with zero. Keeps the
/// percent math total instead of dividing by zero.
pub const DEFAULT_EXPECTED_OUTPUT: u32 = 100;

/// How many recent completion events the board keeps for display.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Config file the demo binary looks for when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "batchwatch.toml";

/// Log file the demo binary writes to.
pub const LOG_FILE: &str = "batchwatch.log";
