mod config;
pub use config::Config;
pub use config::load_or_default;

mod opts;
pub use opts::Opts;
