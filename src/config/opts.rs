use std::path::PathBuf;
use structopt::StructOpt;
use structopt::clap::ErrorKind;

/// Command-line options for the demo floor runner.
///
/// Examples:
/// - Run with a specific config file:
///   cargo run -- --config batchwatch.toml
/// - Write a starter config and exit:
///   cargo run -- --write-config batchwatch.toml
///
/// Note: When invoking via `cargo run`, always place `--` before program
/// arguments so Cargo stops parsing its own flags.
#[derive(StructOpt, Debug)]
pub struct Opts {
    #[structopt(short = "v", long = "version")]
    pub version: bool,

    #[structopt(short, long, help = "Enable debug mode (verbose logging)")]
    pub debug: bool,

    #[structopt(
        short = "c",
        long = "config",
        help = "Path to the configuration file. Defaults apply when omitted."
    )]
    pub config: Option<PathBuf>,

    #[structopt(
        long = "write-config",
        help = "Write a config file with default values to the given path and exit."
    )]
    pub write_config: Option<PathBuf>,
}

impl Opts {
    /// Parse CLI arguments. If parsing fails, print the error and the full help, then exit.
    pub fn from_args() -> Self {
        let app = Opts::clap();
        match app.get_matches_safe() {
            Ok(m) => Opts::from_clap(&m),
            Err(e) => {
                let kind = e.kind; // capture before we move/print
                eprintln!("{}", e);
                let mut app = Opts::clap();
                eprintln!();
                let _ = app.print_long_help();
                eprintln!();
                std::process::exit(match kind {
                    ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => 0,
                    _ => 2,
                });
            }
        }
    }
}
