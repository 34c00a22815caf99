use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use batchwatch::config::{Config, Opts, load_or_default};
use batchwatch::constants::{DEFAULT_CONFIG_PATH, LOG_FILE};
use batchwatch::err::Result;
use batchwatch::global_var::LOGGER_CELL;
use batchwatch::utilities::{AsyncLogger, init_file_logger};
use batchwatch::{
    Collaborators, JobId, MemoryJobSource, Notifier, OutputPersister, ProductionJob, StockCreator,
    TickDriver,
};

fn print_version_and_exit() -> ! {
    // These are set by build.rs; fall back to unknown if missing
    let pkg_version = env!("CARGO_PKG_VERSION");
    let commit = option_env!("GIT_COMMIT").unwrap_or("unknown");
    let state = option_env!("GIT_STATE").unwrap_or("unknown");
    let built = option_env!("BUILD_TIME").unwrap_or("unknown time");
    println!(
        "batchwatch {} (commit: {}, state: {}, built: {})",
        pkg_version, commit, state, built
    );
    std::process::exit(0)
}

/// Registers created stock by logging it. A real deployment would call the
/// warehouse system here.
struct LogStockCreator {
    logger: AsyncLogger,
}

#[async_trait]
impl StockCreator for LogStockCreator {
    async fn create_stock(&self, job: &ProductionJob, units: u32) -> Result<()> {
        self.logger.info(format!(
            "Stock +{} for product {} (job {}).",
            units, job.product_code, job.id
        ));
        Ok(())
    }
}

/// Writes cumulative output back into the in-memory job list, so the watcher
/// picks up where it left off across its own restarts within the process.
struct MemoryOutputPersister {
    source: Arc<MemoryJobSource>,
}

#[async_trait]
impl OutputPersister for MemoryOutputPersister {
    async fn persist_actual_output(&self, job_id: JobId, cumulative_units: u32) -> Result<()> {
        self.source.apply_actual_output(job_id, cumulative_units).await;
        Ok(())
    }
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("* {}", message);
    }
}

fn demo_jobs() -> Vec<ProductionJob> {
    let now = Utc::now();
    vec![
        // Started in the past so the very first fast tick has units to report.
        ProductionJob::new(1, "MTR-204", now - Duration::seconds(11 * 60), 10),
        ProductionJob::new(2, "GSK-110", now - Duration::seconds(4 * 60), 8),
        ProductionJob::new(3, "VLV-093", now - Duration::seconds(60), 12),
    ]
}

#[tokio::main]
async fn main() {
    let opts = Opts::from_args();

    if opts.version {
        print_version_and_exit();
    }

    if let Some(path) = &opts.write_config {
        let path = path.to_string_lossy();
        match Config::default().dump(&path) {
            Ok(()) => {
                println!("Wrote default config to {}", path);
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Failed to write config {}: {}", path, e);
                std::process::exit(1);
            }
        }
    }

    if opts.debug {
        // DEBUG_MODE is read once on first use; set it before any logging.
        unsafe {
            std::env::set_var("DEBUG_MODE", "1");
        }
    }

    let (logger, logger_task) = match init_file_logger(LOG_FILE).await {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Failed to initialize logger: {}", e);
            std::process::exit(1);
        }
    };
    let _ = LOGGER_CELL.set(logger.clone());

    // An explicit --config must load; the default path is only picked up
    // when the file is actually there.
    let config_path = opts
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| {
            Path::new(DEFAULT_CONFIG_PATH)
                .exists()
                .then(|| DEFAULT_CONFIG_PATH.to_string())
        });
    let config = match load_or_default(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let jobs = demo_jobs();
    let job_count = jobs.len();
    let source = Arc::new(MemoryJobSource::new(jobs));
    let collaborators = Collaborators {
        jobs: source.clone(),
        stock: Arc::new(LogStockCreator {
            logger: logger.clone(),
        }),
        output: Arc::new(MemoryOutputPersister {
            source: source.clone(),
        }),
        notifier: Arc::new(ConsoleNotifier),
    };

    let driver = TickDriver::spawn(&config, collaborators).await;
    println!(
        "batchwatch session {:x} watching {} demo job(s); log file {}. Ctrl-C to stop.",
        driver.session_id(),
        job_count,
        LOG_FILE
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        logger.error(format!("Failed to listen for the shutdown signal: {}", e));
    }
    driver.dispose().await;

    logger.shutdown().await;
    let _ = logger_task.await;
}
