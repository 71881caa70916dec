use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use follow_metrics::config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use follow_metrics::io_status::IOStatsCollector;
use follow_metrics::pipeline::{Pipeline, Task};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// YAML config file; defaults are used when it does not exist.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// The task to be performed.
    #[arg(short, long, value_enum, default_value_t = Task::All)]
    task: Task,

    /// Betweenness worker threads, overriding the config file.
    #[arg(short, long)]
    num_threads: Option<usize>,

    /// Hide progress bars.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

/// Logs to stdout and to a daily rolling file in `log_dir`. The returned guard
/// must stay alive for buffered file output to be flushed.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "follow_metrics.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,follow_metrics=debug")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    guard
}

fn main() -> anyhow::Result<()> {
    let args: Args = Args::parse();

    // Step 1: Load and override the configuration
    let loaded = PipelineConfig::read(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    if let Some(thread_num) = args.num_threads {
        config.metrics.thread_num = thread_num;
    }
    if args.quiet {
        config.show_progress = false;
    }
    config.validate().context("invalid configuration")?;

    let _guard = init_tracing(&config.paths.log_dir);
    tracing::info!("follow-metrics {} task={}", env!("CARGO_PKG_VERSION"), args.task.name());
    if found {
        tracing::info!("Loaded config from {}", args.config.display());
    } else {
        tracing::info!("Config {} not found, using defaults", args.config.display());
    }
    IOStatsCollector::log_support();

    // Step 2. Run the task; fatal errors exit non-zero
    let report = Pipeline::new(config)
        .run(args.task)
        .with_context(|| format!("task {} failed", args.task.name()))?;
    tracing::info!(
        "Run {} complete: {} recoverable failures",
        report.run_id,
        report.failures.len()
    );
    Ok(())
}
