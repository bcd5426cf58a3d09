//! convert-media - Batch Media Normalizer
//!
//! Entry point: parses the command line, loads and validates configuration,
//! sets up logging, and runs one conversion batch under the pid lock.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use convert_media::cli::Args;
use convert_media::config::Config;
use convert_media::error::ConvertError;
use convert_media::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration; command-line options win
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => Config::default(),
    };
    config.apply_args(&args);

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }
    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    // Check all the options before anything touches the disk
    let input = args.input()?;
    config.validate()?;

    // Held until main returns so the log file is flushed on every exit path
    let _log_guard = setup_logging(&config.paths.log_dir, args.verbose)?;
    info!("Starting convert-media");
    if args.dry_run {
        info!("Dry run: no file will be written, moved, or removed");
    }

    let workflow = Workflow::new(&config, args.dry_run);
    workflow.check_tools().await?;

    // Dropping the run future on interrupt releases the lock and kills the
    // running encoder
    let summary = tokio::select! {
        result = workflow.run(&input) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping");
            return Err(ConvertError::Interrupted.into());
        }
    };

    info!(
        "convert-media completed: {} converted, {} failed, {} skipped",
        summary.converted, summary.failed, summary.skipped
    );
    Ok(())
}

/// Setup logging to both console and a per-run file in `log_dir`
fn setup_logging(log_dir: &Path, verbose: bool) -> Result<WorkerGuard> {
    let run_id = Uuid::new_v4().simple().to_string();
    let file_name = format!(
        "{}_{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
        &run_id[..8]
    );

    let file_appender = rolling::never(log_dir, &file_name);
    let (non_blocking_file, guard) = non_blocking(file_appender);

    // Determine log level
    let log_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };

    // Create console layer
    let console_layer = fmt::layer().with_target(false);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    tracing_subscriber::registry()
        .with(log_filter(
            log_level,
            &std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default(),
        ))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - level: {}, file: {}",
        log_level,
        log_dir.join(&file_name).display()
    );

    Ok(guard)
}

/// `RUST_LOG` directives win; `default_level` applies when they are absent
fn log_filter(default_level: LevelFilter, directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse_lossy(directives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_default_level() {
        assert_eq!(log_filter(LevelFilter::INFO, "warn").max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(log_filter(LevelFilter::DEBUG, "").max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
