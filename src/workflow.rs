use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::cli::Input;
use crate::config::Config;
use crate::converter::ConvertOptions;
use crate::dispatcher::{Dispatcher, FileOutcome};
use crate::error::{ConvertError, Result};
use crate::lock::PidLock;
use crate::media::{Encoder, MediaCommandBuilder, MediaToolsFactory, StreamProber};
use crate::policy::PolicyTable;
use crate::routing::{relative_dir, Router, RunOptions};

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub converted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub routing_errors: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Converted(_) => self.converted += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Batch orchestrator: holds the run lock, feeds files to the dispatcher one
/// at a time, and routes the results.
pub struct Workflow {
    dispatcher: Dispatcher,
    prober: Arc<dyn StreamProber>,
    encoder: Arc<dyn Encoder>,
    pid_file: PathBuf,
    options: RunOptions,
}

impl Workflow {
    /// Workflow backed by ffmpeg/ffprobe as configured
    pub fn new(config: &Config, dry_run: bool) -> Self {
        Self::with_tools(
            MediaToolsFactory::create_prober(&config.media),
            MediaToolsFactory::create_encoder(&config.media),
            config,
            RunOptions::from_paths(&config.paths, dry_run),
        )
    }

    pub fn with_tools(
        prober: Arc<dyn StreamProber>,
        encoder: Arc<dyn Encoder>,
        config: &Config,
        options: RunOptions,
    ) -> Self {
        let policy: Arc<PolicyTable> = Arc::new(config.policy.clone());
        let commands = MediaCommandBuilder::new(&config.media.ffmpeg_path);

        Self {
            dispatcher: Dispatcher::new(prober.clone(), encoder.clone(), policy, commands),
            prober,
            encoder,
            pid_file: config.paths.pid_file.clone(),
            options,
        }
    }

    /// Fail early when the encoder binary cannot be run
    pub async fn check_tools(&self) -> Result<()> {
        self.encoder.check_availability().await
    }

    pub async fn run(&self, input: &Input) -> Result<RunSummary> {
        match input {
            Input::File(file) => self.run_file(file).await,
            Input::Source(source) => self.run_source(source).await,
        }
    }

    /// Convert every regular file below `source_root`
    pub async fn run_source(&self, source_root: &Path) -> Result<RunSummary> {
        let _lock = PidLock::acquire(&self.pid_file)?;
        info!("Processing directory: {}", source_root.display());

        if !source_root.is_dir() {
            return Err(ConvertError::path_not_found("source directory", source_root));
        }

        // collected up front so files moved or created during the run are not revisited
        let files = collect_files(source_root);
        info!("Found {} files to process", files.len());

        let mut summary = RunSummary::default();
        for file in files {
            let relative = relative_dir(source_root, &file);
            self.process_file(&file, &relative, &mut summary).await;
        }

        log_summary(&summary);
        Ok(summary)
    }

    /// Convert a single file; routed files land directly under the roots
    pub async fn run_file(&self, file: &Path) -> Result<RunSummary> {
        let _lock = PidLock::acquire(&self.pid_file)?;
        info!("Processing single file: {}", file.display());

        if !file.is_file() {
            return Err(ConvertError::path_not_found("file", file));
        }

        let mut summary = RunSummary::default();
        self.process_file(file, Path::new(""), &mut summary).await;

        log_summary(&summary);
        Ok(summary)
    }

    async fn process_file(&self, file: &Path, relative: &Path, summary: &mut RunSummary) {
        // an earlier file may have claimed this one as its output and routed it
        if !fs::try_exists(file).await.unwrap_or(false) {
            debug!("Already routed, skipping: {}", file.display());
            return;
        }

        let convert_options = ConvertOptions {
            dry_run: self.options.dry_run,
        };

        let outcome = self.dispatcher.convert(file, convert_options).await;
        self.prober.forget();
        summary.record(&outcome);

        let result = outcome.into_result();
        if let Err(e) = Router::new(&self.options).route(relative, &result).await {
            error!("Failed to route results of {}: {}", file.display(), e);
            summary.routing_errors += 1;
        }
    }
}

fn collect_files(source_root: &Path) -> Vec<PathBuf> {
    WalkDir::new(source_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn log_summary(summary: &RunSummary) {
    info!(
        "Run finished: {} converted, {} failed, {} skipped, {} routing errors",
        summary.converted, summary.failed, summary.skipped, summary.routing_errors
    );
}
