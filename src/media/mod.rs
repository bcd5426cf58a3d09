// Media tool abstraction
//
// The conversion engine only talks to the outside world through two traits:
// - StreamProber: turns a file into an ordered list of stream descriptors
// - Encoder: runs (or, in dry-run mode, inspects) a structured encoder command
//
// The ffmpeg/ffprobe implementations live in processor.rs and probe.rs.

pub mod commands;
pub mod probe;
pub mod processor;
pub mod stream;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub use commands::*;
pub use probe::*;
pub use processor::*;
pub use stream::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Reports the streams contained in a media file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamProber: Send + Sync {
    /// Probe streams in emission order
    async fn probe(&self, path: &Path) -> Result<Vec<StreamDescriptor>>;

    /// Drop memoized results once the files probed so far are done with
    fn forget(&self) {}
}

/// Runs encoder commands
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Execute the command, returning its combined output
    async fn run(&self, command: &MediaCommand) -> Result<String>;

    /// Dry-run variant: report what would be executed without touching any file
    async fn inspect(&self, command: &MediaCommand) -> Result<()> {
        info!("[dry-run] {}", command.command_line());
        Ok(())
    }

    /// Check if the encoder is available
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for the default ffmpeg-backed collaborators
pub struct MediaToolsFactory;

impl MediaToolsFactory {
    pub fn create_prober(config: &MediaConfig) -> Arc<dyn StreamProber> {
        Arc::new(FfprobeProber::new(config.ffprobe_path.clone()))
    }

    pub fn create_encoder(config: &MediaConfig) -> Arc<dyn Encoder> {
        Arc::new(FfmpegEncoder::new(config.ffmpeg_path.clone()))
    }
}
