use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::error::{ConvertError, Result};
use super::{Encoder, MediaCommand, MediaCommandBuilder};

/// Encoder backed by the ffmpeg binary
pub struct FfmpegEncoder {
    command_builder: MediaCommandBuilder,
}

impl FfmpegEncoder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(binary_path),
        }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn run(&self, command: &MediaCommand) -> Result<String> {
        info!("{}: {}", command.description, command.command_line());

        match command.execute().await {
            Ok(output) => {
                debug!("---\n{}\n---", output.trim_end());
                Ok(output)
            }
            Err(e) => {
                error!("Command failed: {}\n---\n{}\n---", command.command_line(), e);
                Err(e)
            }
        }
    }

    async fn check_availability(&self) -> Result<()> {
        let output = self.command_builder.version_check().execute().await.map_err(|e| {
            ConvertError::Config(format!("Encoder not available: {}", e))
        })?;

        let version = output.lines().next().unwrap_or("unknown version");
        info!("Encoder is available: {}", version);
        Ok(())
    }
}

/// Delete a possibly half-written output after a failed encoder run
pub async fn discard_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => warn!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => error!("Could not remove partial output {}: {}", path.display(), e),
    }
}
