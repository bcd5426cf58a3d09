//! Executes conversion plans against the encoder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::{ConvertError, Result};
use crate::media::{discard_partial_output, Encoder, MediaCommand, MediaCommandBuilder, StreamProber};
use crate::planner::{extension_of, AudioPlan, Planner};
use crate::policy::PolicyTable;
use crate::subtitle::exists;

/// Per-run conversion switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Plan and log the encoder commands without running them
    pub dry_run: bool,
}

/// Where a converted file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedOutput {
    pub output: PathBuf,
    /// The input was superseded by `output` and belongs in the original tree
    pub consumed_original: bool,
}

impl ConvertedOutput {
    fn unchanged(path: &Path) -> Self {
        Self {
            output: path.to_path_buf(),
            consumed_original: false,
        }
    }

    fn replaced_by(output: PathBuf) -> Self {
        Self {
            output,
            consumed_original: true,
        }
    }
}

pub struct ContainerConverter {
    prober: Arc<dyn StreamProber>,
    encoder: Arc<dyn Encoder>,
    policy: Arc<PolicyTable>,
    commands: MediaCommandBuilder,
}

impl ContainerConverter {
    pub fn new(
        prober: Arc<dyn StreamProber>,
        encoder: Arc<dyn Encoder>,
        policy: Arc<PolicyTable>,
        commands: MediaCommandBuilder,
    ) -> Self {
        Self {
            prober,
            encoder,
            policy,
            commands,
        }
    }

    /// Convert `path` into the video container.
    ///
    /// An input that already is an MP4 is returned untouched. An MP4 that
    /// already exists next to the input is returned without probing or
    /// encoding.
    pub async fn convert_video(&self, path: &Path, options: ConvertOptions) -> Result<ConvertedOutput> {
        let planner = Planner::new(&self.policy);

        if extension_of(path).is_some_and(|e| e == self.policy.video.canonical_extension()) {
            info!("Already a {}: {}", self.policy.video.canonical_extension(), path.display());
            return Ok(ConvertedOutput::unchanged(path));
        }

        let output = planner.video_output(path);
        if exists(&output).await {
            info!("Converted file already exists: {}", output.display());
            return Ok(ConvertedOutput::replaced_by(output));
        }

        let streams = self.prober.probe(path).await?;
        let plan = planner.build_video_plan(path, &streams)?;
        let command = self.commands.convert(path, &plan);
        self.execute(&command, &plan.output, options).await?;

        Ok(ConvertedOutput::replaced_by(plan.output))
    }

    /// Convert `path` into the audio container, or keep it when its audio is
    /// already acceptable as-is.
    pub async fn convert_audio(&self, path: &Path, options: ConvertOptions) -> Result<ConvertedOutput> {
        let planner = Planner::new(&self.policy);

        // an accepted container only needs its codec checked, never a sibling output
        let in_container = extension_of(path).is_some_and(|e| self.policy.audio.accepts_extension(&e));

        let output = planner.audio_output(path);
        if !in_container && exists(&output).await {
            info!("Converted file already exists: {}", output.display());
            return Ok(ConvertedOutput::replaced_by(output));
        }

        let streams = self.prober.probe(path).await?;
        match planner.build_audio_plan(path, &streams)? {
            AudioPlan::AlreadyCanonical => {
                info!("Audio needs no conversion: {}", path.display());
                Ok(ConvertedOutput::unchanged(path))
            }
            AudioPlan::Convert(plan) => {
                let command = self.commands.convert(path, &plan);
                self.execute(&command, &plan.output, options).await?;
                Ok(ConvertedOutput::replaced_by(plan.output))
            }
        }
    }

    async fn execute(&self, command: &MediaCommand, output: &Path, options: ConvertOptions) -> Result<()> {
        if options.dry_run {
            return self.encoder.inspect(command).await;
        }

        if let Err(e) = self.encoder.run(command).await {
            discard_partial_output(output).await;
            return Err(match e {
                ConvertError::EncodeFailed { .. } => e,
                other => ConvertError::EncodeFailed {
                    description: command.description.clone(),
                    output: other.to_string(),
                },
            });
        }

        info!("{} completed: {}", command.description, output.display());
        Ok(())
    }
}
