//! Per-file state machine: probe, classify, convert, extract subtitles.
//!
//! Every error raised while handling one file stops here and turns the file
//! into a `Failed` outcome, so one bad file never aborts a batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::converter::{ContainerConverter, ConvertOptions, ConvertedOutput};
use crate::error::{ConvertError, Result};
use crate::media::{Encoder, MediaCommandBuilder, StreamDescriptor, StreamProber};
use crate::policy::PolicyTable;
use crate::subtitle::{SubtitleExtractor, SubtitleOutcome};

/// Files produced or consumed by one conversion, grouped by destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionResult {
    pub converted: Vec<PathBuf>,
    pub original: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl ConversionResult {
    pub fn failed(path: &Path) -> Self {
        Self {
            failed: vec![path.to_path_buf()],
            ..Self::default()
        }
    }

    fn from_output(input: &Path, output: ConvertedOutput) -> Self {
        let mut result = Self {
            converted: vec![output.output],
            ..Self::default()
        };
        if output.consumed_original {
            result.original.push(input.to_path_buf());
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.converted.is_empty() && self.original.is_empty() && self.failed.is_empty()
    }
}

/// How a file was classified after probing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Video,
    Audio,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a usable video nor a usable audio stream
    NoUsableStream,
}

/// Outcome of dispatching one file
#[derive(Debug)]
pub enum FileOutcome {
    Converted(ConversionResult),
    Skipped { path: PathBuf, reason: SkipReason },
    Failed { path: PathBuf, error: ConvertError },
}

impl FileOutcome {
    /// Flatten into the routing sets. Skipped files appear in none of them.
    pub fn into_result(self) -> ConversionResult {
        match self {
            FileOutcome::Converted(result) => result,
            FileOutcome::Skipped { .. } => ConversionResult::default(),
            FileOutcome::Failed { path, .. } => ConversionResult::failed(&path),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FileOutcome::Skipped { .. })
    }
}

pub struct Dispatcher {
    prober: Arc<dyn StreamProber>,
    policy: Arc<PolicyTable>,
    converter: ContainerConverter,
    extractor: SubtitleExtractor,
}

impl Dispatcher {
    pub fn new(
        prober: Arc<dyn StreamProber>,
        encoder: Arc<dyn Encoder>,
        policy: Arc<PolicyTable>,
        commands: MediaCommandBuilder,
    ) -> Self {
        let converter = ContainerConverter::new(
            prober.clone(),
            encoder.clone(),
            policy.clone(),
            commands.clone(),
        );
        let extractor = SubtitleExtractor::new(prober.clone(), encoder, policy.clone(), commands);

        Self {
            prober,
            policy,
            converter,
            extractor,
        }
    }

    pub fn classify(&self, streams: &[StreamDescriptor]) -> MediaClass {
        if streams.iter().any(|s| self.policy.is_video_stream(s)) {
            MediaClass::Video
        } else if streams.iter().any(|s| self.policy.is_audio_stream(s)) {
            MediaClass::Audio
        } else {
            MediaClass::Unsupported
        }
    }

    /// Convert one file. Never fails: errors become [`FileOutcome::Failed`].
    pub async fn convert(&self, path: &Path, options: ConvertOptions) -> FileOutcome {
        match self.try_convert(path, options).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Exception while processing {}: {:?}: {}",
                    path.display(),
                    e.kind(),
                    e
                );
                FileOutcome::Failed {
                    path: path.to_path_buf(),
                    error: e,
                }
            }
        }
    }

    async fn try_convert(&self, path: &Path, options: ConvertOptions) -> Result<FileOutcome> {
        let streams = self.prober.probe(path).await?;

        match self.classify(&streams) {
            MediaClass::Video => {
                info!("Converting video: {}", path.display());
                let output = self.converter.convert_video(path, options).await?;
                let video = output.output.clone();
                let mut result = ConversionResult::from_output(path, output);

                if !options.dry_run {
                    result.converted.extend(self.extract_subtitles(&video).await);
                }
                Ok(FileOutcome::Converted(result))
            }
            MediaClass::Audio => {
                info!("Converting audio: {}", path.display());
                let output = self.converter.convert_audio(path, options).await?;
                Ok(FileOutcome::Converted(ConversionResult::from_output(path, output)))
            }
            MediaClass::Unsupported => {
                info!("Not video or audio: {}", path.display());
                Ok(FileOutcome::Skipped {
                    path: path.to_path_buf(),
                    reason: SkipReason::NoUsableStream,
                })
            }
        }
    }

    /// SRT then VTT. Failures only cost the side files.
    async fn extract_subtitles(&self, video: &Path) -> Vec<PathBuf> {
        let mut produced = Vec::new();

        let srt = match self.extractor.extract_subtitle_track(video).await {
            SubtitleOutcome::Extracted(srt) => srt,
            SubtitleOutcome::Unavailable(reason) => {
                info!("No subtitles for {}: {:?}", video.display(), reason);
                return produced;
            }
            SubtitleOutcome::Failed(e) => {
                warn!("Subtitle extraction failed for {}: {}", video.display(), e);
                return produced;
            }
        };

        let caption = self.extractor.convert_to_caption_format(&srt).await;
        produced.push(srt);
        if let Some(vtt) = caption.into_path() {
            produced.push(vtt);
        }
        produced
    }
}
