use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::media::{discard_partial_output, Encoder, MediaCommandBuilder, StreamProber};
use crate::planner::derived_path;
use crate::policy::PolicyTable;
use super::{select_subtitle_stream, SubtitleOutcome, SubtitleSkip};

pub const SUBRIP_EXTENSION: &str = "srt";
pub const WEBVTT_EXTENSION: &str = "vtt";

/// Derives `.srt` and `.vtt` side files. Every step is idempotent: an
/// existing target is returned without probing or encoding.
pub struct SubtitleExtractor {
    prober: Arc<dyn StreamProber>,
    encoder: Arc<dyn Encoder>,
    policy: Arc<PolicyTable>,
    commands: MediaCommandBuilder,
}

impl SubtitleExtractor {
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

    /// Remux the selected subtitle track of `path` into a SubRip file
    pub async fn extract_subtitle_track(&self, path: &Path) -> SubtitleOutcome {
        let srt_path = derived_path(path, SUBRIP_EXTENSION);
        if exists(&srt_path).await {
            info!("Subtitle file already exists: {}", srt_path.display());
            return SubtitleOutcome::Extracted(srt_path);
        }

        let streams = match self.prober.probe(path).await {
            Ok(streams) => streams,
            Err(e) => return SubtitleOutcome::Failed(e),
        };

        let Some(subtitle) = select_subtitle_stream(&self.policy, &streams) else {
            info!("No usable subtitle stream in {}", path.display());
            return SubtitleOutcome::Unavailable(SubtitleSkip::NoSubtitleStream);
        };

        let command = self
            .commands
            .extract_subtitle(path, subtitle.specifier, &srt_path);
        if let Err(e) = self.encoder.run(&command).await {
            discard_partial_output(&srt_path).await;
            warn!("Subtitle extraction failed for {}: {}", path.display(), e);
            return SubtitleOutcome::Failed(e);
        }

        // some tracks remux to an empty file
        match is_blank(&srt_path).await {
            Ok(false) => {
                info!("Extracted subtitles to {}", srt_path.display());
                SubtitleOutcome::Extracted(srt_path)
            }
            Ok(true) => {
                warn!("Extracted subtitle file is empty, removing {}", srt_path.display());
                if let Err(e) = fs::remove_file(&srt_path).await {
                    return SubtitleOutcome::Failed(e.into());
                }
                SubtitleOutcome::Unavailable(SubtitleSkip::EmptyTrack)
            }
            Err(e) => SubtitleOutcome::Failed(e.into()),
        }
    }

    /// Convert the first subtitle stream of `srt_path` to WebVTT
    pub async fn convert_to_caption_format(&self, srt_path: &Path) -> SubtitleOutcome {
        let vtt_path = derived_path(srt_path, WEBVTT_EXTENSION);
        if exists(&vtt_path).await {
            info!("Caption file already exists: {}", vtt_path.display());
            return SubtitleOutcome::Extracted(vtt_path);
        }

        let command = self.commands.caption(srt_path, &vtt_path);
        match self.encoder.run(&command).await {
            Ok(_) => {
                info!("Converted captions to {}", vtt_path.display());
                SubtitleOutcome::Extracted(vtt_path)
            }
            Err(e) => {
                discard_partial_output(&vtt_path).await;
                warn!("Caption conversion failed for {}: {}", srt_path.display(), e);
                SubtitleOutcome::Failed(e)
            }
        }
    }
}

pub(crate) async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

async fn is_blank(path: &Path) -> std::io::Result<bool> {
    let bytes = fs::read(path).await?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text
        .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use crate::media::{
        MediaCommand, MockEncoder, MockStreamProber, StreamDescriptor, StreamKind, StreamSpecifier,
    };
    use tempfile::TempDir;

    fn subtitle_streams() -> Vec<StreamDescriptor> {
        vec![StreamDescriptor {
            kind: StreamKind::Subtitle,
            codec_name: "mov_text".to_string(),
            language: Some("eng".to_string()),
            specifier: StreamSpecifier::new(StreamKind::Subtitle, 0),
            bit_rate: None,
            max_bit_rate: None,
        }]
    }

    fn write_output(command: &MediaCommand, content: &str) {
        let output = command.args.last().expect("command has an output");
        std::fs::write(output, content).expect("write fake output");
    }

    fn extractor(prober: MockStreamProber, encoder: MockEncoder) -> SubtitleExtractor {
        SubtitleExtractor::new(
            Arc::new(prober),
            Arc::new(encoder),
            Arc::new(PolicyTable::default()),
            MediaCommandBuilder::new("ffmpeg"),
        )
    }

    #[tokio::test]
    async fn test_extracts_subtitle_track() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("clip.mp4");

        let mut prober = MockStreamProber::new();
        prober.expect_probe().returning(|_| Ok(subtitle_streams()));
        let mut encoder = MockEncoder::new();
        encoder.expect_run().times(1).returning(|cmd| {
            write_output(cmd, "1\n00:00:01,000 --> 00:00:02,000\nHello\n");
            Ok(String::new())
        });

        let outcome = extractor(prober, encoder).extract_subtitle_track(&video).await;
        assert_eq!(outcome.path(), Some(dir.path().join("clip.srt").as_path()));
    }

    #[tokio::test]
    async fn test_blank_extraction_is_discarded() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("clip.mp4");

        let mut prober = MockStreamProber::new();
        prober.expect_probe().returning(|_| Ok(subtitle_streams()));
        let mut encoder = MockEncoder::new();
        encoder.expect_run().returning(|cmd| {
            write_output(cmd, " \n\t\n");
            Ok(String::new())
        });

        let outcome = extractor(prober, encoder).extract_subtitle_track(&video).await;
        assert!(matches!(
            outcome,
            SubtitleOutcome::Unavailable(SubtitleSkip::EmptyTrack)
        ));
        assert!(!dir.path().join("clip.srt").exists());
    }

    #[tokio::test]
    async fn test_failed_extraction_removes_partial_srt() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("clip.mp4");

        let mut prober = MockStreamProber::new();
        prober.expect_probe().returning(|_| Ok(subtitle_streams()));
        let mut encoder = MockEncoder::new();
        encoder.expect_run().times(1).returning(|cmd| {
            write_output(cmd, "1\n00:00:01,000 --> ");
            Err(ConvertError::EncodeFailed {
                description: cmd.description.clone(),
                output: "Error while decoding stream".to_string(),
            })
        });

        let outcome = extractor(prober, encoder).extract_subtitle_track(&video).await;
        assert!(matches!(outcome, SubtitleOutcome::Failed(_)));
        assert!(!dir.path().join("clip.srt").exists());
    }

    #[tokio::test]
    async fn test_existing_srt_skips_probe_and_encoder() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(dir.path().join("clip.srt"), "existing").unwrap();

        let mut prober = MockStreamProber::new();
        prober.expect_probe().times(0);
        let mut encoder = MockEncoder::new();
        encoder.expect_run().times(0);

        let outcome = extractor(prober, encoder).extract_subtitle_track(&video).await;
        assert!(outcome.path().is_some());
    }

    #[tokio::test]
    async fn test_no_subtitle_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let mut prober = MockStreamProber::new();
        prober.expect_probe().returning(|_| Ok(Vec::new()));
        let mut encoder = MockEncoder::new();
        encoder.expect_run().times(0);

        let outcome = extractor(prober, encoder)
            .extract_subtitle_track(&dir.path().join("clip.mp4"))
            .await;
        assert!(matches!(
            outcome,
            SubtitleOutcome::Unavailable(SubtitleSkip::NoSubtitleStream)
        ));
    }

    #[tokio::test]
    async fn test_failed_caption_conversion_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let srt = dir.path().join("clip.srt");
        std::fs::write(&srt, "1\n").unwrap();

        let prober = MockStreamProber::new();
        let mut encoder = MockEncoder::new();
        encoder.expect_run().returning(|cmd| {
            write_output(cmd, "WEBVTT\n\n00:00.000 -->");
            Err(ConvertError::EncodeFailed {
                description: cmd.description.clone(),
                output: "boom".to_string(),
            })
        });

        let outcome = extractor(prober, encoder).convert_to_caption_format(&srt).await;
        assert!(matches!(outcome, SubtitleOutcome::Failed(_)));
        assert!(!dir.path().join("clip.vtt").exists());
    }
}
