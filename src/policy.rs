//! Codec policy: which streams are copied, re-encoded, or dropped for each
//! container target.
//!
//! The tables are plain data, loaded from configuration and never mutated
//! after construction. Adding a codec means editing the table, not the code.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConvertError, Result};
use crate::media::{StreamDescriptor, StreamKind};

/// Canonical output container a conversion aims to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerTarget {
    Video,
    Audio,
}

impl fmt::Display for ContainerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerTarget::Video => f.write_str("video container"),
            ContainerTarget::Audio => f.write_str("audio container"),
        }
    }
}

/// What to do with one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAction {
    Copy,
    /// Re-encode; the first option is the encoder name, the rest are its options
    Encode(Vec<String>),
    Skip,
}

impl StreamAction {
    pub fn is_skip(&self) -> bool {
        matches!(self, StreamAction::Skip)
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, StreamAction::Copy)
    }

    /// Arguments following `-c:<specifier>`
    pub fn codec_args(&self) -> Vec<String> {
        match self {
            StreamAction::Copy => vec!["copy".to_string()],
            StreamAction::Encode(options) => options.clone(),
            StreamAction::Skip => Vec::new(),
        }
    }
}

/// Copy set, encode set, and encode options for one stream kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindPolicy {
    #[serde(default)]
    pub copy: Vec<String>,
    #[serde(default)]
    pub encode: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

impl KindPolicy {
    fn new(copy: &[&str], encode: &[&str], options: &[&str]) -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            copy: owned(copy),
            encode: owned(encode),
            options: owned(options),
        }
    }

    pub fn copies(&self, codec: &str) -> bool {
        self.copy.iter().any(|c| c == codec)
    }

    pub fn encodes(&self, codec: &str) -> bool {
        self.encode.iter().any(|c| c == codec)
    }

    pub fn supports(&self, codec: &str) -> bool {
        self.copies(codec) || self.encodes(codec)
    }
}

/// Policy for one container target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerPolicy {
    /// Accepted file extensions; the first one is used for produced files
    pub extensions: Vec<String>,
    pub video: Option<KindPolicy>,
    pub audio: Option<KindPolicy>,
    pub subtitle: Option<KindPolicy>,
}

impl ContainerPolicy {
    pub fn kind(&self, kind: StreamKind) -> Option<&KindPolicy> {
        match kind {
            StreamKind::Video => self.video.as_ref(),
            StreamKind::Audio => self.audio.as_ref(),
            StreamKind::Subtitle => self.subtitle.as_ref(),
            _ => None,
        }
    }

    pub fn canonical_extension(&self) -> &str {
        self.extensions.first().map(String::as_str).unwrap_or_default()
    }

    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }

    fn supports(&self, kind: StreamKind, codec: &str) -> bool {
        self.kind(kind).is_some_and(|p| p.supports(codec))
    }
}

/// The full, immutable policy table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyTable {
    pub video: ContainerPolicy,
    pub audio: ContainerPolicy,
    /// Video codecs that are re-encoded instead of copied when the stream
    /// reports neither a bit rate nor a max bit rate (lossless camera output)
    pub lossless_suspect_codecs: Vec<String>,
    /// Audio codecs an audio-container file may already hold as-is
    pub native_audio_codecs: Vec<String>,
    /// Display title given to the subtitle track of produced videos
    pub subtitle_title: String,
}

impl Default for PolicyTable {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            video: ContainerPolicy {
                extensions: owned(&["mp4"]),
                video: Some(KindPolicy::new(
                    &["h264", "png"],
                    &[
                        "mpeg4", "msmpeg4v3", "theora", "none", "mpeg1video", "mpeg2video",
                        "mjpeg", "dvvideo", "h263",
                    ],
                    &["libx264", "-preset", "slow", "-crf", "18"],
                )),
                audio: Some(KindPolicy::new(
                    &["aac", "mp3"],
                    &[
                        "ac3", "dts", "flac", "vorbis", "dca", "mp2", "pcm_s24le", "pcm_s16le",
                        "amrnb", "pcm_u8", "mp1",
                    ],
                    &["libfdk_aac", "-cutoff", "15000", "-vbr", "5"],
                )),
                subtitle: Some(KindPolicy::new(
                    &["mov_text"],
                    &["srt", "subrip", "ass", "microdvd", "text"],
                    &["mov_text"],
                )),
            },
            audio: ContainerPolicy {
                extensions: owned(&["oga", "ogg"]),
                video: Some(KindPolicy::new(&["png"], &[], &[])),
                audio: Some(KindPolicy::new(
                    &["mp3", "vorbis", "opus"],
                    &["aac", "flac", "wmav2"],
                    &["libopus"],
                )),
                subtitle: None,
            },
            lossless_suspect_codecs: owned(&["h264"]),
            native_audio_codecs: owned(&["opus", "vorbis"]),
            subtitle_title: "English".to_string(),
        }
    }
}

impl PolicyTable {
    pub fn container(&self, target: ContainerTarget) -> &ContainerPolicy {
        match target {
            ContainerTarget::Video => &self.video,
            ContainerTarget::Audio => &self.audio,
        }
    }

    /// Decide copy / encode / skip for one stream against a container target
    pub fn resolve_stream_action(
        &self,
        target: ContainerTarget,
        stream: &StreamDescriptor,
    ) -> StreamAction {
        let Some(policy) = self.container(target).kind(stream.kind) else {
            return StreamAction::Skip;
        };
        let codec = stream.codec_name.as_str();

        if policy.copies(codec) {
            if self.is_suspected_lossless(stream) {
                StreamAction::Encode(policy.options.clone())
            } else {
                StreamAction::Copy
            }
        } else if policy.encodes(codec) {
            StreamAction::Encode(policy.options.clone())
        } else {
            StreamAction::Skip
        }
    }

    fn is_suspected_lossless(&self, stream: &StreamDescriptor) -> bool {
        stream.kind == StreamKind::Video
            && stream.has_unknown_bit_rates()
            && self
                .lossless_suspect_codecs
                .iter()
                .any(|c| *c == stream.codec_name)
    }

    /// A stream that makes its file a video-container candidate. Codecs the
    /// audio target copies as cover art do not count.
    pub fn is_video_stream(&self, stream: &StreamDescriptor) -> bool {
        stream.kind == StreamKind::Video
            && self.video.supports(StreamKind::Video, &stream.codec_name)
            && !self.audio.supports(StreamKind::Video, &stream.codec_name)
    }

    /// A stream that makes its file an audio-container candidate
    pub fn is_audio_stream(&self, stream: &StreamDescriptor) -> bool {
        stream.kind == StreamKind::Audio && self.audio.supports(StreamKind::Audio, &stream.codec_name)
    }

    /// Subtitle codecs the video target can carry
    pub fn supports_subtitle(&self, codec: &str) -> bool {
        self.video.supports(StreamKind::Subtitle, codec)
    }

    pub fn is_native_audio_codec(&self, codec: &str) -> bool {
        self.native_audio_codecs.iter().any(|c| c == codec)
    }

    /// Reject tables that could never have been meant: overlapping copy and
    /// encode sets, encode sets without options, or targets without extensions
    pub fn validate(&self) -> Result<()> {
        for target in [ContainerTarget::Video, ContainerTarget::Audio] {
            let container = self.container(target);
            if container.extensions.is_empty() {
                return Err(ConvertError::Config(format!(
                    "{} policy has no extensions",
                    target
                )));
            }

            for kind in [StreamKind::Video, StreamKind::Audio, StreamKind::Subtitle] {
                let Some(policy) = container.kind(kind) else {
                    continue;
                };
                if let Some(codec) = policy.copy.iter().find(|c| policy.encodes(c)) {
                    return Err(ConvertError::Config(format!(
                        "{} {} policy lists {} as both copy and encode",
                        target, kind, codec
                    )));
                }
                if !policy.encode.is_empty() && policy.options.is_empty() {
                    return Err(ConvertError::Config(format!(
                        "{} {} policy has encode codecs but no options",
                        target, kind
                    )));
                }
            }
        }
        Ok(())
    }
}
