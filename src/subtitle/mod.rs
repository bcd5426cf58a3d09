// Subtitle handling
//
// - select_subtitle_stream: picks the one subtitle track a video keeps
// - extract: derives .srt and .vtt side files from a converted video

pub mod extract;

use std::path::{Path, PathBuf};

pub use extract::*;

use crate::error::ConvertError;
use crate::media::{StreamDescriptor, StreamKind};
use crate::policy::PolicyTable;

const PREFERRED_LANGUAGE: &str = "eng";

// Some ass tracks remux to empty or corrupt output, so they lose ties
const DEPRIORITIZED_CODEC: &str = "ass";

/// Pick the subtitle track to keep.
///
/// Among subtitle streams with a supported codec, first match wins:
/// an English non-ass track, then any English track, then the first track.
pub fn select_subtitle_stream<'a>(
    policy: &PolicyTable,
    streams: &'a [StreamDescriptor],
) -> Option<&'a StreamDescriptor> {
    let candidates: Vec<&StreamDescriptor> = streams
        .iter()
        .filter(|s| s.kind == StreamKind::Subtitle && policy.supports_subtitle(&s.codec_name))
        .collect();

    candidates
        .iter()
        .find(|s| s.codec_name != DEPRIORITIZED_CODEC && s.is_language(PREFERRED_LANGUAGE))
        .or_else(|| candidates.iter().find(|s| s.is_language(PREFERRED_LANGUAGE)))
        .or_else(|| candidates.first())
        .copied()
}

/// Why no subtitle file was produced, when that is expected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleSkip {
    NoSubtitleStream,
    EmptyTrack,
}

/// Result of one extraction step. `Failed` never fails the containing
/// conversion; it only means no file was produced.
#[derive(Debug)]
pub enum SubtitleOutcome {
    Extracted(PathBuf),
    Unavailable(SubtitleSkip),
    Failed(ConvertError),
}

impl SubtitleOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            SubtitleOutcome::Extracted(path) => Some(path),
            _ => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            SubtitleOutcome::Extracted(path) => Some(path),
            _ => None,
        }
    }
}
