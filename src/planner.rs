//! Turns probed streams plus the policy table into an ordered list of stream
//! mapping directives.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};
use crate::media::{StreamDescriptor, StreamKind, StreamSpecifier};
use crate::policy::{ContainerTarget, PolicyTable, StreamAction};
use crate::subtitle::select_subtitle_stream;

/// Strip the final alphanumeric extension from a path, keeping its directory.
/// `medianame("dir/clip.mkv") == "dir/clip"`.
pub fn medianame(path: &Path) -> PathBuf {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };

    match name.rfind('.') {
        Some(dot)
            if dot > 0 && name[dot + 1..].chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            path.with_file_name(&name[..dot])
        }
        _ => path.to_path_buf(),
    }
}

/// `medianame(path)` with a new extension appended
pub fn derived_path(path: &Path, extension: &str) -> PathBuf {
    let mut name: OsString = medianame(path).into_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// One `-map` plus its codec selection. `input` addresses the probed stream,
/// `output` the stream's position among same-kind streams of the output.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDirective {
    pub input: StreamSpecifier,
    pub output: StreamSpecifier,
    pub action: StreamAction,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionPlan {
    pub target: ContainerTarget,
    pub output: PathBuf,
    pub input_flags: Vec<String>,
    pub output_flags: Vec<String>,
    pub directives: Vec<MapDirective>,
}

impl ConversionPlan {
    fn new(target: ContainerTarget, output: PathBuf) -> Self {
        Self {
            target,
            output,
            input_flags: Vec::new(),
            output_flags: Vec::new(),
            directives: Vec::new(),
        }
    }

    fn push(&mut self, stream: &StreamDescriptor, action: StreamAction, title: Option<String>) {
        let index = self
            .directives
            .iter()
            .filter(|d| d.output.kind == stream.kind)
            .count();
        self.directives.push(MapDirective {
            input: stream.specifier,
            output: StreamSpecifier::new(stream.kind, index),
            action,
            title,
        });
    }
}

/// Result of planning an audio conversion
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPlan {
    /// The input already is a canonical audio file
    AlreadyCanonical,
    Convert(ConversionPlan),
}

pub struct Planner<'a> {
    policy: &'a PolicyTable,
}

impl<'a> Planner<'a> {
    pub fn new(policy: &'a PolicyTable) -> Self {
        Self { policy }
    }

    pub fn video_output(&self, path: &Path) -> PathBuf {
        derived_path(path, self.policy.video.canonical_extension())
    }

    pub fn audio_output(&self, path: &Path) -> PathBuf {
        derived_path(path, self.policy.audio.canonical_extension())
    }

    pub fn build_video_plan(
        &self,
        path: &Path,
        streams: &[StreamDescriptor],
    ) -> Result<ConversionPlan> {
        if !streams.iter().any(|s| s.kind == StreamKind::Video) {
            return Err(ConvertError::NoVideoStream(path.to_path_buf()));
        }

        let mut plan = ConversionPlan::new(ContainerTarget::Video, self.video_output(path));
        plan.input_flags.push("-fix_sub_duration".to_string());
        // keeps creation timestamps and other global tags
        plan.output_flags
            .extend(["-map_metadata:g".to_string(), "0:g".to_string()]);

        for stream in streams.iter().filter(|s| s.kind != StreamKind::Subtitle) {
            let action = self.policy.resolve_stream_action(ContainerTarget::Video, stream);
            if !action.is_skip() {
                plan.push(stream, action, None);
            }
        }

        if let Some(subtitle) = select_subtitle_stream(self.policy, streams) {
            let action = self
                .policy
                .resolve_stream_action(ContainerTarget::Video, subtitle);
            if !action.is_skip() {
                plan.push(subtitle, action, Some(self.policy.subtitle_title.clone()));
            }
        }

        Ok(plan)
    }

    pub fn build_audio_plan(&self, path: &Path, streams: &[StreamDescriptor]) -> Result<AudioPlan> {
        let audio = streams
            .iter()
            .find(|s| s.kind == StreamKind::Audio)
            .ok_or_else(|| ConvertError::NoAudioStream(path.to_path_buf()))?;

        if let Some(extension) = extension_of(path) {
            if self.policy.audio.accepts_extension(&extension) {
                if !self.policy.is_native_audio_codec(&audio.codec_name) {
                    return Err(ConvertError::UnsupportedCodecInContainer {
                        path: path.to_path_buf(),
                        codec: audio.codec_name.clone(),
                        extension,
                    });
                }
                return Ok(AudioPlan::AlreadyCanonical);
            }
        }

        if self
            .policy
            .resolve_stream_action(ContainerTarget::Audio, audio)
            .is_copy()
        {
            return Ok(AudioPlan::AlreadyCanonical);
        }

        let mut plan = ConversionPlan::new(ContainerTarget::Audio, self.audio_output(path));
        // Ogg cannot carry cover art, so only audio streams are mapped
        for stream in streams.iter().filter(|s| s.kind == StreamKind::Audio) {
            let action = self.policy.resolve_stream_action(ContainerTarget::Audio, stream);
            if !action.is_skip() {
                plan.push(stream, action, None);
            }
        }

        Ok(AudioPlan::Convert(plan))
    }
}
