use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of an elementary stream as reported by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    Unknown,
}

impl StreamKind {
    pub fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "video" => StreamKind::Video,
            "audio" => StreamKind::Audio,
            "subtitle" => StreamKind::Subtitle,
            "data" => StreamKind::Data,
            "attachment" => StreamKind::Attachment,
            _ => StreamKind::Unknown,
        }
    }

    /// Letter used by ffmpeg stream specifiers (`v`, `a`, `s`, ...).
    pub fn letter(self) -> char {
        match self {
            StreamKind::Video => 'v',
            StreamKind::Audio => 'a',
            StreamKind::Subtitle => 's',
            StreamKind::Data => 'd',
            StreamKind::Attachment => 't',
            StreamKind::Unknown => 'u',
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::Subtitle => "subtitle",
            StreamKind::Data => "data",
            StreamKind::Attachment => "attachment",
            StreamKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Kind letter plus the zero-based ordinal among same-kind streams, e.g. `s:1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamSpecifier {
    pub kind: StreamKind,
    pub index: usize,
}

impl StreamSpecifier {
    pub fn new(kind: StreamKind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl fmt::Display for StreamSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.letter(), self.index)
    }
}

/// One probed stream. `bit_rate`/`max_bit_rate` are `None` when the prober
/// reported them as unknown or omitted them.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub kind: StreamKind,
    pub codec_name: String,
    pub language: Option<String>,
    pub specifier: StreamSpecifier,
    pub bit_rate: Option<u64>,
    pub max_bit_rate: Option<u64>,
}

impl StreamDescriptor {
    pub fn is_language(&self, language: &str) -> bool {
        self.language.as_deref() == Some(language)
    }

    pub fn has_unknown_bit_rates(&self) -> bool {
        self.bit_rate.is_none() && self.max_bit_rate.is_none()
    }
}
