//! convert-media - Batch Media Normalizer
//!
//! Converts media trees into browser-friendly MP4 (plus SRT/WebVTT side
//! files) or Ogg audio by driving ffmpeg and ffprobe according to a per-stream
//! codec policy, then routes inputs and outputs into converted / failed /
//! original trees. One run at a time, guarded by a pid file.

pub mod cli;
pub mod config;
pub mod converter;
pub mod dispatcher;
pub mod error;
pub mod lock;
pub mod media;
pub mod planner;
pub mod policy;
pub mod routing;
pub mod subtitle;
pub mod workflow;
