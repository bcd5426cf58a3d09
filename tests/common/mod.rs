#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use convert_media::config::Config;
use convert_media::error::{ConvertError, Result};
use convert_media::media::{Encoder, MediaCommand, StreamDescriptor, StreamKind, StreamProber, StreamSpecifier};
use convert_media::routing::RunOptions;
use convert_media::workflow::Workflow;

pub fn stream(kind: StreamKind, index: usize, codec: &str) -> StreamDescriptor {
    StreamDescriptor {
        kind,
        codec_name: codec.to_string(),
        language: Some("eng".to_string()),
        specifier: StreamSpecifier::new(kind, index),
        bit_rate: Some(1_500_000),
        max_bit_rate: None,
    }
}

/// Prober answering from a table keyed by file name; unknown names fail
/// like ffprobe does on garbage input.
#[derive(Default)]
pub struct FakeProber {
    streams: Mutex<HashMap<String, Vec<StreamDescriptor>>>,
    pub calls: AtomicUsize,
}

impl FakeProber {
    pub fn with(self, name: &str, streams: Vec<StreamDescriptor>) -> Self {
        self.streams
            .lock()
            .unwrap()
            .insert(name.to_string(), streams);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamProber for FakeProber {
    async fn probe(&self, path: &Path) -> Result<Vec<StreamDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.streams
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .ok_or_else(|| ConvertError::ProbeFailed {
                path: path.to_path_buf(),
                detail: "Invalid data found when processing input".to_string(),
            })
    }
}

/// Encoder that writes a small file at the command's output path
#[derive(Default)]
pub struct FakeEncoder {
    pub commands: Mutex<Vec<MediaCommand>>,
    pub inspected: AtomicUsize,
}

impl FakeEncoder {
    pub fn runs(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn run(&self, command: &MediaCommand) -> Result<String> {
        self.commands.lock().unwrap().push(command.clone());
        let output = PathBuf::from(command.args.last().expect("command has an output"));
        std::fs::write(&output, "1\n00:00:01,000 --> 00:00:02,000\nHello\n")?;
        Ok(String::new())
    }

    async fn inspect(&self, _command: &MediaCommand) -> Result<()> {
        self.inspected.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Source, destination and log directories for one test run
pub struct Layout {
    pub temp: tempfile::TempDir,
    pub source: PathBuf,
    pub converted: PathBuf,
    pub failed: PathBuf,
    pub original: PathBuf,
    pub pid_file: PathBuf,
}

impl Layout {
    pub fn new() -> Self {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        for dir in ["in", "converted", "failed", "original", "log"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }

        Self {
            source: root.join("in"),
            converted: root.join("converted"),
            failed: root.join("failed"),
            original: root.join("original"),
            pid_file: root.join("log").join("convert_media.pid"),
            temp,
        }
    }

    pub fn touch(&self, relative: &str) -> PathBuf {
        let path = self.source.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, b"media").unwrap();
        path
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.paths.pid_file = self.pid_file.clone();
        config.paths.log_dir = self.temp.path().join("log");
        config.paths.converted = Some(self.converted.clone());
        config.paths.failed = Some(self.failed.clone());
        config.paths.original = Some(self.original.clone());
        config
    }

    pub fn workflow(&self, prober: Arc<FakeProber>, encoder: Arc<FakeEncoder>, dry_run: bool) -> Workflow {
        let config = self.config();
        let options = RunOptions::from_paths(&config.paths, dry_run);
        Workflow::with_tools(prober, encoder, &config, options)
    }
}
