use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ConvertError, Result};
use super::{MediaCommand, StreamDescriptor, StreamKind, StreamProber, StreamSpecifier};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    bit_rate: Option<String>,
    max_bit_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Parse `ffprobe -show_streams -of json` output.
///
/// Specifiers are assigned in emission order: the n-th stream of a kind gets
/// ordinal n-1, independent of its container index.
pub fn parse_probe_output(json: &str) -> Result<Vec<StreamDescriptor>> {
    let output: ProbeOutput = serde_json::from_str(json)?;
    let mut ordinals: HashMap<StreamKind, usize> = HashMap::new();

    let streams = output
        .streams
        .into_iter()
        .map(|stream| {
            let kind = StreamKind::from_codec_type(stream.codec_type.as_deref().unwrap_or(""));
            let ordinal = ordinals.entry(kind).or_insert(0);
            let specifier = StreamSpecifier::new(kind, *ordinal);
            *ordinal += 1;

            StreamDescriptor {
                kind,
                codec_name: stream.codec_name.unwrap_or_else(|| "none".to_string()),
                language: stream.tags.get("language").cloned(),
                specifier,
                bit_rate: parse_bit_rate(stream.bit_rate.as_deref()),
                max_bit_rate: parse_bit_rate(stream.max_bit_rate.as_deref()),
            }
        })
        .collect();

    Ok(streams)
}

// ffprobe reports unknown rates as "N/A" or leaves the field out entirely
fn parse_bit_rate(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

/// Prober backed by the ffprobe binary. Results are memoized per path for the
/// lifetime of the prober so one run probes each file once.
pub struct FfprobeProber {
    binary_path: String,
    cache: Mutex<HashMap<PathBuf, Vec<StreamDescriptor>>>,
}

impl FfprobeProber {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, path: &Path) -> Option<Vec<StreamDescriptor>> {
        self.cache.lock().ok()?.get(path).cloned()
    }

    fn remember(&self, path: &Path, streams: &[StreamDescriptor]) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(path.to_path_buf(), streams.to_vec());
        }
    }
}

#[async_trait]
impl StreamProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<Vec<StreamDescriptor>> {
        if let Some(streams) = self.cached(path) {
            debug!("Using cached probe result for {}", path.display());
            return Ok(streams);
        }

        let command = MediaCommand::new(&self.binary_path, "Stream probe")
            .args(["-v", "error", "-show_streams", "-of", "json"])
            .input(path);
        info!("{}: {}", command.description, command.command_line());

        let probe_failed = |detail: String| ConvertError::ProbeFailed {
            path: path.to_path_buf(),
            detail,
        };

        let output = command
            .output_raw()
            .await
            .map_err(|e| probe_failed(format!("failed to start {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(probe_failed(format!("{} ({})", stderr.trim_end(), output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("---\n{}\n---", stdout.trim_end());

        let streams = parse_probe_output(&stdout).map_err(|e| probe_failed(e.to_string()))?;
        self.remember(path, &streams);
        Ok(streams)
    }

    fn forget(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MKV_PROBE: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "h264", "codec_type": "video", "bit_rate": "N/A"},
            {"index": 1, "codec_name": "ac3", "codec_type": "audio", "bit_rate": "384000",
             "tags": {"language": "eng"}},
            {"index": 2, "codec_name": "subrip", "codec_type": "subtitle",
             "tags": {"language": "fra"}},
            {"index": 3, "codec_name": "aac", "codec_type": "audio", "tags": {"language": "jpn"}},
            {"index": 4, "codec_name": "ass", "codec_type": "subtitle",
             "tags": {"language": "eng", "title": "Signs"}},
            {"index": 5, "codec_type": "attachment", "tags": {"filename": "font.ttf"}}
        ]
    }"#;

    #[test]
    fn test_specifiers_follow_emission_order_per_kind() {
        let streams = parse_probe_output(MKV_PROBE).unwrap();
        let specifiers: Vec<String> = streams.iter().map(|s| s.specifier.to_string()).collect();
        assert_eq!(specifiers, vec!["v:0", "a:0", "s:0", "a:1", "s:1", "t:0"]);
    }

    #[test]
    fn test_parses_languages_and_bit_rates() {
        let streams = parse_probe_output(MKV_PROBE).unwrap();

        assert_eq!(streams[0].bit_rate, None);
        assert!(streams[0].has_unknown_bit_rates());
        assert_eq!(streams[1].bit_rate, Some(384_000));
        assert_eq!(streams[1].language.as_deref(), Some("eng"));
        assert_eq!(streams[3].language.as_deref(), Some("jpn"));
        assert_eq!(streams[5].codec_name, "none");
    }

    #[test]
    fn test_empty_and_invalid_output() {
        assert!(parse_probe_output("{}").unwrap().is_empty());
        assert!(parse_probe_output("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_probe_binary_is_probe_failure() {
        let prober = FfprobeProber::new("/nonexistent/ffprobe-binary");
        let err = prober.probe(Path::new("clip.mkv")).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ProbeFailed);
    }

    #[test]
    fn test_forget_empties_the_cache() {
        let prober = FfprobeProber::new("ffprobe");
        let path = Path::new("/media/clip.mkv");
        prober.remember(path, &parse_probe_output(MKV_PROBE).unwrap());
        assert_eq!(prober.cached(path).map(|s| s.len()), Some(6));

        prober.forget();
        assert!(prober.cached(path).is_none());
    }
}
