use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Args;
use crate::error::{ConvertError, Result};
use crate::policy::PolicyTable;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub paths: PathsConfig,
    pub policy: PolicyTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Lock file holding the pid of the running instance
    pub pid_file: PathBuf,
    /// Directory receiving one log file per run
    pub log_dir: PathBuf,
    /// Destination root for converted files; unset leaves them in place
    pub converted: Option<PathBuf>,
    /// Destination root for files that failed to convert
    pub failed: Option<PathBuf>,
    /// Destination root for superseded source files
    pub original: Option<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let log_dir = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("log")
            .join("convert_media");

        Self {
            pid_file: log_dir.join("convert_media.pid"),
            log_dir,
            converted: None,
            failed: None,
            original: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConvertError::path_not_found("config file", path));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ConvertError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConvertError::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;

        std::fs::write(path, content)
            .map_err(|e| ConvertError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Command-line values win over the config file
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(pid) = &args.pid {
            self.paths.pid_file = pid.clone();
        }
        if let Some(log) = &args.log {
            self.paths.log_dir = log.clone();
        }
        if args.converted.is_some() {
            self.paths.converted = args.converted.clone();
        }
        if args.failed.is_some() {
            self.paths.failed = args.failed.clone();
        }
        if args.original.is_some() {
            self.paths.original = args.original.clone();
        }
    }

    /// Check the policy table and that every configured path exists
    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;

        if !self.paths.log_dir.is_dir() {
            return Err(ConvertError::path_not_found("log directory", &self.paths.log_dir));
        }

        let pid_dir = match self.paths.pid_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        if !pid_dir.is_dir() {
            return Err(ConvertError::path_not_found("pid directory", pid_dir));
        }

        let destinations = [
            ("converted directory", &self.paths.converted),
            ("failed directory", &self.paths.failed),
            ("original directory", &self.paths.original),
        ];
        for (what, dir) in destinations {
            if let Some(dir) = dir {
                if !dir.is_dir() {
                    return Err(ConvertError::path_not_found(what, dir));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [media]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

            [paths]
            converted = "/srv/converted"
            "#,
        )
        .unwrap();

        assert_eq!(config.media.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.media.ffprobe_path, "ffprobe");
        assert_eq!(config.paths.converted, Some(PathBuf::from("/srv/converted")));
        assert_eq!(config.policy, PolicyTable::default());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = Config::default();
        let parsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_args_override_file_values() {
        let mut config = Config::default();
        config.paths.converted = Some(PathBuf::from("/from/file"));
        config.paths.failed = Some(PathBuf::from("/from/file/failed"));

        let args = Args::parse_from([
            "convert-media",
            "--source",
            "/in",
            "--converted",
            "/from/cli",
            "--pid",
            "/tmp/x.pid",
        ]);
        config.apply_args(&args);

        assert_eq!(config.paths.converted, Some(PathBuf::from("/from/cli")));
        assert_eq!(config.paths.failed, Some(PathBuf::from("/from/file/failed")));
        assert_eq!(config.paths.pid_file, PathBuf::from("/tmp/x.pid"));
    }

    #[test]
    fn test_validate_reports_missing_directories() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.log_dir = temp.path().to_path_buf();
        config.paths.pid_file = temp.path().join("convert.pid");
        assert!(config.validate().is_ok());

        config.paths.original = Some(temp.path().join("missing"));
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
        assert!(err.to_string().contains("original directory"));
    }

    #[test]
    fn test_saved_config_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("convert-media.toml");

        let mut config = Config::default();
        config.media.ffprobe_path = "/usr/local/bin/ffprobe".to_string();
        config.policy.subtitle_title = "Deutsch".to_string();
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_config_file() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
    }
}
