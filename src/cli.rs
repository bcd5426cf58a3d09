use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::error::{ConvertError, Result};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("input").args(["file", "source"])))]
pub struct Args {
    /// Convert a single file
    #[arg(long, value_name = "FILENAME")]
    pub file: Option<PathBuf>,

    /// Convert a directory recursively
    #[arg(long, value_name = "DIRECTORY")]
    pub source: Option<PathBuf>,

    /// Move converted files to this directory
    #[arg(long, value_name = "DIRECTORY")]
    pub converted: Option<PathBuf>,

    /// Move failed conversions to this directory
    #[arg(long, value_name = "DIRECTORY")]
    pub failed: Option<PathBuf>,

    /// Move source files after conversion into this directory
    #[arg(long, value_name = "DIRECTORY")]
    pub original: Option<PathBuf>,

    /// Path to the pid file to use
    #[arg(long, value_name = "FILENAME")]
    pub pid: Option<PathBuf>,

    /// Log directory to use
    #[arg(long, value_name = "DIRECTORY")]
    pub log: Option<PathBuf>,

    /// Configuration file path (overridden by options given here)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only print out what will be done without doing it (still runs ffprobe)
    #[arg(long)]
    pub dry_run: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Write the effective configuration to this file and exit
    #[arg(long, value_name = "FILENAME")]
    pub save_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// What a run works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    File(PathBuf),
    Source(PathBuf),
}

impl Args {
    /// The validated input: an existing file or an existing directory
    pub fn input(&self) -> Result<Input> {
        match (&self.file, &self.source) {
            (Some(file), None) => {
                if !file.is_file() {
                    return Err(ConvertError::path_not_found("file", file));
                }
                Ok(Input::File(file.clone()))
            }
            (None, Some(source)) => {
                if !source.is_dir() {
                    return Err(ConvertError::path_not_found("source directory", source));
                }
                Ok(Input::Source(source.clone()))
            }
            _ => Err(ConvertError::Config(
                "Either --file or --source must be given".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_file_and_source_are_exclusive() {
        let parsed = Args::try_parse_from(["convert-media", "--file", "a.mkv", "--source", "/in"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_input_requires_existing_paths() {
        let temp = TempDir::new().unwrap();

        let args = Args::parse_from(["convert-media", "--source", temp.path().to_str().unwrap()]);
        assert_eq!(args.input().unwrap(), Input::Source(temp.path().to_path_buf()));

        let missing = temp.path().join("missing.mkv");
        let args = Args::parse_from(["convert-media", "--file", missing.to_str().unwrap()]);
        assert_eq!(args.input().unwrap_err().kind(), ErrorKind::PathNotFound);

        let args = Args::parse_from(["convert-media", "--dry-run"]);
        assert!(args.dry_run);
        assert_eq!(args.input().unwrap_err().kind(), ErrorKind::Config);
    }
}
