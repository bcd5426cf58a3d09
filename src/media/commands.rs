use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::media::StreamSpecifier;
use crate::planner::{ConversionPlan, MapDirective};

/// Structured external command. Arguments are kept as a vector of OS strings
/// and handed to the OS directly, so paths reach the tool byte for byte.
/// Nothing here is ever joined into a shell string.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<OsString>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().as_os_str())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().as_os_str())
    }

    /// Never read from stdin, so an unexpected overwrite prompt cannot block the run
    pub fn no_stdin(self) -> Self {
        self.arg("-nostdin")
    }

    pub fn hide_banner(self) -> Self {
        self.arg("-hide_banner")
    }

    /// Map an input stream of the first input file
    pub fn map(self, specifier: StreamSpecifier) -> Self {
        self.arg("-map").arg(format!("0:{}", specifier))
    }

    /// Set the codec (and codec options) of one output stream
    pub fn stream_codec<I, S>(self, output: StreamSpecifier, codec_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.arg(format!("-c:{}", output)).args(codec_args)
    }

    /// Set a metadata tag on one output stream
    pub fn stream_metadata(self, output: StreamSpecifier, key: &str, value: &str) -> Self {
        self.arg(format!("-metadata:s:{}", output))
            .arg(format!("{}={}", key, value))
    }

    /// Append one planned stream mapping
    pub fn directive(self, directive: &MapDirective) -> Self {
        let mut cmd = self
            .map(directive.input)
            .stream_codec(directive.output, directive.action.codec_args());
        if let Some(title) = &directive.title {
            cmd = cmd.stream_metadata(directive.output, "title", title);
        }
        cmd
    }

    /// Human readable rendering used for logging only
    pub fn command_line(&self) -> String {
        let mut line = self.binary_path.clone();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
                line.push_str(&format!("{:?}", arg));
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    /// Run the command and return its raw output. Fails only if the process
    /// could not be started.
    pub async fn output_raw(&self) -> Result<Output> {
        debug!("Executing media processing command: {}", self.command_line());
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(output)
    }

    /// Execute the command and return combined stdout and stderr
    pub async fn execute(&self) -> Result<String> {
        let output = self.output_raw().await.map_err(|e| ConvertError::EncodeFailed {
            description: self.description.clone(),
            output: format!("failed to start {}: {}", self.binary_path, e),
        })?;

        let combined = combined_output(&output);
        if !output.status.success() {
            return Err(ConvertError::EncodeFailed {
                description: self.description.clone(),
                output: format!("{} ({})", combined.trim_end(), output.status),
            });
        }

        Ok(combined)
    }
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Builder for the encoder invocations the converter needs
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    fn base<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.binary_path, description)
            .hide_banner()
            .no_stdin()
    }

    /// Build the single container conversion command for a plan
    pub fn convert(&self, input: &Path, plan: &ConversionPlan) -> MediaCommand {
        let mut cmd = self
            .base(format!("Convert to {}", plan.target))
            .args(plan.input_flags.iter().cloned())
            .input(input)
            .args(plan.output_flags.iter().cloned());

        for directive in &plan.directives {
            cmd = cmd.directive(directive);
        }

        cmd.output(&plan.output)
    }

    /// Build subtitle extraction command (one stream to SubRip)
    pub fn extract_subtitle(
        &self,
        input: &Path,
        subtitle: StreamSpecifier,
        output: &Path,
    ) -> MediaCommand {
        let first_subtitle = StreamSpecifier::new(subtitle.kind, 0);
        self.base("Subtitle extraction")
            .arg("-fix_sub_duration")
            .input(input)
            .map(subtitle)
            .stream_codec(first_subtitle, ["srt"])
            .output(output)
    }

    /// Build web caption conversion command (first subtitle stream to WebVTT)
    pub fn caption(&self, input: &Path, output: &Path) -> MediaCommand {
        let first_subtitle = StreamSpecifier::new(crate::media::StreamKind::Subtitle, 0);
        self.base("Caption conversion")
            .input(input)
            .map(first_subtitle)
            .stream_codec(first_subtitle, ["webvtt"])
            .output(output)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}
