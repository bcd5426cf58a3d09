//! Moves processed files into converted / failed / original trees, mirroring
//! each file's directory relative to the scanned source root.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};

use crate::config::PathsConfig;
use crate::dispatcher::ConversionResult;
use crate::error::{ConvertError, Result};

/// Destination tree a file is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Converted,
    Failed,
    Original,
}

/// Destination roots and the dry-run switch for one run. Unset roots leave
/// files where they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub converted_dir: Option<PathBuf>,
    pub failed_dir: Option<PathBuf>,
    pub original_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_paths(paths: &PathsConfig, dry_run: bool) -> Self {
        Self {
            converted_dir: paths.converted.clone(),
            failed_dir: paths.failed.clone(),
            original_dir: paths.original.clone(),
            dry_run,
        }
    }

    pub fn destination(&self, route: Route) -> Option<&Path> {
        match route {
            Route::Converted => self.converted_dir.as_deref(),
            Route::Failed => self.failed_dir.as_deref(),
            Route::Original => self.original_dir.as_deref(),
        }
    }
}

/// Directory of `file` relative to `source_root`; empty for files directly
/// under the root.
pub fn relative_dir(source_root: &Path, file: &Path) -> PathBuf {
    file.parent()
        .and_then(|parent| pathdiff::diff_paths(parent, source_root))
        .unwrap_or_default()
}

pub struct Router<'a> {
    options: &'a RunOptions,
}

impl<'a> Router<'a> {
    pub fn new(options: &'a RunOptions) -> Self {
        Self { options }
    }

    /// Route every set of `result` that has a destination configured.
    /// Under dry run the mkdir and mv lines are logged but not performed.
    ///
    /// A failed move does not stop the remaining ones; all failures are
    /// reported together. Originals stay in place when one of their converted
    /// files could not be routed.
    pub async fn route(&self, relative_dir: &Path, result: &ConversionResult) -> Result<()> {
        let mut failures: Vec<String> = Vec::new();

        let converted_ok = self
            .route_set(Route::Converted, relative_dir, &result.converted, &mut failures)
            .await;
        self.route_set(Route::Failed, relative_dir, &result.failed, &mut failures)
            .await;

        if converted_ok {
            self.route_set(Route::Original, relative_dir, &result.original, &mut failures)
                .await;
        } else if !result.original.is_empty() {
            warn!(
                "Keeping {} original file(s) in place: converted output was not routed",
                result.original.len()
            );
        }

        match failures.first() {
            None => Ok(()),
            Some(first) => Err(ConvertError::RoutingFailed {
                failures: failures.len(),
                first: first.clone(),
            }),
        }
    }

    /// Move `files` into the `route` tree. Returns false if any of them failed.
    async fn route_set(
        &self,
        route: Route,
        relative_dir: &Path,
        files: &[PathBuf],
        failures: &mut Vec<String>,
    ) -> bool {
        let Some(root) = self.options.destination(route) else {
            return true;
        };
        if files.is_empty() {
            return true;
        }

        let destination = root.join(relative_dir);
        if !fs::try_exists(&destination).await.unwrap_or(false) {
            info!("mkdir -p {}", destination.display());
            if !self.options.dry_run {
                if let Err(e) = fs::create_dir_all(&destination).await {
                    error!("Cannot create {}: {}", destination.display(), e);
                    failures.push(format!("{}: {}", destination.display(), e));
                    return false;
                }
            }
        }

        let mut all_moved = true;
        for file in files {
            info!("mv {} {}", file.display(), destination.display());
            if self.options.dry_run {
                continue;
            }
            if let Err(e) = move_file(file, &destination).await {
                error!("Cannot move {} to {}: {}", file.display(), destination.display(), e);
                failures.push(format!("{}: {}", file.display(), e));
                all_moved = false;
            }
        }
        all_moved
    }
}

/// Move `file` into `directory`, falling back to copy and remove across
/// filesystems. An existing target is never replaced.
pub async fn move_file(file: &Path, directory: &Path) -> io::Result<PathBuf> {
    let name = file.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", file.display()),
        )
    })?;
    let target = directory.join(name);

    if fs::try_exists(&target).await? {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        ));
    }

    match fs::rename(file, &target).await {
        Ok(()) => Ok(target),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(file, &target).await?;
            fs::remove_file(file).await?;
            Ok(target)
        }
        Err(e) => Err(e),
    }
}
