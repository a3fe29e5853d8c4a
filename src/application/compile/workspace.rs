//! Scoped temporary directories for a single compile call.

use std::{
    io,
    path::{Path, PathBuf},
};

use metrics::counter;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::domain::types::CompileFlavor;

use super::METRIC_WORKSPACE_CLEANUP_FAILURES;

/// Exclusively owned temp directory. Removed recursively when dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    flavor: CompileFlavor,
}

impl Workspace {
    /// Create a uniquely named directory (`latex-*` / `typst-*`) under `root`,
    /// or under the system temp directory when no root is configured.
    pub fn acquire(flavor: CompileFlavor, root: Option<&Path>) -> io::Result<Self> {
        let prefix = format!("{}-", flavor.as_str());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        // Compilers run with the workspace as cwd, so arguments must not be relative.
        let path = std::path::absolute(dir.path())?;

        debug!(
            target = "notepress::compile::workspace",
            flavor = flavor.as_str(),
            path = %path.display(),
            "Workspace acquired"
        );

        Ok(Self {
            dir: Some(dir),
            path,
            flavor,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn input_path(&self) -> PathBuf {
        self.path.join(self.flavor.input_file_name())
    }

    pub fn output_path(&self) -> PathBuf {
        self.path.join(self.flavor.output_file_name())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        if let Err(err) = dir.close() {
            counter!(METRIC_WORKSPACE_CLEANUP_FAILURES, "flavor" => self.flavor.as_str())
                .increment(1);
            warn!(
                target = "notepress::compile::workspace",
                op = "workspace::release",
                result = "error",
                flavor = self.flavor.as_str(),
                path = %self.path.display(),
                error = %err,
                "Failed to remove compile workspace"
            );
        }
    }
}
