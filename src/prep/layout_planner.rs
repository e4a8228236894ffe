use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::fs::Fs;

use super::Error;

/// A freshly prepared workspace: `root` holds exactly `slices/` and `log/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    /// Tool outputs
    pub slices: PathBuf,
    /// Per-task scheduler logs
    pub log: PathBuf,
}

/// Deletes whatever a previous run left in a workspace and recreates its layout.
pub struct LayoutPlanner<'a> {
    /// for filesystem operations
    fs: &'a Fs,
    /// print out more ui messages
    verbose: bool,
}

impl<'a> LayoutPlanner<'a> {
    pub fn new(fs: &'a Fs, verbose: bool) -> Self {
        Self { fs, verbose }
    }

    /// Recreate `root` empty, with its two subdirectories.
    /// Touches nothing outside `root`.
    pub fn prepare(&self, root: &Path) -> Result<Workspace> {
        self.prepare_inner(root)
            .with_context(|| Error::WorkspaceUnwritable(root.display().to_string()))
    }

    fn prepare_inner(&self, root: &Path) -> Result<Workspace> {
        if self.fs.is_dir(root) {
            if self.verbose {
                eprintln!("{} {}", "Deleting".red(), root.display());
            }
            self.fs
                .delete_dir(root)
                .context("while deleting old workspace")?;
        } else if self.fs.exists(root) {
            log::warn!("Replacing non-directory {:?} with a workspace", root);
            self.fs
                .delete_file(root)
                .context("while deleting file in place of workspace")?;
        }

        let mut buf = PathBuf::with_capacity(128);
        let slices = self.fs.slices_dir(root, &mut buf).to_path_buf();
        let log = self.fs.log_dir(root, &mut buf).to_path_buf();

        // create_dir makes the root along with each child:
        self.fs.create_dir(&slices).context("creating slices dir")?;
        self.fs.create_dir(&log).context("creating log dir")?;

        Ok(Workspace {
            root: root.to_path_buf(),
            slices,
            log,
        })
    }
}
