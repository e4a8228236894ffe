use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::args::Args;
use crate::config::SubmitConfig;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Config file not found: {0:?}")]
    ConfigNotFound(PathBuf),
    #[error("Invalid config path has no parent (should not happen)")]
    ConfigHasNoParent,
    #[error("Number of sub-runs not specified; use --count or set `sub_runs` in the config file")]
    NoSubRunCount,
    #[error("Sub-run index {0} is out of range (there are {1} sub-runs)")]
    SubRunOutOfRange(usize, usize),
}

/// Which sub-runs to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// `0..count`
    All(usize),
    /// Specific indices, sorted and deduplicated.
    Only(Vec<usize>),
}

impl Selection {
    pub fn indices(&self) -> Vec<usize> {
        match self {
            Self::All(count) => (0..*count).collect(),
            Self::Only(indices) => indices.clone(),
        }
    }
}

/// Settings are like Args, except all the logic has
/// been applied so e.g. defaults are added in
/// and the config file has been loaded and checked.
#[derive(Debug)]
pub struct Settings {
    pub config_path: PathBuf,
    pub config: SubmitConfig,
    pub selection: Selection,
    pub yes: bool,
    pub verbose: u8,
    pub dry_run: bool,
    /// If false, stop once the script is written.
    pub submit: bool,
    pub fail_fast: bool,
}

impl Settings {
    pub fn output_base(&self) -> &Path {
        &self.config.paths.output_base
    }
}

/// Parent dir of config file:
fn config_parent_dir(config_path: &Path) -> Result<&Path, Error> {
    config_path.parent().ok_or(Error::ConfigHasNoParent)
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;
    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let mut config_path = PathBuf::from(&args.config);
        if config_path.exists() {
            config_path = config_path.canonicalize()?;
        } else {
            return Err(Error::ConfigNotFound(config_path).into());
        }

        let mut config = SubmitConfig::load(&config_path)?;
        config.resolve_paths(config_parent_dir(&config_path)?);
        if let Some(output) = &args.output {
            let output = PathBuf::from(output);
            config.paths.output_base = if output.is_relative() {
                std::env::current_dir()
                    .context("while resolving --output")?
                    .join(output)
            } else {
                output
            };
        }
        config
            .preflight()
            .with_context(|| format!("while checking config file {:?}", config_path))?;

        let count = args
            .count
            .or(config.sub_runs)
            .ok_or(Error::NoSubRunCount)?;

        let selection = if args.sub_runs.is_empty() {
            Selection::All(count)
        } else {
            let mut indices = args.sub_runs;
            indices.sort_unstable();
            indices.dedup();
            if let Some(&bad) = indices.iter().find(|&&i| i >= count) {
                return Err(Error::SubRunOutOfRange(bad, count).into());
            }
            Selection::Only(indices)
        };

        Ok(Self {
            config_path,
            config,
            selection,
            yes: args.yes,
            verbose: args.verbose,
            dry_run: args.dry_run,
            submit: !args.no_submit,
            fail_fast: args.fail_fast,
        })
    }
}
