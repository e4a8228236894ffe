use std::path::PathBuf;

use crate::config::SubmitConfig;
use crate::fs::Fs;

/// One independent unit of the batch, named `{sim_name}_{index}`.
///
/// Built fresh for every iteration of the driver loop; nothing here is shared
/// between sub-runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRun {
    pub index: usize,
    pub name: String,
    /// `{input_base}/{name}`
    pub input_dir: PathBuf,
    /// `{output_base}/{name}`
    pub workspace: PathBuf,
    /// `{csv_base}/{name}.csv`
    pub manifest: PathBuf,
}

impl SubRun {
    pub fn new(index: usize, config: &SubmitConfig, fs: &Fs) -> Self {
        let name = format!("{}_{}", config.sim_name, index);

        let mut workspace = PathBuf::with_capacity(128);
        fs.workspace(&name, &mut workspace);

        let manifest = config.paths.csv_base.join(format!("{name}.csv"));

        Self {
            index,
            input_dir: config.paths.input_base.join(&name),
            workspace,
            manifest,
            name,
        }
    }
}
