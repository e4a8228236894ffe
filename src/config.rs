use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use descriptor::{is_quantity, Resources, Sweep, TransferPolicy};
use manifest::ManifestSchema;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Config file has {0} error(s); see log output above")]
    Invalid(usize),
}

/// Parameters the slice processor accepts a comma-separated sweep list for,
/// and the kind of value each takes.
const SWEEP_PARAMS: [(&str, ValueKind); 10] = [
    ("snr", ValueKind::Number),
    ("sampling", ValueKind::Number),
    ("jitter", ValueKind::Number),
    ("dcr", ValueKind::Number),
    ("tau", ValueKind::Number),
    ("pre-threshold", ValueKind::Number),
    ("post-threshold", ValueKind::Number),
    ("pre-trigger", ValueKind::Integer),
    ("post-trigger", ValueKind::Integer),
    ("noise-spectrum", ValueKind::Text),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Number,
    Integer,
    Text,
}

/// Contents of the YAML config file.
#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct SubmitConfig {
    /// Sub-run names are `{sim_name}_{index}`.
    pub sim_name: String,
    /// Number of sub-runs; can be given on the command line instead.
    #[serde(default)]
    pub sub_runs: Option<usize>,
    pub paths: PathsConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub transfer: Transfer,
    pub tool: ToolConfig,
    /// Program and leading args; the descriptor path is appended.
    #[serde(default = "default_submit_command")]
    pub submit_command: Vec<String>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Manifests live at `{csv_base}/{sub_run}.csv`.
    pub csv_base: PathBuf,
    /// Inputs live at `{input_base}/{sub_run}/{identifier}.fil`.
    pub input_base: PathBuf,
    /// Workspaces are created at `{output_base}/{sub_run}`.
    pub output_base: PathBuf,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ManifestConfig {
    #[serde(default = "default_true")]
    pub has_header: bool,
    #[serde(default = "default_id_column")]
    pub id_column: usize,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            has_header: true,
            id_column: manifest::DEFAULT_ID_COLUMN,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ResourcesConfig {
    #[serde(default = "default_cpus")]
    pub cpus: u32,
    #[serde(default = "default_memory")]
    pub memory: String,
    #[serde(default = "default_disk")]
    pub disk: String,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            cpus: default_cpus(),
            memory: default_memory(),
            disk: default_disk(),
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Transfer {
    Yes,
    #[default]
    No,
    IfNeeded,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// e.g. `[python3, /opt/dslab/daq_slices_sweep.py]`
    pub command: Vec<String>,
    #[serde(default)]
    pub sweep: Option<SweepConfig>,
    #[serde(default)]
    pub seeds: Option<[u64; 2]>,
    #[serde(default)]
    pub start: Option<u64>,
    #[serde(default)]
    pub stop: Option<u64>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    pub param: String,
    pub values: Vec<SweepValue>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum SweepValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for SweepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => v.fmt(f),
            // keeps the ".0" on whole floats:
            Self::Number(v) => write!(f, "{v:?}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl SubmitConfig {
    /// Read and deserialize the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("while reading config file {:?}", path))?;
        let config = serde_yaml::from_str(&text)
            .with_context(|| format!("while parsing config file {:?}", path))?;
        Ok(config)
    }

    /// Make relative paths relative to `base` (the config file's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.paths.csv_base,
            &mut self.paths.input_base,
            &mut self.paths.output_base,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Check everything that can be checked before touching the filesystem.
    /// All problems are logged; the error just carries the count.
    pub fn preflight(&mut self) -> Result<(), Error> {
        let mut errors = 0;

        if !is_safe_name(&self.sim_name) {
            log::error!(
                "sim_name \"{}\" must be non-empty and contain only ASCII letters, digits, '.', '_' or '-'",
                self.sim_name
            );
            errors += 1;
        }

        if self.tool.command.is_empty() || self.tool.command[0].is_empty() {
            log::error!("tool.command must name a program to run");
            errors += 1;
        }

        if self.submit_command.is_empty() || self.submit_command[0].is_empty() {
            log::error!("submit_command must name a program to run");
            errors += 1;
        }

        if !is_quantity(&self.resources.memory) {
            log::error!("resources.memory \"{}\" is not a quantity like 2GB", self.resources.memory);
            errors += 1;
        }
        if !is_quantity(&self.resources.disk) {
            log::error!("resources.disk \"{}\" is not a quantity like 4GB", self.resources.disk);
            errors += 1;
        }
        if self.resources.cpus == 0 {
            log::error!("resources.cpus must be at least 1");
            errors += 1;
        }

        if let (Some(start), Some(stop)) = (self.tool.start, self.tool.stop) {
            if stop <= start {
                log::error!("tool.stop ({stop}) must be greater than tool.start ({start})");
                errors += 1;
            }
        }

        if let Some(sweep) = &mut self.tool.sweep {
            errors += check_sweep(sweep);
        }

        errors += self.check_paths();

        if errors == 0 {
            Ok(())
        } else {
            Err(Error::Invalid(errors))
        }
    }

    /// Workspaces under `output_base` are wiped on every run,
    /// so inputs and manifests must live outside it.
    fn check_paths(&self) -> usize {
        let output_base = comparable_path(&self.paths.output_base);
        let mut errors = 0;
        for (key, path) in [
            ("paths.input_base", &self.paths.input_base),
            ("paths.csv_base", &self.paths.csv_base),
        ] {
            if comparable_path(path).starts_with(&output_base) {
                log::error!(
                    "{key} {:?} is inside paths.output_base {:?}; it would be deleted when workspaces are recreated",
                    path,
                    self.paths.output_base
                );
                errors += 1;
            }
        }
        errors
    }

    pub fn manifest_schema(&self) -> ManifestSchema {
        ManifestSchema {
            has_header: self.manifest.has_header,
            id_column: self.manifest.id_column,
        }
    }

    pub fn resources(&self) -> Resources {
        Resources {
            cpus: self.resources.cpus,
            memory: self.resources.memory.clone(),
            disk: self.resources.disk.clone(),
        }
    }

    pub fn transfer_policy(&self) -> TransferPolicy {
        match self.transfer {
            Transfer::Yes => TransferPolicy::Yes,
            Transfer::No => TransferPolicy::No,
            Transfer::IfNeeded => TransferPolicy::IfNeeded,
        }
    }

    pub fn sweep(&self) -> Option<Sweep> {
        self.tool.sweep.as_ref().map(|sweep| Sweep {
            param: sweep.param.clone(),
            values: sweep.values.iter().map(ToString::to_string).collect(),
        })
    }
}

/// Normalizes `sweep.param` (underscores become dashes) and returns the number of errors found.
fn check_sweep(sweep: &mut SweepConfig) -> usize {
    let mut errors = 0;
    sweep.param = sweep.param.replace('_', "-");

    let Some((_, kind)) = SWEEP_PARAMS.iter().find(|(name, _)| *name == sweep.param) else {
        let known: Vec<&str> = SWEEP_PARAMS.iter().map(|(name, _)| *name).collect();
        log::error!(
            "tool.sweep.param \"{}\" is not supported; use one of: {}",
            sweep.param,
            known.join(", ")
        );
        return 1;
    };

    if sweep.values.is_empty() {
        log::error!("tool.sweep.values for {} is empty", sweep.param);
        errors += 1;
    }

    for value in &sweep.values {
        let ok = match (kind, value) {
            (ValueKind::Integer, SweepValue::Integer(_)) => true,
            (ValueKind::Number, SweepValue::Integer(_) | SweepValue::Number(_)) => true,
            (ValueKind::Text, SweepValue::Text(text)) => !text.is_empty() && !text.contains(','),
            _ => false,
        };
        if !ok {
            let expected = match kind {
                ValueKind::Integer => "an integer",
                ValueKind::Number => "a number",
                ValueKind::Text => "a non-empty string without commas",
            };
            log::error!(
                "tool.sweep.values: \"{value}\" is not valid for {}; expected {expected}",
                sweep.param
            );
            errors += 1;
        }
    }
    errors
}

/// `path` with `.` and `..` resolved, and its longest existing ancestor
/// canonicalized, so two spellings of the same location compare equal
/// even before the location exists.
fn comparable_path(path: &Path) -> PathBuf {
    let mut lexical = PathBuf::with_capacity(path.as_os_str().len());
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !lexical.pop() {
                    lexical.push(component);
                }
            }
            other => lexical.push(other),
        }
    }

    let mut existing = lexical.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return lexical,
        }
    }
    match existing.canonicalize() {
        Ok(mut resolved) => {
            resolved.extend(missing.iter().rev());
            resolved
        }
        Err(_) => lexical,
    }
}

/// Usable as a path component and inside a submit description.
fn is_safe_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && !s.starts_with('.')
}

fn default_true() -> bool {
    true
}

fn default_id_column() -> usize {
    manifest::DEFAULT_ID_COLUMN
}

fn default_cpus() -> u32 {
    1
}

fn default_memory() -> String {
    String::from("2GB")
}

fn default_disk() -> String {
    String::from("4GB")
}

fn default_submit_command() -> Vec<String> {
    vec![String::from("condor_submit")]
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "\
sim_name: daq_sweep
sub_runs: 4
paths:
  csv_base: manifests
  input_base: /data/fil
  output_base: /scratch/slices
manifest:
  has_header: true
  id_column: 1
resources:
  cpus: 2
  memory: 3GB
  disk: 10GB
transfer: if_needed
tool:
  command: [python3, /opt/dslab/daq_slices_sweep.py]
  sweep:
    param: pre_threshold
    values: [2.5, 3, 3.5]
  seeds: [1234, 1235]
  start: 0
  stop: 100
submit_command: [condor_submit, -batch-name, sweep]
";

    const MINIMAL: &str = "\
sim_name: sim
paths: { csv_base: csv, input_base: in, output_base: out }
tool: { command: [slicer] }
";

    #[test]
    fn test_parse_full() -> Result<()> {
        let mut config: SubmitConfig = serde_yaml::from_str(FULL)?;
        config.preflight()?;
        assert_eq!(config.sim_name, "daq_sweep");
        assert_eq!(config.sub_runs, Some(4));
        assert_eq!(config.transfer_policy(), TransferPolicy::IfNeeded);
        assert_eq!(config.resources().cpus, 2);
        assert_eq!(config.tool.seeds, Some([1234, 1235]));

        let sweep = config.sweep().unwrap();
        assert_eq!(sweep.param, "pre-threshold");
        assert_eq!(sweep.values, vec!["2.5", "3", "3.5"]);
        assert_eq!(config.submit_command.len(), 3);
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let mut config: SubmitConfig = serde_yaml::from_str(MINIMAL)?;
        config.preflight()?;
        assert_eq!(config.sub_runs, None);
        assert_eq!(config.manifest_schema(), ManifestSchema::default());
        assert_eq!(config.resources(), Resources::default());
        assert_eq!(config.transfer, Transfer::No);
        assert_eq!(config.submit_command, vec!["condor_submit"]);
        assert!(config.sweep().is_none());
        Ok(())
    }

    #[test]
    fn test_transfer_no_is_a_string() -> Result<()> {
        let text = format!("{MINIMAL}transfer: no\n");
        let config: SubmitConfig = serde_yaml::from_str(&text)?;
        assert_eq!(config.transfer, Transfer::No);
        Ok(())
    }

    #[test]
    fn test_unknown_field_rejected() {
        let text = format!("{MINIMAL}priority: 5\n");
        assert!(serde_yaml::from_str::<SubmitConfig>(&text).is_err());
    }

    #[test]
    fn test_resolve_relative_paths() -> Result<()> {
        let mut config: SubmitConfig = serde_yaml::from_str(FULL)?;
        config.resolve_paths(Path::new("/etc/sweeps"));
        assert_eq!(config.paths.csv_base, PathBuf::from("/etc/sweeps/manifests"));
        assert_eq!(config.paths.input_base, PathBuf::from("/data/fil"));
        Ok(())
    }

    fn preflight_errors(text: &str) -> usize {
        let mut config: SubmitConfig = serde_yaml::from_str(text).unwrap();
        match config.preflight() {
            Ok(()) => 0,
            Err(Error::Invalid(n)) => n,
        }
    }

    fn with_tool(tool: &str) -> String {
        MINIMAL.replace("{ command: [slicer] }", tool)
    }

    #[test]
    fn test_bad_resources() {
        assert_eq!(
            preflight_errors(&format!("{MINIMAL}resources: {{ memory: lots, cpus: 0 }}\n")),
            2
        );
    }

    #[test]
    fn test_sweep_validation() {
        let ok = with_tool("{ command: [x], sweep: { param: snr, values: [10, 20.5] } }");
        assert_eq!(preflight_errors(&ok), 0);

        let unknown = with_tool("{ command: [x], sweep: { param: gain, values: [1] } }");
        assert_eq!(preflight_errors(&unknown), 1);

        let empty = with_tool("{ command: [x], sweep: { param: snr, values: [] } }");
        assert_eq!(preflight_errors(&empty), 1);

        let not_int = with_tool("{ command: [x], sweep: { param: pre-trigger, values: [1, 2.5] } }");
        assert_eq!(preflight_errors(&not_int), 1);

        let text_for_number = with_tool("{ command: [x], sweep: { param: jitter, values: [fast] } }");
        assert_eq!(preflight_errors(&text_for_number), 1);

        let spectra = with_tool("{ command: [x], sweep: { param: noise_spectrum, values: [a.npy, 'b,c.npy'] } }");
        assert_eq!(preflight_errors(&spectra), 1);
    }

    #[test]
    fn test_misc_validation() {
        assert_eq!(preflight_errors(&with_tool("{ command: [] }")), 1);
        assert_eq!(
            preflight_errors(&with_tool("{ command: [x], start: 10, stop: 5 }")),
            1
        );
        assert_eq!(
            preflight_errors(&MINIMAL.replace("sim_name: sim", "sim_name: 'my sim'")),
            1
        );
    }

    #[test]
    fn test_sweep_value_display() {
        let values = [
            SweepValue::Integer(3),
            SweepValue::Number(3.0),
            SweepValue::Number(2.5),
            SweepValue::Text("pink.npy".to_owned()),
        ];
        let shown: Vec<String> = values.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["3", "3.0", "2.5", "pink.npy"]);
    }

    #[test]
    fn test_inputs_inside_output_rejected() {
        let paths = |csv: &str, input: &str, output: &str| {
            MINIMAL.replace(
                "{ csv_base: csv, input_base: in, output_base: out }",
                &format!("{{ csv_base: {csv}, input_base: {input}, output_base: {output} }}"),
            )
        };
        assert_eq!(preflight_errors(&paths("/a/csv", "/a/fil", "/a/out")), 0);
        assert_eq!(preflight_errors(&paths("/a/csv", "/a/out", "/a/out")), 1);
        assert_eq!(preflight_errors(&paths("/a/csv", "/a/out/fil", "/a/out/")), 1);
        assert_eq!(preflight_errors(&paths("/a/out/x/../csv", "/a/fil", "/a/./out")), 1);
        assert_eq!(preflight_errors(&paths("/a/out", "/a/out", "/a")), 2);
        // a sibling sharing a name prefix is fine:
        assert_eq!(preflight_errors(&paths("/a/csv", "/a/output", "/a/out")), 0);
    }

    #[test]
    fn test_comparable_path_follows_existing_symlinks() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let real = dir.path().join("real");
        std::fs::create_dir(&real)?;
        #[cfg(unix)]
        {
            let link = dir.path().join("link");
            std::os::unix::fs::symlink(&real, &link)?;
            assert_eq!(
                comparable_path(&link.join("sim_0/new")),
                real.canonicalize()?.join("sim_0/new")
            );
        }
        assert_eq!(
            comparable_path(&real.join("a/../b")),
            real.canonicalize()?.join("b")
        );
        Ok(())
    }
}
