use std::path::{Path, PathBuf};

use crate::{Error, Identifier, RuntimeArg, ScriptWriter, INPUT_EXT, OUTPUT_EXT};

const INPUT_DIR_VAR: &str = "INPUT_DIR";
const OUTPUT_DIR_VAR: &str = "OUTPUT_DIR";
const INPUT_PATH_VAR: &str = "INPUT_PATH";
const OUTPUT_PATH_VAR: &str = "OUTPUT_PATH";

/// A parameter the tool sweeps over, passed as `--{param} v1,v2,...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sweep {
    pub param: String,
    pub values: Vec<String>,
}

/// Everything fixed at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobScriptConfig {
    /// Directory holding the `.fil` inputs for this sub-run.
    pub input_dir: PathBuf,
    /// Directory the `.slc` outputs go to (the workspace `slices/` dir).
    pub output_dir: PathBuf,
    /// Program and any leading arguments, e.g. `["python3", "daq_slices_sweep.py"]`.
    pub tool: Vec<String>,
    pub sweep: Option<Sweep>,
    /// numpy and numba random seeds.
    pub seeds: Option<(u64, u64)>,
    /// First event to process.
    pub start: Option<u64>,
    /// Event to stop at.
    pub stop: Option<u64>,
}

/// The three values a task receives at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBinding {
    pub task_index: usize,
    pub cluster_id: u64,
    pub identifier: Identifier,
}

/// What the script does for one particular binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Full command line, program first.
    pub argv: Vec<String>,
}

/// The wrapper script shared by all tasks of a descriptor.
///
/// [`JobScript::render`] produces the bash text handed to the scheduler;
/// [`JobScript::resolve`] computes, for a given runtime binding, the exact
/// paths and command line that text will produce when it runs.
#[derive(Debug, Clone)]
pub struct JobScript {
    input_dir: String,
    output_dir: String,
    tool: Vec<String>,
    /// tool arguments after `-i`/`-o`, fixed for every task.
    fixed_args: Vec<String>,
}

impl JobScript {
    pub fn new(config: JobScriptConfig) -> Result<Self, Error> {
        if config.tool.is_empty() || config.tool[0].is_empty() {
            return Err(Error::EmptyToolCommand);
        }
        let input_dir = dir_string(&config.input_dir)?;
        let output_dir = dir_string(&config.output_dir)?;

        let mut fixed_args = Vec::with_capacity(8);
        if let Some(sweep) = &config.sweep {
            fixed_args.push(format!("--{}", sweep.param));
            fixed_args.push(sweep.values.join(","));
        }
        if let Some((np_seed, nb_seed)) = config.seeds {
            fixed_args.push("--seeds".to_owned());
            fixed_args.push(np_seed.to_string());
            fixed_args.push(nb_seed.to_string());
        }
        if let Some(start) = config.start {
            fixed_args.push("--start".to_owned());
            fixed_args.push(start.to_string());
        }
        if let Some(stop) = config.stop {
            fixed_args.push("--stop".to_owned());
            fixed_args.push(stop.to_string());
        }

        Ok(Self {
            input_dir,
            output_dir,
            tool: config.tool,
            fixed_args,
        })
    }

    /// Render the script text.
    pub fn render(&self) -> String {
        let mut buf = String::with_capacity(1024);
        self.render_into(&mut buf);
        buf
    }

    /// Render into `buf`, replacing its contents.
    pub fn render_into(&self, buf: &mut String) {
        let mut script = ScriptWriter::new(buf);
        script.write_prefix();
        script.write_arg_count_check();
        script.write_runtime_args();

        script.write_comment("Fixed when this script was generated:");
        script.write_constant(INPUT_DIR_VAR, &self.input_dir);
        script.write_constant(OUTPUT_DIR_VAR, &self.output_dir);
        script.write_derived_path(INPUT_PATH_VAR, INPUT_DIR_VAR, INPUT_EXT);
        script.write_derived_path(OUTPUT_PATH_VAR, OUTPUT_DIR_VAR, OUTPUT_EXT);
        script.write_blank();

        script.write_echo(&format!(
            "task ${{{}}} of cluster ${{{}}}: ${{{INPUT_PATH_VAR}}} -> ${{{OUTPUT_PATH_VAR}}}",
            RuntimeArg::TaskIndex.var_name(),
            RuntimeArg::ClusterId.var_name(),
        ));
        script.write_exec(
            &self.tool,
            &[("-i", INPUT_PATH_VAR), ("-o", OUTPUT_PATH_VAR)],
            &self.fixed_args,
        );
    }

    /// Paths and command line for one task.
    pub fn resolve(&self, binding: &TaskBinding) -> Invocation {
        let input = Path::new(&self.input_dir)
            .join(format!("{}.{INPUT_EXT}", binding.identifier));
        let output = Path::new(&self.output_dir)
            .join(format!("{}.{OUTPUT_EXT}", binding.identifier));

        let mut argv = Vec::with_capacity(self.tool.len() + 4 + self.fixed_args.len());
        argv.extend(self.tool.iter().cloned());
        argv.push("-i".to_owned());
        argv.push(input.to_string_lossy().into_owned());
        argv.push("-o".to_owned());
        argv.push(output.to_string_lossy().into_owned());
        argv.extend(self.fixed_args.iter().cloned());

        Invocation {
            input,
            output,
            argv,
        }
    }
}

/// UTF-8 dir path with no trailing slash, so `"${DIR}/x"` and `Path::join` agree.
fn dir_string(path: &Path) -> Result<String, Error> {
    match path.to_str() {
        Some(s) if !s.is_empty() && !s.contains('\n') => {
            let trimmed = s.trim_end_matches('/');
            if trimmed.is_empty() {
                Ok("/".to_owned())
            } else {
                Ok(trimmed.to_owned())
            }
        }
        _ => Err(Error::UnsafePath(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JobScriptConfig {
        JobScriptConfig {
            input_dir: PathBuf::from("/data/fil/sim_0"),
            output_dir: PathBuf::from("/out/sim_0/slices"),
            tool: vec!["python3".to_owned(), "/opt/daq_slices_sweep.py".to_owned()],
            sweep: Some(Sweep {
                param: "pre-threshold".to_owned(),
                values: vec!["2.5".to_owned(), "3".to_owned()],
            }),
            seeds: None,
            start: None,
            stop: None,
        }
    }

    fn binding(task_index: usize, id: &str) -> TaskBinding {
        TaskBinding {
            task_index,
            cluster_id: 4711,
            identifier: Identifier::new(task_index, id).unwrap(),
        }
    }

    #[test]
    fn test_resolve_paths() {
        let script = JobScript::new(config()).unwrap();
        let inv = script.resolve(&binding(1, "beta"));
        assert_eq!(inv.input, PathBuf::from("/data/fil/sim_0/beta.fil"));
        assert_eq!(inv.output, PathBuf::from("/out/sim_0/slices/beta.slc"));
        assert_eq!(
            inv.argv,
            vec![
                "python3",
                "/opt/daq_slices_sweep.py",
                "-i",
                "/data/fil/sim_0/beta.fil",
                "-o",
                "/out/sim_0/slices/beta.slc",
                "--pre-threshold",
                "2.5,3",
            ]
        );
    }

    #[test]
    fn test_resolve_ignores_index_and_cluster() {
        let script = JobScript::new(config()).unwrap();
        let a = script.resolve(&binding(0, "alpha"));
        let mut other = binding(9, "alpha");
        other.cluster_id = 1;
        assert_eq!(a, script.resolve(&other));
    }

    #[test]
    fn test_render_contents() {
        let text = JobScript::new(config()).unwrap().render();
        assert!(text.starts_with("#!/usr/bin/env bash\nset -euo pipefail\n"));
        assert!(text.contains("if [ \"$#\" -ne 3 ]; then\n"));
        assert!(text.contains("IDENTIFIER=\"$3\"\n"));
        assert!(text.contains("INPUT_DIR='/data/fil/sim_0'\n"));
        assert!(text.contains("OUTPUT_DIR='/out/sim_0/slices'\n"));
        assert!(text.contains("INPUT_PATH=\"${INPUT_DIR}/${IDENTIFIER}.fil\"\n"));
        assert!(text.contains("OUTPUT_PATH=\"${OUTPUT_DIR}/${IDENTIFIER}.slc\"\n"));
        assert!(text.contains(
            "exec 'python3' '/opt/daq_slices_sweep.py' -i \"${INPUT_PATH}\" -o \"${OUTPUT_PATH}\" '--pre-threshold' '2.5,3'\n"
        ));
        assert!(text.contains("echo \"task ${TASK_INDEX} of cluster ${CLUSTER_ID}: "));
    }

    #[test]
    fn test_render_is_deterministic() {
        let script = JobScript::new(config()).unwrap();
        assert_eq!(script.render(), script.render());
    }

    #[test]
    fn test_optional_args() {
        let mut cfg = config();
        cfg.sweep = None;
        cfg.seeds = Some((1234, 1235));
        cfg.start = Some(10);
        cfg.stop = Some(20);
        let script = JobScript::new(cfg).unwrap();
        let argv = script.resolve(&binding(0, "a")).argv;
        assert_eq!(
            &argv[6..],
            &["--seeds", "1234", "1235", "--start", "10", "--stop", "20"]
        );
        assert!(script
            .render()
            .ends_with("'--seeds' '1234' '1235' '--start' '10' '--stop' '20'\n"));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let mut cfg = config();
        cfg.input_dir = PathBuf::from("/data/fil/sim_0/");
        let script = JobScript::new(cfg).unwrap();
        assert!(script.render().contains("INPUT_DIR='/data/fil/sim_0'\n"));
        assert_eq!(
            script.resolve(&binding(0, "x")).input,
            PathBuf::from("/data/fil/sim_0/x.fil")
        );
    }

    #[test]
    fn test_quotes_constants() {
        let mut cfg = config();
        cfg.input_dir = PathBuf::from("/data/it's here");
        let text = JobScript::new(cfg).unwrap().render();
        assert!(text.contains("INPUT_DIR='/data/it'\\''s here'\n"));
    }

    #[test]
    fn test_empty_tool() {
        let mut cfg = config();
        cfg.tool.clear();
        assert!(matches!(JobScript::new(cfg), Err(Error::EmptyToolCommand)));
    }
}
