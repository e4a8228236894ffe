use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use colored::Colorize;

use descriptor::{DescriptorBuilder, DescriptorConfig, JobScript, JobScriptConfig};

use crate::fs::Fs;
use crate::prep::{LayoutPlanner, SubRun};
use crate::settings::Settings;
use crate::ui::Ui;

use super::run_cmd::{describe, run_cmd};
use super::{AggregatedErrors, Error, SubRunState};

/// What happened to one sub-run that made it to its final state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRunReport {
    pub name: String,
    /// Number of queue entries in the descriptor.
    pub tasks: usize,
    /// `Submitted`, or `ScriptWritten` with `--no-submit`.
    pub state: SubRunState,
}

/// `SubmissionDriver` turns each selected sub-run into a submitted batch.
///
/// Sub-runs are processed one at a time, in index order, and share nothing.
/// For each one it prepares the workspace, reads the manifest, writes the
/// submit description and the job script, then hands the description to the
/// scheduler. A failing sub-run is reported and skipped; the rest of the batch
/// still runs unless `fail_fast` is set.
pub struct SubmissionDriver<'a> {
    settings: &'a Settings,
    /// Filesystem interface
    fs: &'a Fs,
    /// User interface
    ui: &'a Ui,
    /// reused for rendering descriptors and scripts
    strbuf: String,
    /// for whenever we need to create a path:
    pathbuf: PathBuf,
}

impl<'a> SubmissionDriver<'a> {
    pub fn new(settings: &'a Settings, fs: &'a Fs, ui: &'a Ui) -> Self {
        Self {
            settings,
            fs,
            ui,
            strbuf: String::with_capacity(4096),
            pathbuf: PathBuf::with_capacity(256),
        }
    }

    /// Process sub-runs `0..count`.
    pub fn run(&mut self, count: usize) -> Result<Vec<SubRunReport>> {
        let indices: Vec<usize> = (0..count).collect();
        self.run_indices(&indices)
    }

    /// Process the given sub-runs, in the order given.
    pub fn run_indices(&mut self, indices: &[usize]) -> Result<Vec<SubRunReport>> {
        let mut reports = Vec::with_capacity(indices.len());
        let mut failures = 0;

        for &index in indices {
            let sub_run = SubRun::new(index, &self.settings.config, self.fs);
            let mut state = SubRunState::Start;

            self.ui.start_timer();
            match self.process(&sub_run, &mut state) {
                Ok(report) => {
                    self.ui.print_elapsed(&sub_run.name);
                    reports.push(report);
                }
                Err(e) => {
                    failures += 1;
                    log::debug!("sub-run {} stopped after {state}", sub_run.name);
                    eprintln!(
                        "{} sub-run {} (manifest {}): {e:#}",
                        "ERROR".red(),
                        sub_run.name,
                        sub_run.manifest.display(),
                    );
                    if self.settings.fail_fast {
                        eprintln!("{}", "Stopping at first failure (--fail-fast).".red());
                        break;
                    }
                }
            }
        }

        let verb = if self.settings.submit { "Submitted" } else { "Prepared" };
        let msg = format!("{verb} {} of {} sub-runs.", reports.len(), indices.len());
        if failures == 0 {
            eprintln!("\n{}", msg.green());
            Ok(reports)
        } else {
            eprintln!("\n{}", msg.red());
            Err(AggregatedErrors(self.settings.config.sim_name.clone(), failures).into())
        }
    }

    /// Take one sub-run from `START` as far as it goes, recording progress in `state`.
    pub fn process(&mut self, sub_run: &SubRun, state: &mut SubRunState) -> Result<SubRunReport> {
        let config = &self.settings.config;
        eprintln!("{} {}", "PREPARE".green(), sub_run.name);

        self.ui
            .verbose_progress_debug("Preparing workspace", &sub_run.workspace);
        let workspace = LayoutPlanner::new(self.fs, self.ui.verbose).prepare(&sub_run.workspace)?;
        self.ui.done();
        *state = SubRunState::LayoutPrepared;

        self.ui.verbose_progress_debug("Reading manifest", &sub_run.manifest);
        let ids = manifest::read(&sub_run.manifest, &config.manifest_schema())?;
        self.ui.done();
        *state = SubRunState::ManifestRead;
        log::info!("{}: {} identifier(s) in manifest", sub_run.name, ids.len());

        for dup in manifest::duplicates(&ids) {
            log::warn!(
                "{}: identifier \"{dup}\" appears more than once; its tasks share an output file",
                sub_run.name
            );
        }
        let ids = descriptor::validate_all(ids)
            .with_context(|| format!("while checking identifiers in {:?}", sub_run.manifest))?;

        // build both artifacts before writing either:
        let script_path = self
            .fs
            .job_script(&workspace.root, &sub_run.name, &mut self.pathbuf)
            .to_path_buf();
        let builder = DescriptorBuilder::new(DescriptorConfig::with_log_dir(
            &sub_run.name,
            &script_path,
            &workspace.log,
            config.resources(),
            config.transfer_policy(),
        ))
        .context("while configuring submit description")?;
        let job_script = JobScript::new(JobScriptConfig {
            input_dir: sub_run.input_dir.clone(),
            output_dir: workspace.slices.clone(),
            tool: config.tool.command.clone(),
            sweep: config.sweep(),
            seeds: config.tool.seeds.map(|[np_seed, nb_seed]| (np_seed, nb_seed)),
            start: config.tool.start,
            stop: config.tool.stop,
        })
        .context("while configuring job script")?;

        let submission = builder.build(&ids);
        let tasks = submission.entries().len();

        let descriptor_path = self
            .fs
            .descriptor(&workspace.root, &sub_run.name, &mut self.pathbuf)
            .to_path_buf();
        self.ui
            .verbose_progress_debug("Writing submit description", &descriptor_path);
        submission.render_into(&mut self.strbuf);
        self.fs
            .write_file(&descriptor_path, &self.strbuf)
            .context("while writing submit description")?;
        self.ui.done();
        *state = SubRunState::DescriptorWritten;

        self.ui.verbose_progress_debug("Writing job script", &script_path);
        job_script.render_into(&mut self.strbuf);
        self.fs
            .write_file(&script_path, &self.strbuf)
            .context("while writing job script")?;
        self.fs
            .set_executable(&script_path)
            .context("while making job script executable")?;
        self.ui.done();
        *state = SubRunState::ScriptWritten;

        if !self.settings.submit {
            eprintln!("{} {} ({tasks} task(s), not submitted)", "WROTE".green(), sub_run.name);
            return Ok(self.report(sub_run, tasks, *state));
        }

        let (program, leading_args) = config
            .submit_command
            .split_first()
            .ok_or_else(|| Error::SubmissionCommandFailed("no submit command".to_owned()))?;
        let mut cmd = Command::new(program);
        cmd.args(leading_args).arg(&descriptor_path);

        let success = run_cmd(
            &mut cmd,
            &workspace.root,
            self.fs,
            &mut self.pathbuf,
            self.ui.verbose,
        )?;
        if !success {
            return Err(Error::SubmissionCommandFailed(describe(&cmd)).into());
        }
        *state = SubRunState::Submitted;

        eprintln!("{} {} ({tasks} task(s))", "SUBMITTED".green(), sub_run.name);
        Ok(self.report(sub_run, tasks, *state))
    }

    fn report(&self, sub_run: &SubRun, tasks: usize, state: SubRunState) -> SubRunReport {
        SubRunReport {
            name: sub_run.name.clone(),
            tasks,
            state,
        }
    }
}
