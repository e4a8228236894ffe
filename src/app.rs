use anyhow::{Context, Result};
use colored::Colorize;

use crate::exec::SubmissionDriver;
use crate::fs::Fs;
use crate::prep::SubRun;
use crate::settings::{Selection, Settings};
use crate::ui::Ui;

/// This struct actually runs the command-line app.
pub struct App {
    /// Interpreted command line settings
    settings: Settings,
    /// Filesystem interface
    fs: Fs,
    /// User interface
    ui: Ui,
}

impl App {
    /// Create a new `App`.
    pub fn new(settings: Settings) -> Self {
        let fs = Fs::new(settings.output_base(), settings.dry_run);
        let ui = Ui::new(&settings);
        Self { settings, fs, ui }
    }

    /// Run the app: show the plan, confirm, then submit every selected sub-run.
    pub fn run(mut self) -> Result<()> {
        self.ui
            .verbose_msg(&format!("Using config file {:?}", self.settings.config_path));
        self.ui
            .verbose_msg(&format!("Using output directory {:?}", self.settings.output_base()));
        self.fs.ensure_output_dir_exists(self.ui.verbose)?;

        let indices = self.settings.selection.indices();
        if indices.is_empty() {
            eprintln!("{}", "No sub-runs to process; exiting.".green());
            return Ok(());
        }

        self.print_plan(&indices);
        if self.settings.dry_run {
            eprintln!("{}", "Dry run. Nothing was written or submitted.".magenta());
            return Ok(());
        }
        if !self.ui.confirm("Proceed?")? {
            return Ok(());
        }
        eprintln!();

        let mut driver = SubmissionDriver::new(&self.settings, &self.fs, &self.ui);
        let reports = match &self.settings.selection {
            Selection::All(count) => driver.run(*count),
            Selection::Only(indices) => driver.run_indices(indices),
        }
        .context("while submitting sub-runs")?;

        log::debug!("{} sub-run(s) completed: {:?}", reports.len(), reports);
        Ok(())
    }

    /// List the workspaces that will be created or wiped.
    /// In a dry run, also count the tasks each manifest would produce.
    fn print_plan(&self, indices: &[usize]) {
        let schema = self.settings.config.manifest_schema();
        let action = if self.settings.submit {
            "will be recreated and submitted"
        } else {
            "will be recreated (not submitted)"
        };
        eprintln!("\nThe following sub-runs {}:", action.green());

        for &index in indices {
            let sub_run = SubRun::new(index, &self.settings.config, &self.fs);
            let label = if self.fs.exists(&sub_run.workspace) {
                "RECREATE".red()
            } else {
                "CREATE".green()
            };
            eprint!("{label} {}", sub_run.workspace.display());

            if self.settings.dry_run {
                match manifest::read(&sub_run.manifest, &schema) {
                    Ok(ids) => eprint!(" ({} task(s))", ids.len()),
                    Err(e) => eprint!(" ({}: {e})", "unreadable manifest".red()),
                }
            }
            eprintln!();

            if self.ui.verbose {
                eprintln!("    manifest: {}", sub_run.manifest.display());
                eprintln!("    inputs:   {}", sub_run.input_dir.display());
            }
        }
        eprintln!();
    }
}
