use std::path::{Path, PathBuf};

use crate::{Deferred, DescriptorArg, Error, Identifier, RuntimeArg};

/// Width the keys in the header block are padded to.
const KEY_WIDTH: usize = 24;

/// Resource requests applied to every task in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    pub cpus: u32,
    /// e.g. "2GB"; bare numbers are megabytes to the scheduler.
    pub memory: String,
    /// e.g. "4GB"; bare numbers are kilobytes to the scheduler.
    pub disk: String,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            cpus: 1,
            memory: "2GB".to_owned(),
            disk: "4GB".to_owned(),
        }
    }
}

/// `should_transfer_files` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferPolicy {
    Yes,
    /// rely on a shared filesystem.
    #[default]
    No,
    IfNeeded,
}

impl TransferPolicy {
    fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::IfNeeded => "IF_NEEDED",
        }
    }
}

/// A path whose file name contains a scheduler-bound value,
/// rendered as `{dir}/{stem}{var}.{extension}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    pub dir: PathBuf,
    pub stem: String,
    pub var: Deferred,
    pub extension: &'static str,
}

impl PathTemplate {
    fn render(&self) -> Result<String, Error> {
        let dir = checked_path(&self.dir)?;
        if !is_safe_word(&self.stem) {
            return Err(Error::UnsafePath(self.dir.join(&self.stem)));
        }
        Ok(format!("{dir}/{}{}.{}", self.stem, self.var, self.extension))
    }
}

/// Global parameters shared by every task of one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorConfig {
    /// Sub-run name, used in the header comment.
    pub label: String,
    /// Job wrapper script every task runs.
    pub executable: PathBuf,
    pub resources: Resources,
    pub transfer: TransferPolicy,
    /// Scheduler event log, one per cluster.
    pub log: PathTemplate,
    /// Per-task stdout.
    pub output: PathTemplate,
    /// Per-task stderr.
    pub error: PathTemplate,
}

impl DescriptorConfig {
    /// Standard layout: `{log_dir}/{label}_$(Cluster).log`,
    /// `{log_dir}/$(Process).out`, `{log_dir}/$(Process).err`.
    pub fn with_log_dir(
        label: &str,
        executable: &Path,
        log_dir: &Path,
        resources: Resources,
        transfer: TransferPolicy,
    ) -> Self {
        let template = |stem: String, var, extension| PathTemplate {
            dir: log_dir.to_path_buf(),
            stem,
            var,
            extension,
        };
        Self {
            label: label.to_owned(),
            executable: executable.to_path_buf(),
            resources,
            transfer,
            log: template(format!("{label}_"), Deferred::Cluster, "log"),
            output: template(String::new(), Deferred::Process, "out"),
            error: template(String::new(), Deferred::Process, "err"),
        }
    }
}

/// One queued task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Position of the identifier in the manifest; matches `$(Process)`.
    pub task_index: usize,
    pub cluster: Deferred,
    pub identifier: Identifier,
}

impl QueueEntry {
    /// The descriptor-side value of a runtime argument.
    pub fn argument(&self, arg: RuntimeArg) -> DescriptorArg {
        match arg {
            RuntimeArg::TaskIndex => DescriptorArg::Literal(self.task_index.to_string()),
            RuntimeArg::ClusterId => DescriptorArg::Deferred(self.cluster),
            RuntimeArg::Identifier => DescriptorArg::Literal(self.identifier.to_string()),
        }
    }

    /// Arguments in the order the job script expects them.
    pub fn arguments(&self) -> Vec<DescriptorArg> {
        RuntimeArg::ALL.iter().map(|arg| self.argument(*arg)).collect()
    }

    /// `"0 $(Cluster) alpha"`
    fn quoted_arguments(&self) -> String {
        let words: Vec<String> = self.arguments().iter().map(ToString::to_string).collect();
        format!("\"{}\"", words.join(" "))
    }
}

/// A complete submit description: header plus ordered queue entries.
#[derive(Debug)]
pub struct SubmissionDescriptor<'a> {
    builder: &'a DescriptorBuilder,
    entries: Vec<QueueEntry>,
}

impl SubmissionDescriptor<'_> {
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Render the full descriptor text.
    pub fn render(&self) -> String {
        let mut buf = String::with_capacity(512 + 48 * self.entries.len());
        self.render_into(&mut buf);
        buf
    }

    /// Render into `buf`, replacing its contents.
    pub fn render_into(&self, buf: &mut String) {
        buf.clear();
        buf.push_str(&format!(
            "# Submit description for {}: {} task(s)\n",
            self.builder.config.label,
            self.entries.len()
        ));
        buf.push_str(&self.builder.header);
        for entry in &self.entries {
            buf.push('\n');
            push_line(buf, "arguments", &entry.quoted_arguments());
            buf.push_str("queue\n");
        }
    }
}

/// Assembles [`SubmissionDescriptor`]s from a validated [`DescriptorConfig`].
#[derive(Debug)]
pub struct DescriptorBuilder {
    config: DescriptorConfig,
    /// `key = value` block, identical for every descriptor this builder makes.
    header: String,
}

impl DescriptorBuilder {
    pub fn new(config: DescriptorConfig) -> Result<Self, Error> {
        let res = &config.resources;
        if !is_quantity(&res.memory) {
            return Err(Error::InvalidQuantity("memory", res.memory.clone()));
        }
        if !is_quantity(&res.disk) {
            return Err(Error::InvalidQuantity("disk", res.disk.clone()));
        }

        let mut header = String::with_capacity(512);
        push_line(&mut header, "universe", "vanilla");
        push_line(&mut header, "executable", checked_path(&config.executable)?);
        push_line(&mut header, "request_cpus", &res.cpus.to_string());
        push_line(&mut header, "request_memory", res.memory.trim());
        push_line(&mut header, "request_disk", res.disk.trim());
        push_line(&mut header, "should_transfer_files", config.transfer.as_str());
        if config.transfer != TransferPolicy::No {
            push_line(&mut header, "when_to_transfer_output", "ON_EXIT");
        }
        push_line(&mut header, "log", &config.log.render()?);
        push_line(&mut header, "output", &config.output.render()?);
        push_line(&mut header, "error", &config.error.render()?);

        Ok(Self { config, header })
    }

    pub fn config(&self) -> &DescriptorConfig {
        &self.config
    }

    /// One queue entry per identifier, task index = position.
    pub fn build(&self, identifiers: &[Identifier]) -> SubmissionDescriptor<'_> {
        let entries = identifiers
            .iter()
            .enumerate()
            .map(|(task_index, identifier)| QueueEntry {
                task_index,
                cluster: Deferred::Cluster,
                identifier: identifier.clone(),
            })
            .collect();
        log::trace!(
            "built descriptor for {} with {} entries",
            self.config.label,
            identifiers.len()
        );
        SubmissionDescriptor {
            builder: self,
            entries,
        }
    }
}

fn push_line(buf: &mut String, key: &str, val: &str) {
    buf.push_str(&format!("{key:<width$}= {val}\n", width = KEY_WIDTH));
}

/// A number with an optional unit suffix: `512`, `2GB`, `1.5G`, `100 MB`.
pub fn is_quantity(s: &str) -> bool {
    let s = s.trim();
    let digits_end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(digits_end);
    if number.is_empty() || number.parse::<f64>().is_err() {
        return false;
    }
    matches!(
        unit.trim_start().to_ascii_uppercase().as_str(),
        "" | "K" | "KB" | "M" | "MB" | "G" | "GB" | "T" | "TB"
    )
}

/// A path must be UTF-8 and free of characters that would break a
/// `key = value` line or be taken for a macro.
fn checked_path(path: &Path) -> Result<&str, Error> {
    match path.to_str() {
        Some(s) if !s.is_empty() && is_safe_word(s) => Ok(s),
        _ => Err(Error::UnsafePath(path.to_path_buf())),
    }
}

fn is_safe_word(s: &str) -> bool {
    !s.chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '$' | '#'))
}
