use std::fmt;

/// A value the scheduler binds when it queues a task, never known at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Id shared by every task queued from one descriptor.
    Cluster,
    /// Zero-based position of a task within its cluster.
    Process,
}

impl fmt::Display for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster => f.write_str("$(Cluster)"),
            Self::Process => f.write_str("$(Process)"),
        }
    }
}

/// One token on an `arguments` line of the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorArg {
    Literal(String),
    Deferred(Deferred),
}

impl fmt::Display for DescriptorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Deferred(d) => d.fmt(f),
        }
    }
}

/// Positional arguments the job script receives when a task executes.
/// Order here is the order on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeArg {
    TaskIndex,
    ClusterId,
    Identifier,
}

impl RuntimeArg {
    pub const ALL: [RuntimeArg; 3] = [Self::TaskIndex, Self::ClusterId, Self::Identifier];

    /// 1-based shell position (`$1`, `$2`...).
    pub fn position(self) -> usize {
        match self {
            Self::TaskIndex => 1,
            Self::ClusterId => 2,
            Self::Identifier => 3,
        }
    }

    /// Name of the shell variable the script assigns it to.
    pub fn var_name(self) -> &'static str {
        match self {
            Self::TaskIndex => "TASK_INDEX",
            Self::ClusterId => "CLUSTER_ID",
            Self::Identifier => "IDENTIFIER",
        }
    }
}
