/// Identity and derived paths of a single sub-run.
mod sub_run;
pub use sub_run::SubRun;

/// Clean up old workspaces and create the directories a sub-run writes to.
mod layout_planner;
pub use layout_planner::{LayoutPlanner, Workspace};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Workspace is not writable: {0}")]
    WorkspaceUnwritable(String),
}
