use std::fmt;

/// Runs every selected sub-run through its states
mod submission_driver;
pub use submission_driver::{SubRunReport, SubmissionDriver};

/// Run a subprocess
mod run_cmd;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Submission command failed: {0}")]
    SubmissionCommandFailed(String),
}

/// For re-throwing after we've printed a list of errors to the user.
#[derive(Debug, thiserror::Error)]
#[error("{0} failed due to {1} errors")]
pub struct AggregatedErrors(pub String, pub usize);

/// How far a sub-run has gotten. Each state implies all the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubRunState {
    Start,
    LayoutPrepared,
    ManifestRead,
    DescriptorWritten,
    ScriptWritten,
    Submitted,
}

impl fmt::Display for SubRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "START",
            Self::LayoutPrepared => "LAYOUT_PREPARED",
            Self::ManifestRead => "MANIFEST_READ",
            Self::DescriptorWritten => "DESCRIPTOR_WRITTEN",
            Self::ScriptWritten => "SCRIPT_WRITTEN",
            Self::Submitted => "SUBMITTED",
        })
    }
}
