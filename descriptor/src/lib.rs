//! Text generation for one batch-submission unit: the scheduler descriptor
//! and the wrapper script each queued task runs.
//!
//! Nothing in here touches the filesystem; writing the artifacts is up to the caller.

/// Scheduler- and runtime-bound values
mod deferred;
pub use deferred::{Deferred, DescriptorArg, RuntimeArg};

/// Validated input identifiers
mod identifier;
pub use identifier::{validate_all, Identifier};

/// Quoting for generation-time constants
mod quote;
pub use quote::single_quote;

/// Low-level bash text writer
mod script_writer;
use script_writer::ScriptWriter;

/// Submission descriptor
mod descriptor;
pub use descriptor::{
    is_quantity, DescriptorBuilder, DescriptorConfig, PathTemplate, QueueEntry, Resources,
    SubmissionDescriptor, TransferPolicy,
};

/// Per-task wrapper script
mod job_script;
pub use job_script::{Invocation, JobScript, JobScriptConfig, Sweep, TaskBinding};

/// Extension of the raw simulation files the tool reads.
pub const INPUT_EXT: &str = "fil";
/// Extension of the slice files the tool writes.
pub const OUTPUT_EXT: &str = "slc";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unsafe identifier \"{identifier}\" at manifest position {index} (allowed: ASCII letters, digits, '.', '_', '-', '+'; must not start with '-' or '.')")]
    UnsafeIdentifier { index: usize, identifier: String },
    #[error("Path can't be used in a submit description or script: {0:?}")]
    UnsafePath(std::path::PathBuf),
    #[error("Invalid resource quantity for {0}: \"{1}\"")]
    InvalidQuantity(&'static str, String),
    #[error("Tool command is empty")]
    EmptyToolCommand,
}
