use std::fs::File;
use std::io::{stderr, stdout, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;

use crate::fs::Fs;

use super::Error;

/// Run a subprocess, storing stdout and stderr in the given `workspace`.
/// Based on:
/// <https://stackoverflow.com/questions/66060139/how-to-tee-stdout-stderr-from-a-subprocess-in-rust>
pub fn run_cmd(
    cmd: &mut Command,
    workspace: &Path,
    fs: &Fs,
    pathbuf: &mut PathBuf,
    verbose: bool,
) -> Result<bool> {
    if verbose {
        eprintln!("{}", "Creating stdout and stderr files...".magenta());
    }

    let (out_file, err_file) = make_log_files(fs, workspace, pathbuf)?;

    if verbose {
        eprintln!("{}", "Running command...".magenta());
    }
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::SubmissionCommandFailed(format!("{}: {e}", describe(cmd))))?;

    let child_out = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("Cannot attach to child stdout"))?;
    let child_err = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("Cannot attach to child stderr"))?;

    let thread_out = thread::spawn(move || communicate(child_out, out_file, stdout()));
    let thread_err = thread::spawn(move || communicate(child_err, err_file, stderr()));

    thread_out
        .join()
        .map_err(|_| anyhow!("Error joining stdout thread"))?
        .context("communicating with child stdout")?;
    thread_err
        .join()
        .map_err(|_| anyhow!("Error joining stderr thread"))?
        .context("communicating with child stderr")?;

    let status = child.wait().context("waiting on child process")?;

    if verbose {
        eprintln!("\n{} with {status}.", "Process finished".green());
    }
    Ok(status.success())
}

/// `program arg1 arg2`, for error messages.
pub fn describe(cmd: &Command) -> String {
    let mut s = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        s.push(' ');
        s.push_str(&arg.to_string_lossy());
    }
    s
}

fn communicate<R: Read, W: Write>(
    mut stream: R,
    mut file: File,
    mut output: W,
) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];
    loop {
        let num_read = stream.read(&mut buf)?;
        if num_read == 0 {
            break;
        }

        let buf = &buf[..num_read];
        file.write_all(buf)?;
        output.write_all(buf)?;
    }

    Ok(())
}

fn make_log_files(fs: &Fs, workspace: &Path, pathbuf: &mut PathBuf) -> Result<(File, File)> {
    let out_file = fs
        .create_file(fs.submit_stdout(workspace, pathbuf))
        .context("creating submit_stdout.txt file")?;

    let err_file = fs
        .create_file(fs.submit_stderr(workspace, pathbuf))
        .context("creating submit_stderr.txt file")?;

    Ok((out_file, err_file))
}
