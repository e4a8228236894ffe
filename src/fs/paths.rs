use std::path::{Path, PathBuf};

use super::Fs;

/// Name of the workspace subdirectory the tool writes its slices to.
pub const SLICES_DIR: &str = "slices";
/// Name of the workspace subdirectory the scheduler writes task logs to.
pub const LOG_DIR: &str = "log";

/// Utility fns for making common types of paths.
/// These fns are based on their callsite use pattern,
/// so sometimes a prefix will be included
/// and sometimes it's assumed that we'll add it here.
impl Fs {
    /// $OUTPUT/sub_run
    pub fn workspace<'a>(&self, sub_run: &str, buf: &'a mut PathBuf) -> &'a Path {
        self.parts2(&self.output_prefix, sub_run, buf)
    }

    /// $OUTPUT/sub_run/slices
    pub fn slices_dir<'a>(&self, workspace: &Path, buf: &'a mut PathBuf) -> &'a Path {
        self.parts2(workspace, SLICES_DIR, buf)
    }

    /// $OUTPUT/sub_run/log
    pub fn log_dir<'a>(&self, workspace: &Path, buf: &'a mut PathBuf) -> &'a Path {
        self.parts2(workspace, LOG_DIR, buf)
    }

    /// $OUTPUT/sub_run/sub_run.sub
    pub fn descriptor<'a>(
        &self,
        workspace: &Path,
        sub_run: &str,
        buf: &'a mut PathBuf,
    ) -> &'a Path {
        self.parts2(workspace, sub_run, buf);
        buf.as_mut_os_string().push(".sub");
        &*buf
    }

    /// $OUTPUT/sub_run/sub_run.sh
    pub fn job_script<'a>(
        &self,
        workspace: &Path,
        sub_run: &str,
        buf: &'a mut PathBuf,
    ) -> &'a Path {
        self.parts2(workspace, sub_run, buf);
        buf.as_mut_os_string().push(".sh");
        &*buf
    }

    /// $OUTPUT/sub_run/submit_stdout.txt
    pub fn submit_stdout<'a>(&self, workspace: &Path, buf: &'a mut PathBuf) -> &'a Path {
        self.parts2(workspace, "submit_stdout.txt", buf)
    }

    /// $OUTPUT/sub_run/submit_stderr.txt
    pub fn submit_stderr<'a>(&self, workspace: &Path, buf: &'a mut PathBuf) -> &'a Path {
        self.parts2(workspace, "submit_stderr.txt", buf)
    }

    fn parts2<'a, T, U>(&self, p1: T, p2: U, buf: &'a mut PathBuf) -> &'a Path
    where
        T: AsRef<Path>,
        U: AsRef<Path>,
    {
        buf.clear();
        buf.push(p1);
        buf.push(p2);
        &*buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let fs = Fs::new(Path::new("/out"), true);
        let mut buf = PathBuf::new();
        let ws = fs.workspace("sim_2", &mut buf).to_path_buf();
        assert_eq!(ws, Path::new("/out/sim_2"));
        assert_eq!(
            fs.descriptor(Path::new("/out/daq.v2_0"), "daq.v2_0", &mut buf),
            Path::new("/out/daq.v2_0/daq.v2_0.sub")
        );
        assert_eq!(fs.slices_dir(&ws, &mut buf), Path::new("/out/sim_2/slices"));
        assert_eq!(fs.log_dir(&ws, &mut buf), Path::new("/out/sim_2/log"));
        assert_eq!(
            fs.descriptor(&ws, "sim_2", &mut buf),
            Path::new("/out/sim_2/sim_2.sub")
        );
        assert_eq!(
            fs.job_script(&ws, "sim_2", &mut buf),
            Path::new("/out/sim_2/sim_2.sh")
        );
    }
}
