use crate::{single_quote, RuntimeArg};

/// Utility for building the contents of a job wrapper script.
/// Note that it modifies a String reference held internally;
/// read that String to get the script's contents.
#[derive(Debug)]
pub struct ScriptWriter<'a> {
    strbuf: &'a mut String,
}

impl<'a> ScriptWriter<'a> {
    pub fn new(strbuf: &'a mut String) -> Self {
        Self { strbuf }
    }
}

impl ScriptWriter<'_> {
    /// shebang line and bash options
    pub fn write_prefix(&mut self) {
        self.strbuf.clear();
        self.strbuf.push_str("#!/usr/bin/env bash\nset -euo pipefail\n\n");
    }

    /// bail out with a usage message unless exactly the runtime args were passed.
    pub fn write_arg_count_check(&mut self) {
        let n = RuntimeArg::ALL.len();
        self.strbuf.push_str("if [ \"$#\" -ne ");
        self.strbuf.push_str(&n.to_string());
        self.strbuf.push_str(" ]; then\n    echo \"usage: $0");
        for arg in RuntimeArg::ALL {
            self.strbuf.push(' ');
            self.strbuf.push_str(arg.var_name());
        }
        self.strbuf.push_str("\" >&2\n    exit 2\nfi\n\n");
    }

    /// `NAME="$N"` for each runtime-bound argument.
    pub fn write_runtime_args(&mut self) {
        self.write_comment("Bound by the scheduler when the task starts:");
        for arg in RuntimeArg::ALL {
            self.strbuf.push_str(arg.var_name());
            self.strbuf.push_str("=\"$");
            self.strbuf.push_str(&arg.position().to_string());
            self.strbuf.push_str("\"\n");
        }
        self.strbuf.push('\n');
    }

    /// a single constant assignment; the value is quoted literally.
    pub fn write_constant(&mut self, var_name: &str, var_val: &str) {
        self.strbuf.push_str(var_name);
        self.strbuf.push('=');
        single_quote(var_val, self.strbuf);
        self.strbuf.push('\n');
    }

    /// `NAME="${DIR}/${IDENTIFIER}.ext"`
    pub fn write_derived_path(&mut self, var_name: &str, dir_var: &str, ext: &str) {
        self.strbuf.push_str(var_name);
        self.strbuf.push_str("=\"${");
        self.strbuf.push_str(dir_var);
        self.strbuf.push_str("}/${");
        self.strbuf.push_str(RuntimeArg::Identifier.var_name());
        self.strbuf.push_str("}.");
        self.strbuf.push_str(ext);
        self.strbuf.push_str("\"\n");
    }

    pub fn write_comment(&mut self, comment: &str) {
        self.strbuf.push_str("# ");
        self.strbuf.push_str(comment);
        self.strbuf.push('\n');
    }

    pub fn write_blank(&mut self) {
        self.strbuf.push('\n');
    }

    /// one line to stderr so the task log says what ran.
    pub fn write_echo(&mut self, msg: &str) {
        self.strbuf.push_str("echo \"");
        self.strbuf.push_str(msg);
        self.strbuf.push_str("\" >&2\n");
    }

    /// `exec` the tool. `words` are quoted; `var_words` are expanded as
    /// `"${VAR}"` and inserted after the flag they belong to.
    pub fn write_exec(&mut self, program: &[String], var_words: &[(&str, &str)], words: &[String]) {
        self.strbuf.push_str("exec");
        for word in program {
            self.strbuf.push(' ');
            single_quote(word, self.strbuf);
        }
        for (flag, var) in var_words {
            self.strbuf.push(' ');
            self.strbuf.push_str(flag);
            self.strbuf.push_str(" \"${");
            self.strbuf.push_str(var);
            self.strbuf.push_str("}\"");
        }
        for word in words {
            self.strbuf.push(' ');
            single_quote(word, self.strbuf);
        }
        self.strbuf.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_args() {
        let mut buf = String::new();
        let mut w = ScriptWriter::new(&mut buf);
        w.write_prefix();
        w.write_runtime_args();
        assert!(buf.starts_with("#!/usr/bin/env bash\n"));
        assert!(buf.contains("TASK_INDEX=\"$1\"\nCLUSTER_ID=\"$2\"\nIDENTIFIER=\"$3\"\n"));
    }

    #[test]
    fn test_prefix_clears_buffer() {
        let mut buf = String::from("stale contents");
        ScriptWriter::new(&mut buf).write_prefix();
        assert!(!buf.contains("stale"));
    }

    #[test]
    fn test_exec_line() {
        let mut buf = String::new();
        let mut w = ScriptWriter::new(&mut buf);
        w.write_exec(
            &["python3".to_owned(), "my tool.py".to_owned()],
            &[("-i", "INPUT_PATH")],
            &["--snr".to_owned(), "10,20".to_owned()],
        );
        assert_eq!(
            buf,
            "exec 'python3' 'my tool.py' -i \"${INPUT_PATH}\" '--snr' '10,20'\n"
        );
    }
}
