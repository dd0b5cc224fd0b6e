//! Launch description for one installer stage

use std::fmt;
use std::path::PathBuf;

/// What the stdin feeder does once the process is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdinScript {
    /// Close stdin straight away
    Close,
    /// Answer `yes` if this directory already exists, otherwise close
    AnswerIfDirExists(PathBuf),
}

/// Everything needed to start one subprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub stdin: StdinScript,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            stdin: StdinScript::Close,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn stdin(mut self, script: StdinScript) -> Self {
        self.stdin = script;
        self
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_arguments_in_order() {
        let spec = ProcessSpec::new("bash").arg("installer.sh").args(["-b", "-p", "/opt/conda"]);
        assert_eq!(spec.argv(), vec!["bash", "installer.sh", "-b", "-p", "/opt/conda"]);
        assert_eq!(spec.to_string(), "bash installer.sh -b -p /opt/conda");
    }

    #[test]
    fn defaults_close_stdin() {
        let spec = ProcessSpec::new("true");
        assert_eq!(spec.stdin, StdinScript::Close);
        assert!(spec.working_dir.is_none());
    }
}
