//! Platform conventions for installer argument vectors and install layout

use std::fmt;
use std::path::{Path, PathBuf};

/// Installer flavour to drive
///
/// Only argument vectors and path separators depend on this; the control
/// flow of an install is the same everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// MSI/EXE installer run through `cmd.exe`
    Windows,
    /// Shell-script installer run in batch mode
    Posix,
}

impl Platform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    pub fn separator(self) -> char {
        match self {
            Platform::Windows => '\\',
            Platform::Posix => '/',
        }
    }

    /// Interpreter location relative to the install root
    pub fn interpreter_relative(self) -> &'static str {
        match self {
            Platform::Windows => "python.exe",
            Platform::Posix => "bin/python",
        }
    }

    /// Package manager location relative to the install root
    pub fn package_manager_relative(self) -> &'static str {
        match self {
            Platform::Windows => "Scripts\\conda.exe",
            Platform::Posix => "bin/conda",
        }
    }

    /// The Windows silent installer's exit code is not trusted; success is
    /// judged by the interpreter appearing on disk.
    pub fn trusts_any_exit_code(self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// Append `relative` to `root` using this platform's separator
    pub fn under(self, root: &Path, relative: &str) -> PathBuf {
        let sep = self.separator();
        let mut joined = root.to_string_lossy().into_owned();
        if !joined.ends_with(sep) {
            joined.push(sep);
        }
        joined.push_str(relative);
        PathBuf::from(joined)
    }

    pub fn interpreter_path(self, root: &Path) -> PathBuf {
        self.under(root, self.interpreter_relative())
    }

    pub fn package_manager_path(self, root: &Path) -> PathBuf {
        self.under(root, self.package_manager_relative())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => f.write_str("windows"),
            Platform::Posix => f.write_str("posix"),
        }
    }
}
