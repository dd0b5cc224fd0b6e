//! Classifying a finished stage into success, cancellation or failure

use std::path::{Path, PathBuf};

use super::platform::Platform;
use crate::error::InstallerError;

/// Installers prefix fatal problems with this on stdout
pub const ERROR_MARKER: &str = "ERROR: ";

/// Diagnostic used when a failed run printed no marker
pub const UNKNOWN_ERROR: &str = "Unexpected/unknown error";

/// Terminal result of one orchestration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Success { interpreter: PathBuf },
    Cancelled,
    Failed { diagnostic: String },
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InstallOutcome::Success { .. })
    }

    pub fn interpreter(&self) -> Option<&Path> {
        match self {
            InstallOutcome::Success { interpreter } => Some(interpreter),
            _ => None,
        }
    }

    /// Message suitable for a status line or dialog
    pub fn message(&self) -> String {
        match self {
            InstallOutcome::Success { interpreter } => {
                format!("Installation complete. Interpreter: {}", interpreter.display())
            }
            InstallOutcome::Cancelled => InstallerError::Cancelled.to_string(),
            InstallOutcome::Failed { diagnostic } => diagnostic.clone(),
        }
    }
}

impl From<Result<PathBuf, InstallerError>> for InstallOutcome {
    fn from(result: Result<PathBuf, InstallerError>) -> Self {
        match result {
            Ok(interpreter) => InstallOutcome::Success { interpreter },
            Err(InstallerError::Cancelled) => InstallOutcome::Cancelled,
            Err(e) => InstallOutcome::Failed {
                diagnostic: e.to_string(),
            },
        }
    }
}

impl From<InstallOutcome> for Result<PathBuf, InstallerError> {
    fn from(outcome: InstallOutcome) -> Self {
        match outcome {
            InstallOutcome::Success { interpreter } => Ok(interpreter),
            InstallOutcome::Cancelled => Err(InstallerError::Cancelled),
            InstallOutcome::Failed { diagnostic } => Err(InstallerError::InstallerReported(diagnostic)),
        }
    }
}

/// Text following the first [`ERROR_MARKER`] in `stdout`, or [`UNKNOWN_ERROR`].
///
/// Trailing whitespace (usually the installer's final newline) is trimmed;
/// everything else after the marker is kept verbatim.
pub fn extract_diagnostic(stdout: &str) -> String {
    match stdout.find(ERROR_MARKER) {
        Some(idx) => stdout[idx + ERROR_MARKER.len()..].trim_end().to_string(),
        None => UNKNOWN_ERROR.to_string(),
    }
}

/// Decide how the installer stage ended and where its interpreter is.
///
/// On Windows any exit code may mean success; only the interpreter on disk
/// counts. Elsewhere the exit code must be 0.
pub fn resolve_interpreter(
    platform: Platform,
    exit_code: Option<i32>,
    stdout: &str,
    target: &Path,
    cancelled: bool,
) -> Result<PathBuf, InstallerError> {
    if platform.trusts_any_exit_code() || exit_code == Some(0) {
        let interpreter = platform.interpreter_path(target);
        if interpreter.exists() {
            Ok(interpreter)
        } else {
            Err(InstallerError::InstallationIncomplete { expected: interpreter })
        }
    } else if cancelled {
        Err(InstallerError::Cancelled)
    } else {
        Err(InstallerError::InstallerReported(extract_diagnostic(stdout)))
    }
}

/// Decide how a follow-up stage (package fetch) ended
pub fn check_follow_up(exit_code: Option<i32>, stdout: &str, cancelled: bool) -> Result<(), InstallerError> {
    if exit_code == Some(0) {
        Ok(())
    } else if cancelled {
        Err(InstallerError::Cancelled)
    } else {
        Err(InstallerError::InstallerReported(extract_diagnostic(stdout)))
    }
}
