//! Installer error taxonomy

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the installer core.
///
/// Every failure of an orchestration run ends up either here or in
/// [`crate::install::InstallOutcome`]; nothing is retried automatically.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The OS refused to start the process (missing binary, permission denied)
    #[error("Failed to launch installer '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Installer exited as if it succeeded but left no interpreter behind
    #[error("Installation failed. Expected to find python here: '{}' but it was missing.", expected.display())]
    InstallationIncomplete { expected: PathBuf },

    /// User cancelled the run
    #[error(
        "Installation canceled. You may need to manually clean up partial install. Please review output."
    )]
    Cancelled,

    /// Installer ran and reported a failure (nonzero exit or `ERROR: ` marker)
    #[error("{0}")]
    InstallerReported(String),

    /// License text or installer manifest could not be found or read
    #[error("Resource not available: {}", resource.display())]
    ResourceMissing {
        resource: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Platform path exists in the flow but has no implementation
    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InstallerError {
    /// Cancellation is informational, everything else is a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallerError::Cancelled)
    }
}
