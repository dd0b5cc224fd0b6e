//! Checks applied to a user-chosen install destination

use std::path::{Path, PathBuf};

use super::platform::Platform;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DestinationError {
    #[error("Select destination directory for Anaconda")]
    Empty,

    #[error("Selected destination is not a valid path")]
    Invalid,

    #[error("Selected destination is not a absolute path")]
    NotAbsolute,

    #[error("Selected destination already exists, but is not a directory")]
    NotADirectory,
}

/// A destination that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationStatus {
    Fresh,
    /// Installing may overwrite files already there
    ExistingDirectory,
}

impl DestinationStatus {
    pub fn warning(self) -> Option<&'static str> {
        match self {
            DestinationStatus::Fresh => None,
            DestinationStatus::ExistingDirectory => Some(
                "Selected destination already exists. Installing into this directory might overwrite existing files.",
            ),
        }
    }
}

pub fn validate_destination(input: &str) -> Result<DestinationStatus, DestinationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DestinationError::Empty);
    }
    if input.contains('\0') {
        return Err(DestinationError::Invalid);
    }

    let path = Path::new(input);
    if !path.is_absolute() {
        return Err(DestinationError::NotAbsolute);
    }

    match path.metadata() {
        Ok(meta) if meta.is_dir() => Ok(DestinationStatus::ExistingDirectory),
        Ok(_) => Err(DestinationError::NotADirectory),
        Err(_) => Ok(DestinationStatus::Fresh),
    }
}

/// Suggested destination shown before the user picks one
pub fn default_install_location(platform: Platform) -> PathBuf {
    match platform {
        Platform::Windows => PathBuf::from("C:\\Python27"),
        Platform::Posix => dirs::home_dir()
            .map(|home| platform.under(&home, "anacondaWizardInstall"))
            .unwrap_or_default(),
    }
}
