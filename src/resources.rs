//! Packaged resource lookup (license text, installer manifest)
//!
//! Resources live under a root directory handed in by the caller. The
//! manifest is a one-line text file naming the actual installer asset that
//! sits next to it.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::InstallerError;

/// License text shown before installing
pub const LICENSE_RESOURCE: &str = "installer/Anaconda_License.txt";

/// One-line file naming the installer asset
pub const MANIFEST_RESOURCE: &str = "installer/anaconda_installer.txt";

/// Directory, relative to the root, holding the installer asset
const INSTALLER_DIR: &str = "installer";

/// Shown in place of the license when it cannot be read locally
pub const LICENSE_FALLBACK: &str =
    "Failed to get License locally, please review http://docs.continuum.io/anaconda/eula.html";

#[derive(Debug, Clone)]
pub struct ResourceLocator {
    root: PathBuf,
}

impl ResourceLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn license_text(&self) -> Result<String, InstallerError> {
        let path = self.resolve(LICENSE_RESOURCE);
        fs::read_to_string(&path).map_err(|e| InstallerError::ResourceMissing {
            resource: path,
            source: Some(e),
        })
    }

    /// License text, or a pointer to the online EULA if it cannot be read
    pub fn license_text_or_fallback(&self) -> String {
        self.license_text().unwrap_or_else(|e| {
            warn!("{e}");
            LICENSE_FALLBACK.to_string()
        })
    }

    /// Absolute path of the installer named by the manifest
    pub fn installer_path(&self) -> Result<PathBuf, InstallerError> {
        let manifest = self.resolve(MANIFEST_RESOURCE);
        let contents = fs::read_to_string(&manifest).map_err(|e| InstallerError::ResourceMissing {
            resource: manifest.clone(),
            source: Some(e),
        })?;

        let name = contents.lines().next().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(InstallerError::ResourceMissing {
                resource: manifest,
                source: None,
            });
        }

        let installer = self.resolve(INSTALLER_DIR).join(name);
        let installer = fs::canonicalize(&installer).map_err(|e| InstallerError::ResourceMissing {
            resource: installer,
            source: Some(e),
        })?;
        debug!("Manifest names installer at {}", installer.display());
        Ok(installer)
    }
}
