//! Interpreter provider handed to the host once an install succeeds

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::info;

use crate::install::InstallCompleteHandler;

pub const PROVIDER_NAME: &str = "Anaconda";

/// Label shown while nothing has been installed yet
pub const SELECT_TO_INSTALL: &str = "Anaconda - select to install";

/// Interpreter families a host may ask about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterKind {
    Python,
    Jython,
    IronPython,
}

#[derive(Debug, Default)]
pub struct InterpreterProvider {
    install_path: Mutex<Option<PathBuf>>,
}

impl InterpreterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    pub fn install_path(&self) -> Option<PathBuf> {
        self.install_path.lock().ok().and_then(|p| p.clone())
    }

    pub fn is_installed(&self) -> bool {
        self.install_path().is_some()
    }

    /// Interpreter path once installed, otherwise the install prompt label
    pub fn executable_or_label(&self) -> String {
        self.install_path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| SELECT_TO_INSTALL.to_string())
    }
}

impl InstallCompleteHandler for InterpreterProvider {
    fn set_install_path(&self, interpreter: &Path) {
        info!("{PROVIDER_NAME} interpreter registered at {}", interpreter.display());
        if let Ok(mut slot) = self.install_path.lock() {
            *slot = Some(interpreter.to_path_buf());
        }
    }
}

/// Providers offered for `kind`. Only CPython installs are offered.
pub fn providers_for(kind: InterpreterKind) -> Vec<InterpreterProvider> {
    match kind {
        InterpreterKind::Python => vec![InterpreterProvider::new()],
        InterpreterKind::Jython | InterpreterKind::IronPython => Vec::new(),
    }
}
