//! Install requests and the stage plans built from them

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use super::platform::Platform;
use crate::config::InstallerConfig;
use crate::error::InstallerError;
use crate::process::{DEFAULT_POLL_INTERVAL, ProcessSpec, StdinScript};

/// How many characters a successful install prints on stdout. Only sizes
/// buffers and the progress bar.
pub const APPROX_STDOUT_CHARS: usize = 5500;

/// Single installer run, or minimal installer followed by a package fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallMode {
    #[default]
    Full,
    Bootstrap,
}

/// What the user asked for. Fixed once orchestration starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub target_dir: PathBuf,
    pub platform: Platform,
    pub mode: InstallMode,
}

impl InstallRequest {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            platform: Platform::current(),
            mode: InstallMode::Full,
        }
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn mode(mut self, mode: InstallMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn interpreter_path(&self) -> PathBuf {
        self.platform.interpreter_path(&self.target_dir)
    }
}

/// Knobs the orchestrator takes from configuration
#[derive(Debug, Clone)]
pub struct InstallSettings {
    pub expected_stdout_chars: usize,
    pub poll_interval: Duration,
    pub bootstrap_packages: Vec<String>,
    pub posix_shell: String,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            expected_stdout_chars: APPROX_STDOUT_CHARS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            bootstrap_packages: vec!["anaconda".to_string()],
            posix_shell: "bash".to_string(),
        }
    }
}

impl From<&InstallerConfig> for InstallSettings {
    fn from(cfg: &InstallerConfig) -> Self {
        Self {
            expected_stdout_chars: cfg.expected_stdout_chars,
            poll_interval: cfg.poll_interval(),
            bootstrap_packages: cfg.bootstrap_packages.clone(),
            posix_shell: cfg.posix_shell.clone(),
        }
    }
}

/// One planned subprocess
#[derive(Debug, Clone)]
pub struct StagePlan {
    pub label: String,
    pub spec: ProcessSpec,
    pub expected_stdout: usize,
    /// Stream stdout to the output sink while running
    pub forward_stdout: bool,
}

/// Stages for one run. The installer stage always comes first and is the
/// only one that decides the interpreter path.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub installer_location: PathBuf,
    pub installer: StagePlan,
    pub follow_up: Option<StagePlan>,
}

impl InstallPlan {
    pub fn stage_count(&self) -> usize {
        1 + usize::from(self.follow_up.is_some())
    }

    /// Build the plan for `request` around the installer at `installer`
    pub fn build(
        request: &InstallRequest,
        installer: &Path,
        settings: &InstallSettings,
    ) -> Result<Self, InstallerError> {
        let follow_up = match request.mode {
            InstallMode::Full => None,
            InstallMode::Bootstrap => Some(package_stage(request, settings)?),
        };

        let plan = Self {
            installer_location: installer.to_path_buf(),
            installer: installer_stage(request, installer, settings),
            follow_up,
        };
        debug!("Planned {} stage(s) for {}", plan.stage_count(), request.target_dir.display());
        Ok(plan)
    }
}

/// Argument vector for the native installer
pub fn installer_stage(request: &InstallRequest, installer: &Path, settings: &InstallSettings) -> StagePlan {
    let target = request.target_dir.to_string_lossy().into_owned();
    let installer = installer.to_string_lossy().into_owned();

    let spec = match request.platform {
        Platform::Windows => ProcessSpec::new("cmd.exe").args([
            "/c".to_string(),
            installer,
            format!("TARGETDIR={target}"),
            "/qr".to_string(),
            "/norestart".to_string(),
        ]),
        Platform::Posix => ProcessSpec::new(resolve_shell(&settings.posix_shell))
            .arg(installer)
            .args(["-b", "-p"])
            .arg(target),
    };

    StagePlan {
        label: "Installing".to_string(),
        spec: spec.stdin(StdinScript::AnswerIfDirExists(request.target_dir.clone())),
        expected_stdout: settings.expected_stdout_chars,
        forward_stdout: true,
    }
}

/// Argument vector for the package-manager bootstrap
pub fn package_stage(request: &InstallRequest, settings: &InstallSettings) -> Result<StagePlan, InstallerError> {
    match request.platform {
        Platform::Windows => Err(InstallerError::Unsupported(
            "package-manager bootstrap is not implemented for Windows installs".to_string(),
        )),
        Platform::Posix => {
            let conda = request.platform.package_manager_path(&request.target_dir);
            let spec = ProcessSpec::new(conda.to_string_lossy())
                .args(["install", "--yes"])
                .args(settings.bootstrap_packages.iter().cloned())
                .stdin(StdinScript::Close);
            Ok(StagePlan {
                label: "Fetching packages".to_string(),
                spec,
                expected_stdout: settings.expected_stdout_chars,
                forward_stdout: false,
            })
        }
    }
}

/// Full path of the configured shell, or the bare name if it is not on PATH
fn resolve_shell(shell: &str) -> String {
    which::which(shell)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| shell.to_string())
}
