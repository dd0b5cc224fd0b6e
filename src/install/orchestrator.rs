//! Stage sequencing for an install run
//!
//! The orchestrator turns an [`InstallRequest`] into one or two supervised
//! subprocesses, forwards their output, and boils the lot down to a single
//! [`InstallOutcome`].

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use log::{error, info, warn};

use super::outcome::{InstallOutcome, check_follow_up, resolve_interpreter};
use super::plan::{InstallPlan, InstallRequest, InstallSettings, StagePlan};
use super::platform::Platform;
use crate::error::InstallerError;
use crate::process::{ChunkObserver, ProcessSession, SessionReport};
use crate::progress::{OutputSink, ProgressSignal};
use crate::resources::ResourceLocator;

/// Told where the interpreter ended up once an install succeeds
pub trait InstallCompleteHandler: Send + Sync {
    fn set_install_path(&self, interpreter: &Path);
}

/// The capability set a host binds to
pub trait Installer {
    /// Install to `request.target_dir`, reporting to `sink` and `progress`,
    /// and hand the interpreter path to `complete` on success.
    fn run_install(
        &self,
        request: &InstallRequest,
        progress: &Arc<ProgressSignal>,
        sink: Arc<dyn OutputSink>,
        complete: &dyn InstallCompleteHandler,
    ) -> Result<PathBuf, InstallerError>;

    /// Launch the installer in its own interactive mode without waiting.
    /// Only the Windows installer has one.
    fn run_manual_install(&self) -> Result<(), InstallerError>;
}

pub struct InstallOrchestrator {
    resources: ResourceLocator,
    settings: InstallSettings,
}

impl InstallOrchestrator {
    pub fn new(resources: ResourceLocator, settings: InstallSettings) -> Self {
        Self { resources, settings }
    }

    /// Resolve the installer and lay out the stages. Fails before anything
    /// is launched if resources are missing or the mode is unsupported.
    pub fn plan(&self, request: &InstallRequest) -> Result<InstallPlan, InstallerError> {
        let installer = self.resources.installer_path()?;
        InstallPlan::build(request, &installer, &self.settings)
    }

    /// Plan and execute a full run
    pub fn run(
        &self,
        request: &InstallRequest,
        progress: &Arc<ProgressSignal>,
        sink: Arc<dyn OutputSink>,
    ) -> InstallOutcome {
        let result = self
            .plan(request)
            .and_then(|plan| self.execute_plan(request, &plan, progress, sink));
        finish(result)
    }

    /// Execute an already built plan
    pub fn execute(
        &self,
        request: &InstallRequest,
        plan: &InstallPlan,
        progress: &Arc<ProgressSignal>,
        sink: Arc<dyn OutputSink>,
    ) -> InstallOutcome {
        finish(self.execute_plan(request, plan, progress, sink))
    }

    fn execute_plan(
        &self,
        request: &InstallRequest,
        plan: &InstallPlan,
        progress: &Arc<ProgressSignal>,
        sink: Arc<dyn OutputSink>,
    ) -> Result<PathBuf, InstallerError> {
        let total = plan.stage_count();
        sink.starting();
        sink.output(&format!("Installer location: {}\n", plan.installer_location.display()));

        let report = self.run_stage(1, total, &plan.installer, progress, &sink)?;
        let interpreter = resolve_interpreter(
            request.platform,
            report.exit_code,
            &report.stdout,
            &request.target_dir,
            report.killed || progress.is_cancelled(),
        )?;
        info!("Interpreter installed at {}", interpreter.display());

        if let Some(stage) = &plan.follow_up {
            if progress.is_cancelled() {
                info!("Cancelled before '{}', not launching it", stage.label);
                return Err(InstallerError::Cancelled);
            }
            let report = self.run_stage(2, total, stage, progress, &sink)?;
            check_follow_up(
                report.exit_code,
                &report.stdout,
                report.killed || progress.is_cancelled(),
            )?;
        }

        progress.done();
        Ok(interpreter)
    }

    fn run_stage(
        &self,
        index: usize,
        total: usize,
        stage: &StagePlan,
        progress: &Arc<ProgressSignal>,
        sink: &Arc<dyn OutputSink>,
    ) -> Result<SessionReport, InstallerError> {
        info!("Stage {index}/{total}: {} ({})", stage.label, stage.spec);
        sink.stage(index, total, &stage.label);
        sink.output(&format!("Running: {}\n", stage.spec));
        progress.begin_task(&stage.label, stage.expected_stdout);

        let on_stdout: ChunkObserver = if stage.forward_stdout {
            let sink = Arc::clone(sink);
            Box::new(move |chunk: &str| sink.output(chunk))
        } else {
            Box::new(|_: &str| {})
        };

        let report = ProcessSession::launch(stage.spec.clone())?
            .with_poll_interval(self.settings.poll_interval)
            .await_completion(progress, stage.expected_stdout, on_stdout, Box::new(|_: &str| {}))?;

        if !report.stderr.is_empty() {
            sink.output("\nError output:\n");
            sink.output(&report.stderr);
        }
        info!(
            "Stage {index}/{total} exited with {:?} after {} stdout chars",
            report.exit_code,
            report.stdout.chars().count()
        );
        Ok(report)
    }
}

impl Installer for InstallOrchestrator {
    fn run_install(
        &self,
        request: &InstallRequest,
        progress: &Arc<ProgressSignal>,
        sink: Arc<dyn OutputSink>,
        complete: &dyn InstallCompleteHandler,
    ) -> Result<PathBuf, InstallerError> {
        let interpreter = self
            .plan(request)
            .and_then(|plan| self.execute_plan(request, &plan, progress, sink))?;
        complete.set_install_path(&interpreter);
        Ok(interpreter)
    }

    fn run_manual_install(&self) -> Result<(), InstallerError> {
        if Platform::current() != Platform::Windows {
            return Err(InstallerError::Unsupported(
                "manual install needs the Windows GUI installer".to_string(),
            ));
        }

        let installer = self.resources.installer_path()?;
        Command::new("cmd.exe")
            .arg("/c")
            .arg(&installer)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| InstallerError::Launch {
                program: "cmd.exe".to_string(),
                source,
            })?;
        info!("Launched interactive installer {}", installer.display());
        Ok(())
    }
}

fn finish(result: Result<PathBuf, InstallerError>) -> InstallOutcome {
    match &result {
        Ok(path) => info!("Install finished: {}", path.display()),
        Err(e) if e.is_cancelled() => warn!("Install cancelled by user"),
        Err(e) => error!("Install failed: {e}"),
    }
    InstallOutcome::from(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn manual_install_is_windows_only() {
        let root = tempfile::tempdir().unwrap();
        let orchestrator = InstallOrchestrator::new(ResourceLocator::new(root.path()), InstallSettings::default());
        assert!(matches!(orchestrator.run_manual_install(), Err(InstallerError::Unsupported(_))));
    }

    #[test]
    fn missing_resources_fail_before_launch() {
        let root = tempfile::tempdir().unwrap();
        let orchestrator = InstallOrchestrator::new(ResourceLocator::new(root.path()), InstallSettings::default());
        let sink = Arc::new(crate::progress::BufferSink::new());
        let progress = Arc::new(ProgressSignal::new());

        let outcome = orchestrator.run(&InstallRequest::new(root.path().join("target")), &progress, sink.clone());

        assert!(matches!(outcome, InstallOutcome::Failed { .. }));
        assert_eq!(sink.start_count(), 0);
        assert!(sink.contents().is_empty());
    }
}
