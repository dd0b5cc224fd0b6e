//! End-to-end install runs against `/bin/sh` scripts standing in for the
//! real installer and package manager.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use condawiz::install::{
    InstallMode, InstallOrchestrator, InstallOutcome, InstallRequest, InstallSettings, Installer, Platform,
};
use condawiz::progress::{BufferSink, OutputSink, ProgressSignal};
use condawiz::provider::InterpreterProvider;
use condawiz::resources::{MANIFEST_RESOURCE, ResourceLocator};
use tempfile::TempDir;

/// Creates `$3/bin/python` (the installer is called as `-b -p <target>`)
const CREATES_PYTHON: &str = r#"
target="$3"
echo "PREFIX=$target"
mkdir -p "$target/bin"
: > "$target/bin/python"
echo "installation finished."
"#;

struct Fixture {
    resources: TempDir,
    scratch: TempDir,
}

impl Fixture {
    fn new(installer_body: &str) -> Self {
        let resources = tempfile::tempdir().unwrap();
        let dir = resources.path().join("installer");
        fs::create_dir_all(&dir).unwrap();
        fs::write(resources.path().join(MANIFEST_RESOURCE), "fake-installer.sh\n").unwrap();
        fs::write(dir.join("fake-installer.sh"), format!("#!/bin/sh\n{installer_body}")).unwrap();

        Self {
            resources,
            scratch: tempfile::tempdir().unwrap(),
        }
    }

    fn target(&self) -> PathBuf {
        self.scratch.path().join("anaconda")
    }

    fn orchestrator(&self) -> InstallOrchestrator {
        let settings = InstallSettings {
            poll_interval: Duration::from_millis(10),
            posix_shell: "/bin/sh".to_string(),
            ..InstallSettings::default()
        };
        InstallOrchestrator::new(ResourceLocator::new(self.resources.path()), settings)
    }

    fn request(&self, mode: InstallMode) -> InstallRequest {
        InstallRequest::new(self.target()).platform(Platform::Posix).mode(mode)
    }

    fn run(&self, mode: InstallMode) -> (InstallOutcome, Arc<BufferSink>) {
        let sink = Arc::new(BufferSink::new());
        let progress = Arc::new(ProgressSignal::new());
        let outcome = self.orchestrator().run(&self.request(mode), &progress, sink.clone());
        (outcome, sink)
    }
}

/// Installer body that also drops a fake `bin/conda` printing `stdout`,
/// recording its arguments and exiting with `code`
fn with_conda(stdout: &str, code: i32) -> String {
    format!(
        r#"{CREATES_PYTHON}
printf '#!/bin/sh\necho "$@" > "%s/conda-args"\necho "{stdout}"\nexit {code}\n' "$target" > "$target/bin/conda"
chmod +x "$target/bin/conda"
"#
    )
}

/// Installer body whose `bin/conda` records its arguments then hangs
fn with_slow_conda() -> String {
    format!(
        r#"{CREATES_PYTHON}
printf '#!/bin/sh\necho "$@" > "%s/conda-args"\nsleep 30\n' "$target" > "$target/bin/conda"
chmod +x "$target/bin/conda"
"#
    )
}

/// Sink that cancels the run once `trigger` shows up in its output
struct CancelOn {
    buffer: BufferSink,
    trigger: &'static str,
    progress: Arc<ProgressSignal>,
}

impl CancelOn {
    fn new(trigger: &'static str, progress: &Arc<ProgressSignal>) -> Arc<Self> {
        Arc::new(Self {
            buffer: BufferSink::new(),
            trigger,
            progress: Arc::clone(progress),
        })
    }
}

impl OutputSink for CancelOn {
    fn starting(&self) {
        self.buffer.starting();
    }

    fn output(&self, text: &str) {
        self.buffer.output(text);
        if self.buffer.contents().contains(self.trigger) {
            self.progress.cancel();
        }
    }
}

fn conda_args(target: &Path) -> Option<String> {
    fs::read_to_string(target.join("conda-args")).ok().map(|s| s.trim().to_string())
}

#[test]
fn successful_install_reports_interpreter() {
    let fx = Fixture::new(CREATES_PYTHON);
    let (outcome, sink) = fx.run(InstallMode::Full);

    assert_eq!(
        outcome,
        InstallOutcome::Success {
            interpreter: fx.target().join("bin/python")
        }
    );
    let out = sink.contents();
    assert!(out.starts_with("Installer location: "), "{out}");
    assert!(out.contains("Running: /bin/sh "), "{out}");
    assert!(out.contains(&format!("PREFIX={}", fx.target().display())), "{out}");
    assert!(!out.contains("Error output:"), "{out}");
    assert_eq!(sink.start_count(), 1);
}

#[test]
fn exit_zero_without_python_is_a_failure() {
    let fx = Fixture::new("echo nothing to see\n");
    let (outcome, _) = fx.run(InstallMode::Full);

    match outcome {
        InstallOutcome::Failed { diagnostic } => {
            assert!(diagnostic.starts_with("Installation failed. Expected to find python here:"));
            assert!(diagnostic.contains("bin/python"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn error_marker_becomes_diagnostic() {
    let fx = Fixture::new("echo \"ERROR: File or directory already exists: $3\"\nexit 1\n");
    let (outcome, _) = fx.run(InstallMode::Full);

    assert_eq!(
        outcome,
        InstallOutcome::Failed {
            diagnostic: format!("File or directory already exists: {}", fx.target().display())
        }
    );
}

#[test]
fn unmarked_failure_is_unknown_and_stderr_is_forwarded() {
    let fx = Fixture::new("echo oops >&2\nexit 3\n");
    let (outcome, sink) = fx.run(InstallMode::Full);

    assert_eq!(
        outcome,
        InstallOutcome::Failed {
            diagnostic: "Unexpected/unknown error".to_string()
        }
    );
    assert!(sink.contents().contains("\nError output:\noops"));
}

#[test]
fn existing_target_gets_yes_on_stdin() {
    let fx = Fixture::new("read answer\necho \"answer=$answer\"\nexit 1\n");
    fs::create_dir_all(fx.target()).unwrap();
    let (_, sink) = fx.run(InstallMode::Full);
    assert!(sink.contents().contains("answer=yes"), "{}", sink.contents());
}

#[test]
fn fresh_target_gets_closed_stdin() {
    let fx = Fixture::new("read answer\necho \"answer=[$answer]\"\nexit 1\n");
    let (_, sink) = fx.run(InstallMode::Full);
    assert!(sink.contents().contains("answer=[]"), "{}", sink.contents());
}

#[test]
fn cancellation_kills_the_installer() {
    let fx = Fixture::new("echo started\nsleep 30\n");
    let sink = Arc::new(BufferSink::new());
    let progress = Arc::new(ProgressSignal::new());

    let canceller = {
        let sink = Arc::clone(&sink);
        let progress = Arc::clone(&progress);
        thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(10);
            while !sink.contents().contains("started") && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            progress.cancel();
        })
    };

    let started = Instant::now();
    let outcome = fx
        .orchestrator()
        .run(&fx.request(InstallMode::Full), &progress, sink.clone());
    canceller.join().unwrap();

    assert_eq!(outcome, InstallOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(outcome.message().contains("manually clean up"));
}

#[test]
fn bootstrap_runs_package_manager_quietly() {
    let fx = Fixture::new(&with_conda("fetching secret", 0));
    let (outcome, sink) = fx.run(InstallMode::Bootstrap);

    assert_eq!(outcome.interpreter(), Some(fx.target().join("bin/python").as_path()));
    assert_eq!(conda_args(&fx.target()).as_deref(), Some("install --yes anaconda"));

    let out = sink.contents();
    assert!(out.contains("installation finished."), "{out}");
    assert!(out.contains("/bin/conda install --yes anaconda"), "{out}");
    assert!(!out.contains("fetching secret"), "{out}");
}

#[test]
fn package_manager_failure_uses_marker() {
    let fx = Fixture::new(&with_conda("ERROR: PackageNotFound", 1));
    let (outcome, _) = fx.run(InstallMode::Bootstrap);

    assert_eq!(
        outcome,
        InstallOutcome::Failed {
            diagnostic: "PackageNotFound".to_string()
        }
    );
}

#[test]
fn package_manager_skipped_when_installer_fails() {
    let body = format!("{}\nexit 1\n", with_conda("unused", 0));
    let fx = Fixture::new(&body);
    let (outcome, _) = fx.run(InstallMode::Bootstrap);

    assert!(matches!(outcome, InstallOutcome::Failed { .. }));
    assert!(fx.target().join("bin/conda").exists());
    assert_eq!(conda_args(&fx.target()), None);
}

#[test]
fn missing_manifest_fails_before_launch() {
    let fx = Fixture::new(CREATES_PYTHON);
    fs::remove_file(fx.resources.path().join(MANIFEST_RESOURCE)).unwrap();
    let (outcome, sink) = fx.run(InstallMode::Full);

    assert!(matches!(outcome, InstallOutcome::Failed { .. }));
    assert_eq!(sink.start_count(), 0);
    assert!(!fx.target().exists());
}

#[test]
fn installer_trait_registers_interpreter_with_provider() {
    let fx = Fixture::new(CREATES_PYTHON);
    let provider = InterpreterProvider::new();
    let progress = Arc::new(ProgressSignal::new());

    let path = fx
        .orchestrator()
        .run_install(&fx.request(InstallMode::Full), &progress, Arc::new(BufferSink::new()), &provider)
        .unwrap();

    assert_eq!(provider.install_path(), Some(path));
    assert_eq!(progress.units_worked(), progress.total());
}

#[test]
fn cancel_between_stages_skips_package_manager() {
    let body = format!("{}\necho 'unpack warning' >&2\n", with_conda("unused", 0));
    let fx = Fixture::new(&body);
    let progress = Arc::new(ProgressSignal::new());
    let sink = CancelOn::new("unpack warning", &progress);

    let orchestrator = fx.orchestrator();
    let request = fx.request(InstallMode::Bootstrap);
    let plan = orchestrator.plan(&request).unwrap();
    let outcome = orchestrator.execute(&request, &plan, &progress, sink.clone());

    assert_eq!(outcome, InstallOutcome::Cancelled);
    assert!(fx.target().join("bin/python").exists());
    assert_eq!(conda_args(&fx.target()), None);
    assert!(!sink.buffer.contents().contains("bin/conda install"), "{}", sink.buffer.contents());
}

#[test]
fn cancel_during_package_manager_keeps_no_interpreter() {
    let fx = Fixture::new(&with_slow_conda());
    let progress = Arc::new(ProgressSignal::new());
    let sink = CancelOn::new("bin/conda install", &progress);

    let started = Instant::now();
    let outcome = fx
        .orchestrator()
        .run(&fx.request(InstallMode::Bootstrap), &progress, sink.clone());

    assert_eq!(outcome, InstallOutcome::Cancelled);
    assert_eq!(outcome.interpreter(), None);
    assert!(started.elapsed() < Duration::from_secs(20));
}
