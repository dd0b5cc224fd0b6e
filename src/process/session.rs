//! One supervised installer subprocess
//!
//! A session starts the child, then runs four threads against it: stdout
//! drain, stderr drain, stdin feeder and a supervisor that waits for exit
//! while watching the cancellation flag. [`ProcessSession::await_completion`]
//! only returns once the child has exited and all of those have joined, so
//! no output that explains a failure can be lost to a race.

use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use super::drain::{ChunkObserver, StreamDrainer};
use super::feeder::{FeedAction, StdinFeeder};
use super::spec::ProcessSpec;
use crate::error::InstallerError;
use crate::progress::ProgressSignal;

/// Default cadence for the exit/cancel poll
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a completed session
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// The supervisor killed the process because of cancellation
    pub killed: bool,
    pub stdin: FeedAction,
}

impl SessionReport {
    pub fn exited_cleanly(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A running installer process
pub struct ProcessSession {
    spec: ProcessSpec,
    child: Child,
    poll_interval: Duration,
}

impl ProcessSession {
    /// Start the process described by `spec` with all three stdio pipes open
    pub fn launch(spec: ProcessSpec) -> Result<Self, InstallerError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        // Own process group, so cancellation can take down the installer's children too
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|source| InstallerError::Launch {
            program: spec.program.clone(),
            source,
        })?;
        info!("Launched '{}' (pid {})", spec, child.id());

        Ok(Self {
            spec,
            child,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Drain, feed and supervise the process until it has exited.
    ///
    /// Each character read from stdout counts one unit on `progress` and is
    /// passed to `on_stdout`; stderr chunks go to `on_stderr`. Cancelling
    /// `progress` kills the process at the next poll.
    pub fn await_completion(
        mut self,
        progress: &Arc<ProgressSignal>,
        expected_stdout: usize,
        on_stdout: ChunkObserver,
        on_stderr: ChunkObserver,
    ) -> Result<SessionReport, InstallerError> {
        let stdout = self.child.stdout.take();
        let stderr = self.child.stderr.take();
        let stdin = self.child.stdin.take();

        let mut workers = Workers::default();
        let started = workers.start(
            progress,
            expected_stdout,
            stdout,
            stderr,
            stdin,
            &self.spec,
            on_stdout,
            on_stderr,
        );
        if let Err(e) = started {
            warn!("Could not start stream workers for '{}': {e}", self.spec.program);
            // Killing the child closes the pipes, which ends any drain already running
            terminate(&mut self.child);
            let _ = self.child.wait();
            workers.join();
            return Err(e.into());
        }

        let supervisor = Supervisor::spawn(self.child, Arc::clone(progress), self.poll_interval);
        let supervised = supervisor.and_then(Supervisor::join);

        // Always join the workers, even if supervision failed
        let (stdout, stderr, stdin) = workers.join();
        let (status, killed) = supervised?;
        debug!("'{}' finished with {status} (killed: {killed})", self.spec.program);

        Ok(SessionReport {
            exit_code: status.code(),
            stdout,
            stderr,
            killed,
            stdin,
        })
    }
}

#[derive(Default)]
struct Workers {
    stdout: Option<StreamDrainer>,
    stderr: Option<StreamDrainer>,
    stdin: Option<StdinFeeder>,
}

impl Workers {
    #[allow(clippy::too_many_arguments)]
    fn start(
        &mut self,
        progress: &Arc<ProgressSignal>,
        expected_stdout: usize,
        stdout: Option<std::process::ChildStdout>,
        stderr: Option<std::process::ChildStderr>,
        stdin: Option<std::process::ChildStdin>,
        spec: &ProcessSpec,
        mut on_stdout: ChunkObserver,
        on_stderr: ChunkObserver,
    ) -> io::Result<()> {
        if let Some(stream) = stdout {
            let progress = Arc::clone(progress);
            let counted: ChunkObserver = Box::new(move |chunk: &str| {
                on_stdout(chunk);
                progress.worked(chunk.chars().count());
            });
            self.stdout = Some(StreamDrainer::spawn("installer-stdout", stream, expected_stdout, counted)?);
        }
        if let Some(stream) = stderr {
            self.stderr = Some(StreamDrainer::spawn("installer-stderr", stream, 0, on_stderr)?);
        }
        self.stdin = Some(StdinFeeder::spawn("installer-stdin", stdin, spec.stdin.clone())?);
        Ok(())
    }

    fn join(self) -> (String, String, FeedAction) {
        let stdout = self.stdout.map(|d| d.join().text).unwrap_or_default();
        let stderr = self.stderr.map(|d| d.join().text).unwrap_or_default();
        let stdin = self.stdin.map(StdinFeeder::join).unwrap_or(FeedAction::Closed);
        (stdout, stderr, stdin)
    }
}

/// Waits for exit on its own thread, killing the child on cancellation
struct Supervisor {
    handle: JoinHandle<io::Result<(ExitStatus, bool)>>,
}

impl Supervisor {
    fn spawn(child: Child, progress: Arc<ProgressSignal>, poll: Duration) -> Result<Self, InstallerError> {
        let handle = thread::Builder::new()
            .name("installer-wait".to_string())
            .spawn(move || supervise(child, &progress, poll))?;
        Ok(Self { handle })
    }

    fn join(self) -> Result<(ExitStatus, bool), InstallerError> {
        match self.handle.join() {
            Ok(result) => result.map_err(InstallerError::from),
            Err(_) => Err(InstallerError::Io(io::Error::other("installer supervisor panicked"))),
        }
    }
}

fn supervise(mut child: Child, progress: &ProgressSignal, poll: Duration) -> io::Result<(ExitStatus, bool)> {
    let ticker = crossbeam_channel::tick(poll);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status, false)),
            Ok(None) => {}
            Err(e) => {
                warn!("Lost track of installer process {}: {e}", child.id());
                terminate(&mut child);
                let _ = child.wait();
                return Err(e);
            }
        }

        if progress.is_cancelled() {
            info!("Cancellation requested, terminating installer (pid {})", child.id());
            // The child may have exited since try_wait; killing a zombie is harmless
            terminate(&mut child);
            let status = child.wait()?;
            return Ok((status, true));
        }

        let _ = ticker.recv();
    }
}

/// Kill the child and, on unix, every process left in its group
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
            debug!("killpg({}) failed: {e}", child.id());
        }
    }
    if let Err(e) = child.kill() {
        debug!("kill({}) failed: {e}", child.id());
    }
}
