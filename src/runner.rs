//! Drives one install run with terminal progress and Ctrl-C handling
//!
//! The orchestration itself blocks, so it runs on the blocking pool while
//! this task renders the events it posts and the shared progress counter.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use condawiz::install::{InstallOrchestrator, InstallOutcome, InstallRequest, Installer};
use condawiz::progress::{ChannelSink, InstallEvent, ProgressSignal};
use condawiz::provider::InterpreterProvider;

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Run `request` to completion and return its outcome
pub async fn run_install(
    orchestrator: Arc<InstallOrchestrator>,
    request: InstallRequest,
    interactive: bool,
) -> Result<InstallOutcome> {
    let progress = Arc::new(ProgressSignal::new());
    let provider = Arc::new(InterpreterProvider::new());
    let (sink, rx) = ChannelSink::channel();

    let bar = if interactive { Some(install_bar()?) } else { None };

    let interrupt = watch_interrupt(progress.token());
    let render = tokio::spawn(render_events(rx, Arc::clone(&progress), bar));

    let work = {
        let progress = Arc::clone(&progress);
        let provider = Arc::clone(&provider);
        tokio::task::spawn_blocking(move || {
            orchestrator.run_install(&request, &progress, Arc::new(sink), provider.as_ref())
        })
    };
    let result = work.await.context("Install task panicked")?;

    interrupt.abort();
    render.await.ok();

    let outcome = InstallOutcome::from(result);
    info!(
        "{} provider: {}",
        provider.name(),
        provider.executable_or_label()
    );
    Ok(outcome)
}

fn install_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("\n[{bar:50.cyan/blue}] {pos:>3}%  {msg}\n")
            .context("Invalid progress bar template")?
            .progress_chars("█▓░"),
    );
    Ok(bar)
}

/// Cancel the run on the first Ctrl-C
fn watch_interrupt(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling install");
            token.cancel();
        }
    })
}

async fn render_events(
    mut rx: mpsc::UnboundedReceiver<InstallEvent>,
    progress: Arc<ProgressSignal>,
    bar: Option<ProgressBar>,
) {
    let mut ticker = tokio::time::interval(REDRAW_INTERVAL);
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => show_event(event, bar.as_ref()),
                None => break,
            },
            _ = ticker.tick() => {
                if let Some(bar) = &bar {
                    bar.set_position(percent_done(&progress));
                }
            }
        }
    }

    if let Some(bar) = bar {
        bar.set_position(percent_done(&progress));
        bar.finish_and_clear();
    }
}

fn show_event(event: InstallEvent, bar: Option<&ProgressBar>) {
    match (event, bar) {
        (InstallEvent::Starting, Some(bar)) => bar.set_message("Starting installer..."),
        (InstallEvent::Starting, None) => {
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
            let _ = writeln!(stdout, "⚡ Starting installation...\n");
            let _ = stdout.reset();
        }
        (InstallEvent::Stage { index, total, label }, Some(bar)) => {
            bar.set_message(format!("[{index}/{total}] {label}"));
        }
        (InstallEvent::Stage { index, total, label }, None) => {
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
            let _ = writeln!(stdout, "\n📦 [{index}/{total}] {label}");
            let _ = stdout.reset();
        }
        (InstallEvent::Output(text), Some(bar)) => bar.suspend(|| print_output(&text)),
        (InstallEvent::Output(text), None) => print_output(&text),
    }
}

fn print_output(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

fn percent_done(progress: &ProgressSignal) -> u64 {
    let total = progress.total();
    if total == 0 {
        return 0;
    }
    (progress.units_worked().min(total) * 100 / total) as u64
}
