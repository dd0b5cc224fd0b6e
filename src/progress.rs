//! Progress tracking and output delivery for installer runs
//!
//! The core never talks to a UI directly. Workers bump a shared
//! [`ProgressSignal`] and push text into an [`OutputSink`]; whatever owns the
//! screen drains those on its own schedule.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use atomic_counter::{AtomicCounter, RelaxedCounter};
use log::warn;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Caller-owned progress counter plus cancellation flag
///
/// Safe for concurrent `worked` increments from the drain threads and
/// concurrent cancellation reads from the supervisor.
#[derive(Debug, Default)]
pub struct ProgressSignal {
    worked: RelaxedCounter,
    total: AtomicUsize,
    task: Mutex<String>,
    cancel: CancellationToken,
}

impl ProgressSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the signal to an existing token so the UI can cancel from elsewhere
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    /// Start a new task; resets the counter and sets the expected total
    pub fn begin_task(&self, name: &str, total: usize) {
        self.worked.reset();
        self.total.store(total, Ordering::Relaxed);
        if let Ok(mut task) = self.task.lock() {
            task.clear();
            task.push_str(name);
        }
    }

    pub fn worked(&self, units: usize) {
        self.worked.add(units);
    }

    /// Units consumed so far. May overshoot `total`; that is cosmetic
    pub fn units_worked(&self) -> usize {
        self.worked.get()
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn task_name(&self) -> String {
        self.task.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Mark the current task complete (counter pinned to the total)
    pub fn done(&self) {
        let total = self.total();
        let worked = self.worked.get();
        if worked < total {
            self.worked.add(total - worked);
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Receiver of installer output, callable from any worker thread
pub trait OutputSink: Send + Sync {
    /// Called once before the first process launches
    fn starting(&self) {}

    /// Text meant for a console-like view. Called per chunk, unbuffered
    fn output(&self, text: &str);

    /// A new stage is about to run (1-based `index`)
    fn stage(&self, _index: usize, _total: usize, _label: &str) {}
}

/// Events posted to a UI-owned channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    Starting,
    Output(String),
    Stage {
        index: usize,
        total: usize,
        label: String,
    },
}

/// [`OutputSink`] that posts [`InstallEvent`]s to a tokio channel
///
/// Sending is best effort: once the receiver is gone the sink goes quiet and
/// the install carries on without a UI.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<InstallEvent>,
    disabled: AtomicBool,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<InstallEvent>) -> Self {
        Self {
            tx,
            disabled: AtomicBool::new(false),
        }
    }

    /// Convenience constructor returning the sink and its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InstallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn post(&self, event: InstallEvent) {
        if self.disabled.load(Ordering::Relaxed) {
            return;
        }
        if self.tx.send(event).is_err() {
            warn!("Output channel closed. Installation will continue without output updates.");
            self.disabled.store(true, Ordering::Relaxed);
        }
    }
}

impl OutputSink for ChannelSink {
    fn starting(&self) {
        self.post(InstallEvent::Starting);
    }

    fn output(&self, text: &str) {
        self.post(InstallEvent::Output(text.to_string()));
    }

    fn stage(&self, index: usize, total: usize, label: &str) {
        self.post(InstallEvent::Stage {
            index,
            total,
            label: label.to_string(),
        });
    }
}

/// [`OutputSink`] that keeps everything in memory (headless runs, tests)
#[derive(Debug, Default)]
pub struct BufferSink {
    text: Mutex<String>,
    starts: AtomicUsize,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.text.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// How many times `starting` has been called
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::Relaxed)
    }
}

impl OutputSink for BufferSink {
    fn starting(&self) {
        self.starts.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut text) = self.text.lock() {
            text.clear();
        }
    }

    fn output(&self, text: &str) {
        if let Ok(mut buf) = self.text.lock() {
            buf.push_str(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let progress = Arc::new(ProgressSignal::new());
        progress.begin_task("Installing", 4000);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let progress = Arc::clone(&progress);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        progress.worked(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(progress.units_worked(), 4000);
    }

    #[test]
    fn begin_task_resets_counter() {
        let progress = ProgressSignal::new();
        progress.begin_task("first", 10);
        progress.worked(7);
        progress.begin_task("second", 20);
        assert_eq!(progress.units_worked(), 0);
        assert_eq!(progress.total(), 20);
        assert_eq!(progress.task_name(), "second");
    }

    #[test]
    fn done_pins_counter_to_total() {
        let progress = ProgressSignal::new();
        progress.begin_task("x", 50);
        progress.worked(10);
        progress.done();
        assert_eq!(progress.units_worked(), 50);
    }

    #[test]
    fn cancellation_is_shared_through_token() {
        let token = CancellationToken::new();
        let progress = ProgressSignal::with_token(token.clone());
        assert!(!progress.is_cancelled());
        token.cancel();
        assert!(progress.is_cancelled());
    }

    #[test]
    fn channel_sink_posts_events_in_order() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.starting();
        sink.stage(1, 2, "Installing");
        sink.output("hello");

        assert_eq!(rx.try_recv().unwrap(), InstallEvent::Starting);
        assert_eq!(
            rx.try_recv().unwrap(),
            InstallEvent::Stage {
                index: 1,
                total: 2,
                label: "Installing".to_string()
            }
        );
        assert_eq!(rx.try_recv().unwrap(), InstallEvent::Output("hello".into()));
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.output("nobody listening");
        sink.output("still fine");
        assert!(sink.disabled.load(Ordering::Relaxed));
    }

    #[test]
    fn buffer_sink_clears_on_start() {
        let sink = BufferSink::new();
        sink.output("stale");
        sink.starting();
        sink.output("fresh");
        assert_eq!(sink.contents(), "fresh");
        assert_eq!(sink.start_count(), 1);
    }
}
