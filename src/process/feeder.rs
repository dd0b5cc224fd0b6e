//! Scripted stdin for installers that may ask to overwrite a directory

use std::io::Write;
use std::path::Path;
use std::thread::{self, JoinHandle};

use log::debug;

use super::spec::StdinScript;

/// Response written when the installer may prompt about an existing directory
pub const AFFIRMATIVE_ANSWER: &str = "yes";

/// What the feeder did with the child's stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedAction {
    /// Wrote the affirmative answer, then closed
    Answered,
    /// Closed without writing
    Closed,
}

/// Feeds (or just closes) a child's stdin on its own thread
pub struct StdinFeeder {
    handle: JoinHandle<FeedAction>,
}

impl StdinFeeder {
    pub fn spawn<W>(name: &str, stdin: Option<W>, script: StdinScript) -> std::io::Result<Self>
    where
        W: Write + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || feed(stdin, &script))?;
        Ok(Self { handle })
    }

    pub fn join(self) -> FeedAction {
        self.handle.join().unwrap_or(FeedAction::Closed)
    }
}

/// `true` if an "overwrite existing directory?" prompt should be answered
pub fn should_answer(target: &Path) -> bool {
    target.is_dir()
}

fn feed<W: Write>(stdin: Option<W>, script: &StdinScript) -> FeedAction {
    let Some(mut stdin) = stdin else {
        return FeedAction::Closed;
    };

    let action = match script {
        StdinScript::AnswerIfDirExists(target) if should_answer(target) => {
            // The child may never read stdin; a broken pipe here is harmless
            if let Err(e) = writeln!(stdin, "{AFFIRMATIVE_ANSWER}").and_then(|()| stdin.flush()) {
                debug!("Installer did not accept stdin answer: {e}");
            }
            FeedAction::Answered
        }
        _ => FeedAction::Closed,
    };

    // Dropping the handle closes the pipe and signals EOF
    drop(stdin);
    action
}
