//! Subprocess plumbing: launch, drain, feed, supervise

mod drain;
mod feeder;
mod session;
mod spec;

pub use drain::{CapturedOutput, ChunkObserver, StreamDrainer};
pub use feeder::{AFFIRMATIVE_ANSWER, FeedAction, StdinFeeder, should_answer};
pub use session::{DEFAULT_POLL_INTERVAL, ProcessSession, SessionReport};
pub use spec::{ProcessSpec, StdinScript};
