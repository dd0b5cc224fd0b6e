//! Anaconda installer core
//!
//! Runs the distribution's native installer as a supervised subprocess,
//! streams its output to the caller, honours cancellation, and reports
//! where the Python interpreter ended up.

pub mod config;
pub mod error;
pub mod install;
pub mod process;
pub mod progress;
pub mod provider;
pub mod resources;

pub use config::InstallerConfig;
pub use error::InstallerError;
pub use install::{InstallMode, InstallOrchestrator, InstallOutcome, InstallRequest, Installer, Platform};
pub use progress::{BufferSink, ChannelSink, InstallEvent, OutputSink, ProgressSignal};
pub use provider::InterpreterProvider;
pub use resources::ResourceLocator;
