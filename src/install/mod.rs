//! Installing the distribution: planning, running and classifying
//!
//! Callers build an [`InstallRequest`], hand it to an [`InstallOrchestrator`]
//! together with a progress signal and an output sink, and get back one
//! [`InstallOutcome`].

mod destination;
mod orchestrator;
mod outcome;
mod plan;
mod platform;

pub use destination::{DestinationError, DestinationStatus, default_install_location, validate_destination};
pub use orchestrator::{InstallCompleteHandler, InstallOrchestrator, Installer};
pub use outcome::{ERROR_MARKER, InstallOutcome, UNKNOWN_ERROR, check_follow_up, extract_diagnostic, resolve_interpreter};
pub use plan::{
    APPROX_STDOUT_CHARS, InstallMode, InstallPlan, InstallRequest, InstallSettings, StagePlan, installer_stage,
    package_stage,
};
pub use platform::Platform;
