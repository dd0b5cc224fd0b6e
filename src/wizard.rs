//! Interactive installation wizard for `condawiz`

use anyhow::Result;
use inquire::validator::Validation;
use inquire::{Confirm, Text};
use std::io::Write;
use std::path::{Path, PathBuf};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use condawiz::install::{DestinationStatus, InstallMode, InstallOutcome, Platform, validate_destination};
use condawiz::resources::ResourceLocator;

use crate::cli::InstallArgs;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub const REVIEW_LICENSE: &str =
    "To continue the installation, you must review and approve the license term agreement.";

/// What the user picked
#[derive(Debug, Clone)]
pub struct WizardChoices {
    pub target: PathBuf,
    pub mode: InstallMode,
}

fn rule(stdout: &mut StandardStream) {
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "\n{RULE}\n");
    let _ = stdout.reset();
}

/// Display welcome banner
fn show_welcome() {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    rule(&mut stdout);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = writeln!(stdout, "                    A N A C O N D A");
    let _ = stdout.reset();
    let _ = writeln!(stdout, "\n        Scientific Python distribution installer");
    rule(&mut stdout);

    let _ = writeln!(stdout, "This will install:");
    let _ = writeln!(stdout, "  • A Python interpreter");
    let _ = writeln!(stdout, "  • The conda package manager and the Anaconda package set\n");
}

fn show_license(resources: &ResourceLocator) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(stdout, "License Agreement\n");
    let _ = stdout.reset();
    let _ = writeln!(stdout, "{}", resources.license_text_or_fallback());
    rule(&mut stdout);
}

/// Print a finished run's outcome
pub fn show_outcome(outcome: &InstallOutcome) {
    match outcome {
        InstallOutcome::Success { interpreter } => {
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            rule(&mut stdout);
            let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
            let _ = writeln!(stdout, "                    ✓ INSTALLATION COMPLETE\n");
            let _ = stdout.reset();
            let _ = writeln!(stdout, "Python interpreter:");
            let _ = writeln!(stdout, "  {}", interpreter.display());
            rule(&mut stdout);
        }
        InstallOutcome::Cancelled => {
            let mut stderr = StandardStream::stderr(ColorChoice::Auto);
            let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
            let _ = writeln!(stderr, "\n⚠ {}", outcome.message());
            let _ = stderr.reset();
        }
        InstallOutcome::Failed { diagnostic } => {
            let mut stderr = StandardStream::stderr(ColorChoice::Auto);
            let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
            let _ = writeln!(stderr, "\n❌ Installation failed");
            let _ = stderr.reset();
            let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
            let _ = writeln!(stderr, "   {diagnostic}");
            let _ = stderr.reset();
            let _ = writeln!(stderr, "   Please review the installer output above.\n");
        }
    }
}

fn prompt_destination(default_target: &Path) -> Result<PathBuf> {
    let default = default_target.to_string_lossy().into_owned();
    let mut prompt = Text::new("Install location:")
        .with_help_message("Absolute path of the directory to install Anaconda into")
        .with_validator(|input: &str| {
            let validation = match validate_destination(input) {
                Ok(_) => Validation::Valid,
                Err(e) => Validation::Invalid(e.to_string().into()),
            };
            Ok::<_, inquire::CustomUserError>(validation)
        });
    if !default.is_empty() {
        prompt = prompt.with_default(&default);
    }

    let answer = prompt
        .prompt()
        .map_err(|e| anyhow::anyhow!("Prompt cancelled: {}", e))?;
    let answer = answer.trim();

    if let Ok(status @ DestinationStatus::ExistingDirectory) = validate_destination(answer) {
        let overwrite = Confirm::new("Install into the existing directory anyway?")
            .with_default(false)
            .with_help_message(status.warning().unwrap_or_default())
            .prompt()
            .map_err(|e| anyhow::anyhow!("Prompt cancelled: {}", e))?;
        if !overwrite {
            anyhow::bail!("Installation cancelled by user");
        }
    }
    Ok(PathBuf::from(answer))
}

/// Run the interactive wizard
pub fn run_wizard(resources: &ResourceLocator, default_target: &Path, args: &InstallArgs) -> Result<WizardChoices> {
    show_welcome();

    if !args.accept_license {
        show_license(resources);
        let accepted = Confirm::new("I accept the terms of the license agreement")
            .with_default(false)
            .with_help_message(REVIEW_LICENSE)
            .prompt()
            .map_err(|e| anyhow::anyhow!("Prompt cancelled: {}", e))?;
        if !accepted {
            anyhow::bail!(REVIEW_LICENSE);
        }
    }

    let target = match &args.target {
        Some(target) => target.clone(),
        None => prompt_destination(default_target)?,
    };

    let bootstrap = if Platform::current() == Platform::Posix && !args.bootstrap {
        Confirm::new("Install the minimal distribution and fetch packages with conda?")
            .with_default(false)
            .with_help_message("Downloads the Anaconda package set after installing conda")
            .prompt()
            .map_err(|e| anyhow::anyhow!("Prompt cancelled: {}", e))?
    } else {
        args.bootstrap
    };

    println!("\n📋 Installation Summary:");
    println!("  • Destination: {}", target.display());
    println!("  • Mode: {}", if bootstrap { "Minimal + conda packages" } else { "Full installer" });
    println!();

    let proceed = Confirm::new("Proceed with these settings?")
        .with_default(true)
        .prompt()
        .map_err(|e| anyhow::anyhow!("Prompt cancelled: {}", e))?;
    if !proceed {
        anyhow::bail!("Installation cancelled by user");
    }

    Ok(WizardChoices {
        target,
        mode: if bootstrap { InstallMode::Bootstrap } else { InstallMode::Full },
    })
}

/// Check if the wizard should be skipped
///
/// `--no-interaction` always wins; otherwise prompts need a terminal.
pub fn is_non_interactive(args: &InstallArgs) -> bool {
    args.is_non_interactive() || !crate::environment::is_interactive_terminal()
}
