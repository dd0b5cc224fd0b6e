mod cli;
mod environment;
mod runner;
mod wizard;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use condawiz::install::{
    InstallMode, InstallOrchestrator, InstallRequest, InstallSettings, Installer, Platform,
    default_install_location, validate_destination,
};
use condawiz::{InstallerConfig, ResourceLocator};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main()) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<()> {
    let args = cli::Args::parse();

    let cfg_path = match &args.config {
        Some(path) => path.clone(),
        None => InstallerConfig::default_path()?,
    };
    let cfg = InstallerConfig::load_or_create(&cfg_path)?;

    match args.into_command() {
        cli::Cmd::Install(install) => run_install(&cfg, install).await,
        cli::Cmd::Manual { resources } => handle_manual(&cfg, resources),
        cli::Cmd::License { resources } => handle_license(&cfg, resources),
    }
}

fn resource_locator(cfg: &InstallerConfig, override_dir: Option<PathBuf>) -> Result<ResourceLocator> {
    let root = match override_dir {
        Some(dir) => dir,
        None => cfg.resources_root()?,
    };
    let locator = ResourceLocator::new(root);
    info!("Using resources from: {}", locator.root().display());
    Ok(locator)
}

async fn run_install(cfg: &InstallerConfig, args: cli::InstallArgs) -> Result<()> {
    let resources = resource_locator(cfg, args.resources.clone())?;
    let default_target = cfg
        .default_target
        .clone()
        .unwrap_or_else(|| default_install_location(Platform::current()));

    let interactive = !wizard::is_non_interactive(&args);
    let (target, mode) = if interactive {
        let choices = wizard::run_wizard(&resources, &default_target, &args)?;
        (choices.target, choices.mode)
    } else {
        if !args.accept_license {
            anyhow::bail!("{} Pass --accept-license to continue.", wizard::REVIEW_LICENSE);
        }
        let target = args
            .target
            .clone()
            .context("--target is required with --no-interaction")?;
        let mode = if args.bootstrap { InstallMode::Bootstrap } else { InstallMode::Full };
        (target, mode)
    };

    let status = validate_destination(&target.to_string_lossy())
        .with_context(|| format!("Invalid destination {}", target.display()))?;
    if let Some(warning) = status.warning() {
        warn!("{warning}");
    }

    let orchestrator = Arc::new(InstallOrchestrator::new(resources, InstallSettings::from(cfg)));
    let request = InstallRequest::new(target).mode(mode);
    let outcome = runner::run_install(orchestrator, request, interactive).await?;

    wizard::show_outcome(&outcome);
    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn handle_manual(cfg: &InstallerConfig, resources: Option<PathBuf>) -> Result<()> {
    let orchestrator = InstallOrchestrator::new(resource_locator(cfg, resources)?, InstallSettings::from(cfg));
    orchestrator
        .run_manual_install()
        .context("Failed to launch the interactive installer")?;
    println!("Interactive installer launched");
    Ok(())
}

fn handle_license(cfg: &InstallerConfig, resources: Option<PathBuf>) -> Result<()> {
    println!("{}", resource_locator(cfg, resources)?.license_text_or_fallback());
    Ok(())
}
