//! Command-line arguments for `condawiz`

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "condawiz")]
#[command(version, about = "Install the Anaconda Python distribution")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Sub-commands (install is the default)
    #[command(subcommand)]
    pub sub: Option<Cmd>,

    #[command(flatten)]
    pub install: InstallArgs,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run the installer in batch mode (default if no sub-command)
    Install(InstallArgs),
    /// Launch the native installer's own interactive UI (Windows only)
    Manual {
        /// Directory holding installer/ resources
        #[arg(long)]
        resources: Option<PathBuf>,
    },
    /// Print the license text
    License {
        /// Directory holding installer/ resources
        #[arg(long)]
        resources: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Destination directory (must be absolute)
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Directory holding installer/ resources
    #[arg(long)]
    pub resources: Option<PathBuf>,

    /// Accept the license without showing it
    #[arg(long)]
    pub accept_license: bool,

    /// Install the minimal distribution then fetch packages with conda
    #[arg(long)]
    pub bootstrap: bool,

    /// Non-interactive mode for CI/server environments
    ///
    /// Requires --target and --accept-license.
    #[arg(long)]
    pub no_interaction: bool,
}

impl Args {
    /// The install arguments, whether given to `install` or at top level
    pub fn into_command(self) -> Cmd {
        self.sub.unwrap_or(Cmd::Install(self.install))
    }
}

impl InstallArgs {
    /// Skip every prompt
    pub fn is_non_interactive(&self) -> bool {
        self.no_interaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_installs() {
        let args = Args::try_parse_from(["condawiz", "--target", "/opt/anaconda", "--bootstrap"]).unwrap();
        match args.into_command() {
            Cmd::Install(install) => {
                assert_eq!(install.target, Some(PathBuf::from("/opt/anaconda")));
                assert!(install.bootstrap);
                assert!(!install.accept_license);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn install_subcommand_and_global_config() {
        let args = Args::try_parse_from([
            "condawiz",
            "install",
            "--no-interaction",
            "--accept-license",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
        match args.into_command() {
            Cmd::Install(install) => assert!(install.is_non_interactive() && install.accept_license),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn license_subcommand() {
        let args = Args::try_parse_from(["condawiz", "license", "--resources", "/srv/res"]).unwrap();
        assert!(matches!(args.into_command(), Cmd::License { resources: Some(_) }));
    }
}
