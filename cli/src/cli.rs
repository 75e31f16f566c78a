// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, ffi::OsString, path::PathBuf};

use clap::{arg, builder::styling, crate_version, value_parser, ArgMatches, Command, ValueHint};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::cmd_agent::{CmdAgentInstall, CmdAgentStatus, CmdAgentUninstall};
use crate::cmd_auth::{CmdAuthLogin, CmdAuthLogout};
use crate::cmd_calendar::CmdCalendarClear;
use crate::cmd_setup::CmdSetup;
use crate::cmd_status::CmdStatus;
use crate::cmd_sync::CmdSync;
use crate::config::parse_config;

/// Run the callsync command-line interface.
pub async fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();
    match Cli::parse() {
        Ok(cli) => {
            if let Err(e) = cli.run().await {
                eprintln!("{} {e}", "Error:".red());
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{} {e}", "Error:".red());
            std::process::exit(2);
        }
    }
    Ok(())
}

fn init_tracing() {
    // --verbose raises the default level; RUST_LOG always wins.
    let default = if std::env::args().any(|a| a == "--verbose" || a == "-v") {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Command-line interface
#[derive(Debug)]
pub struct Cli {
    /// Path to the configuration file
    pub config: Option<PathBuf>,

    /// The command to execute
    pub command: Commands,
}

impl Cli {
    /// Create the command-line interface
    pub fn command() -> Command {
        const STYLES: styling::Styles = styling::Styles::styled()
            .header(styling::AnsiColor::Green.on_default().bold())
            .usage(styling::AnsiColor::Green.on_default().bold())
            .literal(styling::AnsiColor::Blue.on_default().bold())
            .placeholder(styling::AnsiColor::Cyan.on_default());

        Command::new("callsync")
            .about("Sync macOS call history to Google Calendar")
            .version(crate_version!())
            .styles(STYLES)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                arg!(-c --config [CONFIG] "Path to the configuration file")
                    .long_help(
                        "\
Path to the configuration file. Defaults to $XDG_CONFIG_HOME/callsync/config.toml; \
the CALLSYNC_CONFIG environment variable overrides the default.",
                    )
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::FilePath)
                    .global(true),
            )
            .arg(
                arg!(-v --verbose "Enable debug logging")
                    .global(true)
                    .action(clap::ArgAction::SetTrue),
            )
            .subcommand(CmdSync::command())
            .subcommand(CmdStatus::command())
            .subcommand(CmdSetup::command())
            .subcommand(
                Command::new("auth")
                    .about("Manage Google Calendar credentials")
                    .arg_required_else_help(true)
                    .subcommand_required(true)
                    .subcommand(CmdAuthLogin::command())
                    .subcommand(CmdAuthLogout::command()),
            )
            .subcommand(
                Command::new("agent")
                    .about("Manage the background sync agent")
                    .arg_required_else_help(true)
                    .subcommand_required(true)
                    .subcommand(CmdAgentInstall::command())
                    .subcommand(CmdAgentUninstall::command())
                    .subcommand(CmdAgentStatus::command()),
            )
            .subcommand(
                Command::new("calendar")
                    .about("Manage the tracking calendar")
                    .arg_required_else_help(true)
                    .subcommand_required(true)
                    .subcommand(CmdCalendarClear::command()),
            )
    }

    /// Parse the command-line arguments
    pub fn parse() -> Result<Self, Box<dyn Error>> {
        let commands = Self::command();
        let matches = commands.get_matches();
        Self::from(matches)
    }

    /// Parse the specified arguments
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let commands = Self::command();
        let matches = commands.try_get_matches_from(args)?;
        Self::from(matches)
    }

    /// Create a CLI instance from the `ArgMatches`
    pub fn from(matches: ArgMatches) -> Result<Self, Box<dyn Error>> {
        use Commands::*;
        let command = match matches.subcommand() {
            Some((CmdSync::NAME, matches)) => Sync(CmdSync::from(matches)?),
            Some((CmdStatus::NAME, matches)) => Status(CmdStatus::from(matches)),
            Some((CmdSetup::NAME, matches)) => Setup(CmdSetup::from(matches)),
            Some(("auth", matches)) => match matches.subcommand() {
                Some((CmdAuthLogin::NAME, matches)) => AuthLogin(CmdAuthLogin::from(matches)),
                Some((CmdAuthLogout::NAME, matches)) => AuthLogout(CmdAuthLogout::from(matches)),
                _ => unreachable!(),
            },
            Some(("agent", matches)) => match matches.subcommand() {
                Some((CmdAgentInstall::NAME, matches)) => {
                    AgentInstall(CmdAgentInstall::from(matches))
                }
                Some((CmdAgentUninstall::NAME, matches)) => {
                    AgentUninstall(CmdAgentUninstall::from(matches))
                }
                Some((CmdAgentStatus::NAME, matches)) => AgentStatus(CmdAgentStatus::from(matches)),
                _ => unreachable!(),
            },
            Some(("calendar", matches)) => match matches.subcommand() {
                Some((CmdCalendarClear::NAME, matches)) => {
                    CalendarClear(CmdCalendarClear::from(matches))
                }
                _ => unreachable!(),
            },
            _ => unreachable!(),
        };

        let config = matches.get_one("config").cloned();
        Ok(Cli { config, command })
    }

    /// Run the command
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        self.command.run(self.config).await
    }
}

/// The commands available in the CLI
#[derive(Debug, Clone)]
pub enum Commands {
    /// Run one sync pass
    Sync(CmdSync),

    /// Show sync health and counters
    Status(CmdStatus),

    /// First-run setup flow
    Setup(CmdSetup),

    /// Authenticate with Google Calendar
    AuthLogin(CmdAuthLogin),

    /// Remove stored credentials
    AuthLogout(CmdAuthLogout),

    /// Install the background agent
    AgentInstall(CmdAgentInstall),

    /// Remove the background agent
    AgentUninstall(CmdAgentUninstall),

    /// Show whether the background agent is installed
    AgentStatus(CmdAgentStatus),

    /// Delete every event on the tracking calendar
    CalendarClear(CmdCalendarClear),
}

impl Commands {
    /// Run the command with the given configuration
    #[rustfmt::skip]
    pub async fn run(self, config: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
        use Commands::*;
        let config = parse_config(config).await?;
        match self {
            Sync(a)           => a.run(&config).await,
            Status(a)         => a.run(&config).await,
            Setup(a)          => a.run(&config).await,
            AuthLogin(a)      => a.run(&config).await,
            AuthLogout(a)     => a.run(&config).await,
            AgentInstall(a)   => a.run().await,
            AgentUninstall(a) => a.run().await,
            AgentStatus(a)    => a.run().await,
            CalendarClear(a)  => a.run(&config).await,
        }
    }
}
