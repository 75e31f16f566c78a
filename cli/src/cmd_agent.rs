// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{arg, value_parser, ArgMatches, Command};
use colored::Colorize;

use crate::launch_agent::{LaunchAgent, DEFAULT_INTERVAL_SECS};

#[derive(Debug, Clone, Copy)]
pub struct CmdAgentInstall {
    pub interval_secs: u32,
}

impl CmdAgentInstall {
    pub const NAME: &str = "install";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Install the LaunchAgent that syncs in the background")
            .arg(
                arg!(--interval [SECONDS] "Seconds between background syncs")
                    .value_parser(value_parser!(u32).range(60..))
                    .default_value("3600"),
            )
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            interval_secs: matches
                .get_one::<u32>("interval")
                .copied()
                .unwrap_or(DEFAULT_INTERVAL_SECS),
        }
    }

    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        let agent = LaunchAgent::current(self.interval_secs)?;
        let path = agent.install()?;
        println!(
            "{} installed at {}, syncing every {}s",
            "Agent".green(),
            path.display(),
            self.interval_secs
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CmdAgentUninstall;

impl CmdAgentUninstall {
    pub const NAME: &str = "uninstall";

    pub fn command() -> Command {
        Command::new(Self::NAME).about("Remove the background sync LaunchAgent")
    }

    pub fn from(_matches: &ArgMatches) -> Self {
        Self
    }

    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        let agent = LaunchAgent::current(DEFAULT_INTERVAL_SECS)?;
        if agent.uninstall()? {
            println!("Agent removed.");
        } else {
            println!("Agent is not installed.");
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CmdAgentStatus;

impl CmdAgentStatus {
    pub const NAME: &str = "status";

    pub fn command() -> Command {
        Command::new(Self::NAME).about("Show whether the background agent is installed")
    }

    pub fn from(_matches: &ArgMatches) -> Self {
        Self
    }

    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        let agent = LaunchAgent::current(DEFAULT_INTERVAL_SECS)?;
        if agent.is_installed() {
            println!("{} installed at {}", "✓".green(), agent.plist_path().display());
        } else {
            println!("{} not installed", "✗".red());
        }
        Ok(())
    }
}
