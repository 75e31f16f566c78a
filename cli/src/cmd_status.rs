// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command};
use colored::{ColoredString, Colorize};

use crate::config::Config;
use crate::launch_agent::{LaunchAgent, DEFAULT_INTERVAL_SECS};
use crate::SETTING_SETUP_COMPLETE;

#[derive(Debug, Default, Clone, Copy)]
pub struct CmdStatus;

impl CmdStatus {
    pub const NAME: &str = "status";

    pub fn command() -> Command {
        Command::new(Self::NAME).about("Show sync health and counters")
    }

    pub fn from(_matches: &ArgMatches) -> Self {
        Self
    }

    pub async fn run(self, config: &Config) -> Result<(), Box<dyn Error>> {
        let service = crate::build_service(config).await?;
        let status = service.sync_status().await;

        let agent_installed = LaunchAgent::current(DEFAULT_INTERVAL_SECS)
            .map(|a| a.is_installed())
            .unwrap_or(false);
        let setup_complete = {
            let ledger = service.ledger();
            ledger.initialize().await?;
            ledger.get_setting(SETTING_SETUP_COMPLETE).await?.as_deref() == Some("true")
        };

        println!("{} Full Disk Access", mark(status.call_db_accessible));
        println!("{} Google Calendar authentication", mark(status.authenticated));
        println!("{} Background agent installed", mark(agent_installed));
        println!("{} Setup complete", mark(setup_complete));
        println!();
        println!(
            "Synced {} of {} calls",
            status.synced_calls.to_string().bold(),
            status.total_calls
        );

        if !status.call_db_accessible {
            println!();
            println!(
                "Grant Full Disk Access to your terminal in System Settings > \
                 Privacy & Security, then try again."
            );
        }
        Ok(())
    }
}

fn mark(ok: bool) -> ColoredString {
    if ok { "✓".green() } else { "✗".red() }
}
