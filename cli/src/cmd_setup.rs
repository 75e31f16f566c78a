// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use callsync_core::SETTING_CALENDAR_NAME;
use clap::{arg, ArgMatches, Command};
use colored::Colorize;

use crate::config::Config;
use crate::launch_agent::{LaunchAgent, DEFAULT_INTERVAL_SECS};
use crate::SETTING_SETUP_COMPLETE;

#[derive(Debug, Default, Clone)]
pub struct CmdSetup {
    pub calendar_name: Option<String>,
    pub with_agent: bool,
}

impl CmdSetup {
    pub const NAME: &str = "setup";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("First-run setup: check access, sign in, and enable background sync")
            .arg(arg!(--"calendar-name" [NAME] "Name of the tracking calendar"))
            .arg(arg!(--"with-agent" "Also install the background sync agent"))
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            calendar_name: matches.get_one::<String>("calendar-name").cloned(),
            with_agent: matches.get_flag("with-agent"),
        }
    }

    pub async fn run(self, config: &Config) -> Result<(), Box<dyn Error>> {
        let service = crate::build_service(config).await?;

        println!("Checking call history access...");
        let problems = service.check_prerequisites().await;
        if problems.iter().any(|p| p.contains("Full Disk Access")) {
            println!(
                "\nGrant Full Disk Access to your terminal in System Settings > \
                 Privacy & Security > Full Disk Access, then run setup again."
            );
            return Err("Full Disk Access permission is required.".into());
        }
        if problems.iter().any(|p| p.contains("not found")) {
            return Err("Call history database not found on this machine.".into());
        }
        println!("{} call history is readable", "✓".green());

        let client = crate::build_client(config).await?;
        if client.is_authenticated() {
            println!("{} already authenticated", "✓".green());
        } else {
            println!("Opening your browser for Google sign-in...");
            client.authenticator().authorize().await?;
            println!("{} authenticated", "✓".green());
        }

        let ledger = service.ledger();
        ledger.initialize().await?;
        let calendar_name = self
            .calendar_name
            .unwrap_or_else(|| client.calendar_name().to_string());
        ledger
            .set_setting(SETTING_CALENDAR_NAME, &calendar_name)
            .await?;

        if self.with_agent {
            let agent = LaunchAgent::current(DEFAULT_INTERVAL_SECS)?;
            agent.install()?;
            println!("{} background agent installed", "✓".green());
        }

        ledger.set_setting(SETTING_SETUP_COMPLETE, "true").await?;
        println!(
            "\n{} Run {} to sync your calls.",
            "Setup complete.".green().bold(),
            "callsync sync".bold()
        );
        Ok(())
    }
}
