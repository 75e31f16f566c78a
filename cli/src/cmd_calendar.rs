// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use callsync_core::SyncLedger;
use callsync_gcal::ProgressFn;
use clap::{arg, ArgMatches, Command};
use colored::Colorize;

use crate::config::Config;

#[derive(Debug, Default, Clone, Copy)]
pub struct CmdCalendarClear {
    pub yes: bool,
}

impl CmdCalendarClear {
    pub const NAME: &str = "clear";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Delete every event on the tracking calendar and reset sync state")
            .arg(arg!(--yes "Skip the confirmation"))
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            yes: matches.get_flag("yes"),
        }
    }

    pub async fn run(self, config: &Config) -> Result<(), Box<dyn Error>> {
        if !self.yes {
            return Err(
                "This deletes every event on the tracking calendar. \
                 Re-run with --yes to confirm."
                    .into(),
            );
        }

        let client = crate::build_client(config).await?;
        if !client.is_authenticated() {
            return Err("Not authenticated with Google Calendar.".into());
        }

        println!("Clearing calendar {}...", client.calendar_name().bold());
        let progress: ProgressFn = Box::new(|done, total| {
            println!("  {done}/{total} events");
        });
        let deleted = client.clear_calendar(Some(&progress)).await?;

        // Forget the synced set so the next sync can re-create events.
        let ledger = SyncLedger::open(Some(&config.core.ledger_path())).await?;
        ledger.initialize().await?;
        let forgotten = ledger.clear_all_synced().await?;

        println!(
            "{} deleted {deleted} events, reset {forgotten} ledger entries",
            "Done:".green()
        );
        Ok(())
    }
}
