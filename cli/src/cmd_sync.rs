// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use callsync_core::{ProgressFn, SyncOptions};
use clap::{arg, ArgMatches, Command};
use colored::Colorize;
use jiff::Timestamp;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct CmdSync {
    pub dry_run: bool,
    pub all_calls: bool,
    pub all_history: bool,
    pub no_batch: bool,
    pub since: Option<Timestamp>,
}

impl CmdSync {
    pub const NAME: &str = "sync";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Sync new calls to Google Calendar")
            .arg(arg!(--"dry-run" "Report what would be synced without creating events"))
            .arg(arg!(--"all-calls" "Include missed and unanswered calls"))
            .arg(arg!(--"all-history" "Ignore the first-sync window and read the whole history"))
            .arg(arg!(--"no-batch" "Create events one by one instead of batching"))
            .arg(arg!(--since [SINCE] "Only sync calls after this RFC 3339 timestamp"))
    }

    pub fn from(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        let since = matches
            .get_one::<String>("since")
            .map(|s| {
                s.parse::<Timestamp>()
                    .map_err(|e| format!("Invalid --since timestamp {s:?}: {e}"))
            })
            .transpose()?;

        Ok(Self {
            dry_run: matches.get_flag("dry-run"),
            all_calls: matches.get_flag("all-calls"),
            all_history: matches.get_flag("all-history"),
            no_batch: matches.get_flag("no-batch"),
            since,
        })
    }

    pub async fn run(self, config: &Config) -> Result<(), Box<dyn Error>> {
        let service = crate::build_service(config).await?;

        let options = SyncOptions {
            dry_run: self.dry_run,
            answered_only: !self.all_calls,
            sync_all_history: self.all_history,
            use_batch: !self.no_batch,
            since: self.since,
            min_age_seconds: config.core.min_call_age_seconds(),
        };

        let progress: ProgressFn = Box::new(|done, total| {
            println!("  {done}/{total} calls");
        });
        let result = service.sync(&options, Some(&progress)).await;

        for error in &result.errors {
            eprintln!("{} {error}", "✗".red());
        }
        if result.success {
            if self.dry_run && result.calls_synced > 0 {
                println!(
                    "{} would sync {} calls ({} skipped)",
                    "Dry run:".bold(),
                    result.calls_synced,
                    result.calls_skipped
                );
            } else {
                println!("{}", result.to_string().green());
            }
            Ok(())
        } else {
            Err(result.to_string().into())
        }
    }
}
