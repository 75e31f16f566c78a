// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

mod cli;
mod cmd_agent;
mod cmd_auth;
mod cmd_calendar;
mod cmd_setup;
mod cmd_status;
mod cmd_sync;
mod config;
mod launch_agent;

use std::error::Error;

use callsync_core::{
    AddressBookResolver, CallHistory, NameResolver, NullResolver, SyncLedger, SyncService,
    SETTING_CALENDAR_NAME,
};
use callsync_gcal::{Authenticator, GcalClient, OAuthConfig};

pub use crate::cli::{run, Cli, Commands};
pub use crate::config::Config;

/// Setting recorded by `setup` once the first-run flow finished.
pub(crate) const SETTING_SETUP_COMPLETE: &str = "setup_complete";

pub(crate) async fn build_client(config: &Config) -> Result<GcalClient, Box<dyn Error>> {
    let mut gcal_config = config.calendar.to_gcal_config();
    // An explicit config.toml name wins; otherwise the name chosen during
    // `setup` carries over.
    if config.calendar.calendar_name.is_none() {
        if let Some(name) = stored_calendar_name(config).await {
            gcal_config.calendar_name = name;
        }
    }
    let oauth = OAuthConfig::google(&gcal_config.client_id, &gcal_config.client_secret);
    let auth = Authenticator::new(oauth);
    Ok(GcalClient::new(gcal_config, auth)?)
}

async fn stored_calendar_name(config: &Config) -> Option<String> {
    let ledger = match SyncLedger::open(Some(&config.core.ledger_path())).await {
        Ok(ledger) => ledger,
        Err(e) => {
            tracing::debug!(error = %e, "ledger unavailable, using configured calendar name");
            return None;
        }
    };
    if let Err(e) = ledger.initialize().await {
        tracing::debug!(error = %e, "ledger unavailable, using configured calendar name");
        return None;
    }
    match ledger.get_setting(SETTING_CALENDAR_NAME).await {
        Ok(name) => name,
        Err(e) => {
            tracing::debug!(error = %e, "failed to read stored calendar name");
            None
        }
    }
}

pub(crate) async fn build_service(config: &Config) -> Result<SyncService, Box<dyn Error>> {
    let ledger = SyncLedger::open(Some(&config.core.ledger_path())).await?;
    let source = CallHistory::new(config.core.call_db_path());

    let address_book = config.core.address_book_path();
    let resolver: Box<dyn NameResolver> = if address_book.exists() {
        Box::new(AddressBookResolver::new(address_book))
    } else {
        tracing::debug!("address book not found, syncing without contact names");
        Box::new(NullResolver)
    };

    let client = build_client(config).await?;
    Ok(SyncService::new(
        Box::new(source),
        ledger,
        Box::new(client),
        resolver,
    ))
}
