// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command};
use colored::Colorize;

use crate::config::Config;

#[derive(Debug, Default, Clone, Copy)]
pub struct CmdAuthLogin;

impl CmdAuthLogin {
    pub const NAME: &str = "login";

    pub fn command() -> Command {
        Command::new(Self::NAME).about("Authenticate with Google Calendar in the browser")
    }

    pub fn from(_matches: &ArgMatches) -> Self {
        Self
    }

    pub async fn run(self, config: &Config) -> Result<(), Box<dyn Error>> {
        let client = crate::build_client(config).await?;
        if client.is_authenticated() {
            println!("Already authenticated.");
            return Ok(());
        }

        println!("Opening your browser for Google sign-in...");
        client.authenticator().authorize().await?;
        println!("{}", "Authenticated with Google Calendar.".green());
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CmdAuthLogout;

impl CmdAuthLogout {
    pub const NAME: &str = "logout";

    pub fn command() -> Command {
        Command::new(Self::NAME).about("Remove the stored Google Calendar credentials")
    }

    pub fn from(_matches: &ArgMatches) -> Self {
        Self
    }

    pub async fn run(self, config: &Config) -> Result<(), Box<dyn Error>> {
        let client = crate::build_client(config).await?;
        client.authenticator().logout()?;
        println!("Logged out.");
        Ok(())
    }
}
