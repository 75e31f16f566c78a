// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Background-sync LaunchAgent management.
//!
//! Installation writes a plist under `~/Library/LaunchAgents` that runs
//! `callsync sync` on a fixed interval and hands it to `launchctl`.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const AGENT_LABEL: &str = "com.callsync.agent";

/// How often the agent syncs, in seconds.
pub const DEFAULT_INTERVAL_SECS: u32 = 3600;

#[derive(Debug, Clone)]
pub struct LaunchAgent {
    home: PathBuf,
    program: PathBuf,
    interval_secs: u32,
}

impl LaunchAgent {
    /// Agent for the current user and the running binary.
    pub fn current(interval_secs: u32) -> Result<Self, Box<dyn Error>> {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or("HOME is not set")?;
        let program = std::env::current_exe()
            .map_err(|e| format!("Failed to locate the callsync binary: {e}"))?;
        Ok(Self {
            home,
            program,
            interval_secs,
        })
    }

    pub fn with_paths(home: impl Into<PathBuf>, program: impl Into<PathBuf>, interval_secs: u32) -> Self {
        Self {
            home: home.into(),
            program: program.into(),
            interval_secs,
        }
    }

    pub fn plist_path(&self) -> PathBuf {
        self.home
            .join("Library/LaunchAgents")
            .join(format!("{AGENT_LABEL}.plist"))
    }

    fn log_dir(&self) -> PathBuf {
        self.home.join("Library/Logs/callsync")
    }

    pub fn is_installed(&self) -> bool {
        self.plist_path().exists()
    }

    /// Writes the plist and loads it. Returns the plist path.
    pub fn install(&self) -> Result<PathBuf, Box<dyn Error>> {
        let path = self.plist_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::create_dir_all(self.log_dir())?;
        std::fs::write(&path, self.plist_content())?;

        launchctl(&["load", "-w"], &path);
        tracing::info!(path = %path.display(), "installed launch agent");
        Ok(path)
    }

    /// Unloads and removes the plist. `false` when it was not installed.
    pub fn uninstall(&self) -> Result<bool, Box<dyn Error>> {
        let path = self.plist_path();
        if !path.exists() {
            return Ok(false);
        }

        launchctl(&["unload"], &path);
        std::fs::remove_file(&path)?;
        tracing::info!(path = %path.display(), "removed launch agent");
        Ok(true)
    }

    pub fn plist_content(&self) -> String {
        let log_dir = self.log_dir();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{program}</string>
        <string>sync</string>
    </array>
    <key>StartInterval</key>
    <integer>{interval}</integer>
    <key>RunAtLoad</key>
    <true/>
    <key>StandardOutPath</key>
    <string>{logs}/agent.log</string>
    <key>StandardErrorPath</key>
    <string>{logs}/agent.err.log</string>
</dict>
</plist>
"#,
            label = AGENT_LABEL,
            program = self.program.display(),
            interval = self.interval_secs,
            logs = log_dir.display(),
        )
    }
}

/// `launchctl` is absent off-macOS and load/unload of an already (un)loaded
/// agent fails; neither should fail the command.
fn launchctl(args: &[&str], plist: &Path) {
    let result = Command::new("launchctl").args(args).arg(plist).status();
    match result {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::warn!(?args, %status, "launchctl exited non-zero"),
        Err(e) => tracing::warn!(?args, error = %e, "failed to run launchctl"),
    }
}
