//! Subprocess adapter for the board's command-line utility. The vendor tool
//! already speaks I2C to the board; shelling out keeps this crate off the
//! bus and matches how the rest of the host is driven.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use super::watchdog::{clamp_wake, clamp_watchdog, StatusFlags, WatchdogDevice};
use super::{DeviceError, DeviceResult};

/// Drives the watchdog/wake board through its CLI tool
/// (`piwatcher status|reset|led|watch|wake`).
#[derive(Debug, Clone)]
pub struct PiWatcherCli {
    bin: PathBuf,
}

impl PiWatcherCli {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    async fn run(&self, args: &[&str]) -> DeviceResult<String> {
        let out = Command::new(&self.bin).args(args).output().await?;
        if !out.status.success() {
            return Err(DeviceError::CommandFailed {
                command: format!("{} {}", self.bin.display(), args.join(" ")),
                detail: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[async_trait]
impl WatchdogDevice for PiWatcherCli {
    async fn status(&self) -> DeviceResult<StatusFlags> {
        let out = self.run(&["status"]).await?;
        tracing::trace!(raw = %out.trim(), "board status");
        Ok(parse_status(&out))
    }

    async fn reset_status(&self) -> DeviceResult<()> {
        self.run(&["reset"]).await.map(drop)
    }

    async fn set_led(&self, on: bool) -> DeviceResult<()> {
        self.run(&["led", if on { "on" } else { "off" }]).await.map(drop)
    }

    async fn arm_watchdog(&self, seconds: u16) -> DeviceResult<()> {
        let seconds = clamp_watchdog(seconds);
        self.run(&["watch", &seconds.to_string()]).await.map(drop)
    }

    async fn arm_wake(&self, seconds: u32) -> DeviceResult<()> {
        let seconds = clamp_wake(seconds);
        self.run(&["wake", &seconds.to_string()]).await.map(drop)
    }
}

/// The tool prints the register as space-separated flag words after an
/// `OK` marker; absent words are cleared bits. Unknown words are ignored
/// so a firmware that grows new flags does not break the parse.
fn parse_status(out: &str) -> StatusFlags {
    let mut flags = StatusFlags::default();
    for word in out.split_whitespace() {
        match word {
            "button_pressed" => flags.button_pressed = true,
            "button_rebooted" => flags.button_rebooted = true,
            "timer_rebooted" => flags.timer_rebooted = true,
            _ => {}
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flag_words() {
        let flags = parse_status("OK button_pressed timer_rebooted\n");
        assert!(flags.button_pressed);
        assert!(!flags.button_rebooted);
        assert!(flags.timer_rebooted);
    }

    #[test]
    fn clean_status_has_no_flags() {
        assert_eq!(parse_status("OK\n"), StatusFlags::default());
        assert_eq!(parse_status(""), StatusFlags::default());
    }

    #[test]
    fn unknown_words_are_ignored() {
        let flags = parse_status("OK 0x42 firmware=2.3 button_rebooted");
        assert!(flags.button_rebooted);
        assert!(!flags.button_pressed);
    }
}
