//! Host-side collaborators: the `shutdown(8)` invoker and the boot-time
//! keepalive unit that must be stopped before this process takes over
//! watchdog duties.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use super::{DeviceError, DeviceResult};
use crate::schedule::TimeOfDay;

/// When a requested shutdown takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownWhen {
    Now,
    /// Relative deferral in minutes (`shutdown +N`).
    DeferMins(u32),
    /// Absolute wall-clock time (`shutdown HH:MM`).
    At(TimeOfDay),
    /// Cancel a pending shutdown (`shutdown -c`).
    Cancel,
}

impl ShutdownWhen {
    fn arg(self) -> String {
        match self {
            Self::Now => "now".to_owned(),
            Self::DeferMins(mins) => format!("+{mins}"),
            Self::At(t) => t.to_string(),
            Self::Cancel => "-c".to_owned(),
        }
    }
}

#[async_trait]
pub trait HostControl: Send + Sync {
    /// Invoke the host power-off. `message` becomes the wall message.
    async fn shutdown(&self, message: &str, when: ShutdownWhen) -> DeviceResult<()>;
    /// Stop the boot-time keepalive unit. Idempotent; stopping an already
    /// stopped unit succeeds.
    async fn stop_boot_service(&self) -> DeviceResult<()>;
}

/// The real host: `/sbin/shutdown` and `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemdHost {
    shutdown_bin: PathBuf,
    systemctl_bin: PathBuf,
    boot_service: String,
}

impl SystemdHost {
    pub fn new(
        shutdown_bin: impl Into<PathBuf>,
        systemctl_bin: impl Into<PathBuf>,
        boot_service: impl Into<String>,
    ) -> Self {
        Self {
            shutdown_bin: shutdown_bin.into(),
            systemctl_bin: systemctl_bin.into(),
            boot_service: boot_service.into(),
        }
    }
}

async fn run(bin: &PathBuf, args: &[&str]) -> DeviceResult<()> {
    let out = Command::new(bin).args(args).output().await?;
    if !out.status.success() {
        return Err(DeviceError::CommandFailed {
            command: format!("{} {}", bin.display(), args.join(" ")),
            detail: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
        });
    }
    Ok(())
}

#[async_trait]
impl HostControl for SystemdHost {
    async fn shutdown(&self, message: &str, when: ShutdownWhen) -> DeviceResult<()> {
        tracing::info!(when = %when.arg(), message, "host shutdown");
        run(&self.shutdown_bin, &[&when.arg(), message]).await
    }

    async fn stop_boot_service(&self) -> DeviceResult<()> {
        run(&self.systemctl_bin, &["stop", &self.boot_service]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_renders_shutdown_arguments() {
        assert_eq!(ShutdownWhen::Now.arg(), "now");
        assert_eq!(ShutdownWhen::DeferMins(60).arg(), "+60");
        assert_eq!(ShutdownWhen::At(TimeOfDay::hm(9, 30)).arg(), "09:30");
        assert_eq!(ShutdownWhen::Cancel.arg(), "-c");
    }
}
