mod battery;
mod host;
mod piwatcher;
mod watchdog;

pub use battery::{BatteryGauge, GpioBatteryGauge, I2cBatteryGauge};
pub use host::{HostControl, ShutdownWhen, SystemdHost};
pub use piwatcher::PiWatcherCli;
pub use watchdog::{
    StatusFlags, WatchdogDevice, WAKE_MAX_SECS, WAKE_MIN_SECS, WATCHDOG_MAX_SECS,
};

/// Transport-level failure talking to a peripheral or host tool. Always
/// recoverable: callers degrade to a sentinel value and keep the loop
/// running — the armed hardware watchdog is the backstop, not a panic.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("`{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },
    #[error("bus error: {0}")]
    Bus(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;
