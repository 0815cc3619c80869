//! Interface to the external watchdog/wake board. The board carries two
//! timers: a reset watchdog that must be acknowledged while the node is up,
//! and a wake timer that powers the node back on after shutdown.

use async_trait::async_trait;

use super::DeviceResult;

/// Hardware ceiling on the watchdog timeout register (seconds).
pub const WATCHDOG_MAX_SECS: u16 = 240;
/// Hardware ceiling on the wake timer: 36 hours.
pub const WAKE_MAX_SECS: u32 = 129_600;
/// The board refuses wake delays shorter than this.
pub const WAKE_MIN_SECS: u32 = 120;

/// Latched bits of the board's status register. They persist across a
/// reboot, so the controller captures and clears them at boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    /// The physical button was pressed since the last reset.
    pub button_pressed: bool,
    /// The last reboot was caused by the button.
    pub button_rebooted: bool,
    /// The last reboot was caused by the watchdog firing.
    pub timer_rebooted: bool,
}

/// Combined watchdog / wake-timer / LED board.
///
/// Reading `status` also acknowledges ("kicks") an armed watchdog — the
/// supervisory loop relies on that side effect for its keepalive. All
/// methods report transport faults as values; none may panic or leak a
/// fault into the caller's control flow uncontrolled.
#[async_trait]
pub trait WatchdogDevice: Send + Sync {
    async fn status(&self) -> DeviceResult<StatusFlags>;
    /// Clear the latched status bits.
    async fn reset_status(&self) -> DeviceResult<()>;
    async fn set_led(&self, on: bool) -> DeviceResult<()>;
    /// Arm the reset timeout; 0 disables it. Implementations clamp to the
    /// hardware ceiling.
    async fn arm_watchdog(&self, seconds: u16) -> DeviceResult<()>;
    /// Arm the power-on timer that fires after the next shutdown.
    /// Implementations clamp into the representable range.
    async fn arm_wake(&self, seconds: u32) -> DeviceResult<()>;
}

/// Clamp a requested watchdog timeout to what the register can hold.
/// 0 stays 0 — that is the disarm command.
pub(super) fn clamp_watchdog(seconds: u16) -> u16 {
    seconds.min(WATCHDOG_MAX_SECS)
}

/// Clamp a requested wake delay into the board's representable range.
pub(super) fn clamp_wake(seconds: u32) -> u32 {
    seconds.clamp(WAKE_MIN_SECS, WAKE_MAX_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchdog_clamp_keeps_disarm() {
        assert_eq!(clamp_watchdog(0), 0);
        assert_eq!(clamp_watchdog(180), 180);
        assert_eq!(clamp_watchdog(10_000), WATCHDOG_MAX_SECS);
    }

    #[test]
    fn wake_clamp_is_two_sided() {
        assert_eq!(clamp_wake(30), WAKE_MIN_SECS);
        assert_eq!(clamp_wake(3_600), 3_600);
        assert_eq!(clamp_wake(1_000_000), WAKE_MAX_SECS);
    }
}
