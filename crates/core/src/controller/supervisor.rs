//! The supervisory loop. Boots the node, takes over watchdog duties, makes
//! the stay-up decision, runs the per-minute keepalive tick and hands the
//! host off to shutdown with the wake timer armed.
//!
//! The loop must outlive every fault except a termination signal: a device
//! call that errors degrades to a sentinel and the tick goes on, because a
//! missed watchdog kick means an uncontrolled hard reset.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use birdbox_telemetry::TelemetrySink;

use crate::config::BirdboxCfg;
use crate::device::{BatteryGauge, HostControl, ShutdownWhen, StatusFlags, WatchdogDevice};
use crate::schedule::{self, Clock, Decision, TimeOfDay};

use super::flags::OverrideFlags;
use super::shutdown::ShutdownGuard;
use super::state::ControllerState;

pub struct Supervisor {
    cfg: Arc<BirdboxCfg>,
    clock: Arc<dyn Clock>,
    board: Arc<dyn WatchdogDevice>,
    gauge: Arc<dyn BatteryGauge>,
    host: Arc<dyn HostControl>,
    telemetry: Option<TelemetrySink>,
    flags: OverrideFlags,
    guard: ShutdownGuard,
    state: ControllerState,
    /// The decision in force; the wake target is re-read at shutdown time.
    decision: Option<Decision>,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: Arc<BirdboxCfg>,
        clock: Arc<dyn Clock>,
        board: Arc<dyn WatchdogDevice>,
        gauge: Arc<dyn BatteryGauge>,
        host: Arc<dyn HostControl>,
        telemetry: Option<TelemetrySink>,
        flags: OverrideFlags,
        guard: ShutdownGuard,
    ) -> Self {
        Self {
            cfg,
            clock,
            board,
            gauge,
            host,
            telemetry,
            flags,
            guard,
            state: ControllerState::Booting,
            decision: None,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.guard.token()
    }

    /// Run until the OS powers off or a termination signal arrives. Every
    /// exit route disarms the watchdog so that stopping the controller for
    /// maintenance cannot trigger a reset.
    pub async fn run(&mut self) {
        self.guard.spawn_signal_listener();
        let token = self.guard.token();

        self.boot().await;
        self.evaluate().await;

        // The tick must stay well inside the armed watchdog timeout;
        // config validation enforces the 2x margin.
        let tick = Duration::from_secs(self.cfg.tick_secs);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!(state = %self.state, "termination signal, leaving supervisory loop");
                    break;
                }
                _ = tokio::time::sleep(tick) => self.tick().await,
            }
        }

        // A still-armed watchdog would reset the node the operator just
        // stopped on purpose.
        if let Err(e) = self.board.arm_watchdog(0).await {
            tracing::warn!(error = %e, "failed to disarm watchdog on exit");
        }
        if let Err(e) = self.board.set_led(false).await {
            tracing::debug!(error = %e, "failed to clear LED on exit");
        }
        tracing::info!("supervisor stopped");
    }

    /// Booting → Evaluating: take over watchdog duties from the boot
    /// sequence and start from a clean status register.
    async fn boot(&mut self) {
        tracing::info!("taking over watchdog duties");
        if let Err(e) = self.host.stop_boot_service().await {
            tracing::warn!(error = %e, "could not stop boot keepalive unit");
        }
        if let Err(e) = self
            .host
            .shutdown("cancelling backstop shutdown", ShutdownWhen::Cancel)
            .await
        {
            // Nothing pending is the common case; the cancel is best-effort.
            tracing::debug!(error = %e, "backstop cancel failed");
        }

        // Latched flags from the previous cycle are captured before the
        // clear so they cannot leak into this cycle's early-exit checks.
        match self.board.status().await {
            Ok(flags) => {
                tracing::info!(
                    button_rebooted = flags.button_rebooted,
                    timer_rebooted = flags.timer_rebooted,
                    "previous cycle status"
                );
                let cause = if flags.button_rebooted {
                    "button"
                } else if flags.timer_rebooted {
                    "wake-timer"
                } else {
                    "power"
                };
                self.publish("last_boot", cause.to_owned(), true).await;
            }
            Err(e) => tracing::warn!(error = %e, "could not read initial board status"),
        }
        if let Err(e) = self.board.reset_status().await {
            tracing::warn!(error = %e, "could not clear board status");
        }
        if let Err(e) = self.board.set_led(false).await {
            tracing::debug!(error = %e, "could not clear LED");
        }
        if let Err(e) = self.board.arm_watchdog(self.cfg.watchdog_secs).await {
            tracing::error!(error = %e, "could not arm watchdog, continuing unprotected");
        }
        self.state = ControllerState::Evaluating;
    }

    /// Evaluating → StayingUp | ShuttingDown.
    async fn evaluate(&mut self) {
        let now = self.clock.now();
        let level = self.gauge.read_level(self.cfg.battery_samples).await;
        let decision = schedule::evaluate(&self.cfg.policy, now, level);
        tracing::info!(
            now = %now,
            level = ?level,
            stay_up = decision.stay_up_mins,
            wake = %decision.wake_at,
            reason = %decision.reason,
            "decision"
        );

        self.publish_level(level).await;
        self.publish("wake_at", decision.wake_at.to_string(), true).await;
        self.publish("reason", decision.reason.clone(), true).await;
        if let Some(sink) = &self.telemetry {
            sink.publish_json("decision", &decision).await;
        }

        let stay = decision.stay_up_mins;
        let reason = decision.reason.clone();
        self.decision = Some(decision);

        if stay == 0 {
            self.begin_shutdown(reason, now).await;
        } else {
            // Arm the wake timer up front as well: if the stay-up dies hard
            // mid-cycle the board still knows when to come back.
            self.arm_wake_for(now).await;
            self.state = ControllerState::StayingUp { remaining: stay };
        }
    }

    async fn tick(&mut self) {
        match self.state.clone() {
            ControllerState::StayingUp { remaining } => self.staying_tick(remaining).await,
            // Keep acknowledging the watchdog while the OS shutdown runs,
            // or it fires and turns a graceful power-off into a hard reset.
            ControllerState::Idling => {
                self.kick().await;
            }
            // Booting and Evaluating complete before the loop starts;
            // ShuttingDown transitions to Idling within begin_shutdown.
            _ => {}
        }
    }

    /// One keepalive minute while powered.
    async fn staying_tick(&mut self, remaining: u32) {
        let flags = self.kick().await;
        let mut remaining = remaining.saturating_sub(1);
        let mut early_exit: Option<String> = None;

        if flags.button_pressed {
            tracing::info!("button press detected");
            early_exit = Some("button pressed, immediate shutdown".to_owned());
        } else if self.flags.shutdown_requested() {
            tracing::info!(marker = %self.flags.shutdown_marker().display(), "operator shutdown marker present");
            early_exit = Some("operator-requested shutdown".to_owned());
        } else if remaining == 0 && self.flags.force_up() {
            // Remote hold: never let the counter cross zero while set.
            tracing::info!("force-up flag set, holding");
            remaining = 1;
        }

        let level = self.gauge.read_level(self.cfg.battery_samples).await;
        self.publish_level(level).await;
        self.publish("state", format!("staying up, {remaining}m left"), false)
            .await;

        if let Some(reason) = early_exit {
            let now = self.clock.now();
            self.begin_shutdown(reason, now).await;
        } else if remaining == 0 {
            let reason = self
                .decision
                .as_ref()
                .map(|d| d.reason.clone())
                .unwrap_or_else(|| "scheduled shutdown".to_owned());
            let now = self.clock.now();
            self.begin_shutdown(reason, now).await;
        } else {
            self.state = ControllerState::StayingUp { remaining };
        }
    }

    /// → ShuttingDown → Idling: arm the wake timer and hand off to the OS.
    async fn begin_shutdown(&mut self, reason: String, now: TimeOfDay) {
        self.state = ControllerState::ShuttingDown {
            reason: reason.clone(),
        };
        tracing::info!(%reason, "beginning shutdown");

        // The operator may have disarmed the watchdog mid-cycle; the
        // handoff still has to be covered.
        if let Err(e) = self.board.arm_watchdog(self.cfg.watchdog_secs).await {
            tracing::warn!(error = %e, "could not re-arm watchdog for shutdown");
        }
        if let Err(e) = self.board.set_led(true).await {
            tracing::debug!(error = %e, "could not light LED");
        }

        // The wake delay is recomputed here, not reused from evaluation:
        // the minutes spent staying up have to come off it.
        self.arm_wake_for(now).await;

        self.publish("shutdown_reason", reason.clone(), true).await;
        self.publish("shutdown_at", chrono::Local::now().to_rfc3339(), true)
            .await;
        if let Some(decision) = &self.decision {
            self.publish("wake_at", decision.wake_at.to_string(), true)
                .await;
        }

        let when = if self.flags.defer_requested() {
            tracing::info!(mins = self.cfg.defer_mins, "defer marker present, delaying shutdown");
            ShutdownWhen::DeferMins(self.cfg.defer_mins)
        } else {
            ShutdownWhen::Now
        };
        if let Err(e) = self.host.shutdown(&reason, when).await {
            tracing::warn!(error = %e, "shutdown command failed");
        }

        self.state = ControllerState::Idling;
        tracing::info!("awaiting power-off, keeping watchdog alive");
    }

    /// Arm the wake timer for `wake_at − now`. The board takes a delay in
    /// seconds from now, never an absolute time.
    async fn arm_wake_for(&mut self, now: TimeOfDay) {
        let Some(decision) = &self.decision else {
            return;
        };
        let delay_mins = decision.wake_at.delay_from(now);
        if let Err(e) = self.board.arm_wake(delay_mins * 60).await {
            tracing::warn!(error = %e, "could not arm wake timer");
        } else {
            tracing::info!(mins = delay_mins, wake = %decision.wake_at, "wake timer armed");
        }
    }

    /// Read the board status; the read acknowledges the watchdog. A
    /// transport fault degrades to "no flags" — the loop never dies here.
    async fn kick(&mut self) -> StatusFlags {
        match self.board.status().await {
            Ok(flags) => flags,
            Err(e) => {
                tracing::warn!(error = %e, "board status read failed");
                StatusFlags::default()
            }
        }
    }

    async fn publish(&self, field: &str, value: String, retained: bool) {
        if let Some(sink) = &self.telemetry {
            sink.publish(field, value, retained).await;
        }
    }

    async fn publish_level(&self, level: Option<u8>) {
        let value = match level {
            Some(v) => v.to_string(),
            None => "unavailable".to_owned(),
        };
        self.publish("battery", value, false).await;
    }
}
