use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use birdbox_core::config::{BirdboxCfg, GaugeCfg};
use birdbox_core::controller::{OverrideFlags, ShutdownGuard, Supervisor};
use birdbox_core::device::{
    BatteryGauge, GpioBatteryGauge, I2cBatteryGauge, PiWatcherCli, SystemdHost,
};
use birdbox_core::schedule::{table, WallClock};
use birdbox_telemetry::TelemetrySink;

#[derive(Parser)]
#[command(name = "birdboxd", about = "Power controller for a solar-powered camera node")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "/etc/birdbox/birdbox.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the supervisory loop (the default).
    Run,
    /// Print the decision table for the configured policy and exit.
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = BirdboxCfg::load(&cli.config).context("loading config")?;

    if let Some(Command::Schedule) = cli.command {
        print!("{}", table::render(&cfg.policy));
        return Ok(());
    }

    let cfg = Arc::new(cfg);
    let board = Arc::new(PiWatcherCli::new(&cfg.board.tool));
    let gauge: Arc<dyn BatteryGauge> = match &cfg.gauge {
        GaugeCfg::Gpio { pins } => {
            Arc::new(GpioBatteryGauge::open(pins).context("opening charge pins")?)
        }
        GaugeCfg::I2c { addr, register } => {
            Arc::new(I2cBatteryGauge::open(*addr, *register).context("opening fuel gauge")?)
        }
    };
    let host = Arc::new(SystemdHost::new(
        &cfg.host.shutdown_bin,
        &cfg.host.systemctl_bin,
        &cfg.host.boot_service,
    ));
    let flags = OverrideFlags::new(&cfg.markers.shutdown, &cfg.markers.defer);

    let guard = ShutdownGuard::new();
    let telemetry = cfg
        .mqtt
        .as_ref()
        .map(|mqtt| TelemetrySink::connect(mqtt, flags.force_up_flag(), guard.token()));

    let mut supervisor = Supervisor::new(
        Arc::clone(&cfg),
        Arc::new(WallClock),
        board,
        gauge,
        host,
        telemetry,
        flags,
        guard,
    );
    supervisor.run().await;
    Ok(())
}
