//! Daemon configuration: one TOML file, defaults when absent so a freshly
//! imaged node runs with the stock policy.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use birdbox_telemetry::MqttCfg;

use crate::schedule::SchedulePolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BirdboxCfg {
    /// Seconds between supervisor ticks — the watchdog kick cadence.
    pub tick_secs: u64,
    /// Hardware watchdog timeout armed at boot and re-armed for shutdown.
    /// Must be at least twice `tick_secs`.
    pub watchdog_secs: u16,
    /// Read passes over the charge pins per battery sample.
    pub battery_samples: u32,
    /// Minutes the defer marker pushes a shutdown back.
    pub defer_mins: u32,
    pub policy: SchedulePolicy,
    pub board: BoardCfg,
    pub gauge: GaugeCfg,
    pub host: HostCfg,
    pub markers: MarkerCfg,
    /// Telemetry is optional; a node without a broker just runs dark.
    pub mqtt: Option<MqttCfg>,
}

impl Default for BirdboxCfg {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            watchdog_secs: 180,
            battery_samples: 20,
            defer_mins: 60,
            policy: SchedulePolicy::default(),
            board: BoardCfg::default(),
            gauge: GaugeCfg::default(),
            host: HostCfg::default(),
            markers: MarkerCfg::default(),
            mqtt: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardCfg {
    /// The vendor CLI tool that speaks to the watchdog/wake board.
    pub tool: PathBuf,
}

impl Default for BoardCfg {
    fn default() -> Self {
        Self {
            tool: PathBuf::from("/usr/local/bin/piwatcher"),
        }
    }
}

/// Which battery gauge this node carries.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GaugeCfg {
    /// Charge-indicator pins on the solar controller (BCM numbering).
    Gpio { pins: Vec<u8> },
    /// Percent register on an I2C fuel gauge.
    I2c { addr: u16, register: u8 },
}

impl Default for GaugeCfg {
    fn default() -> Self {
        Self::Gpio {
            pins: vec![6, 12, 13, 26],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostCfg {
    pub shutdown_bin: PathBuf,
    pub systemctl_bin: PathBuf,
    /// Boot-time keepalive unit stopped when the supervisor takes over.
    pub boot_service: String,
}

impl Default for HostCfg {
    fn default() -> Self {
        Self {
            shutdown_bin: PathBuf::from("/sbin/shutdown"),
            systemctl_bin: PathBuf::from("/bin/systemctl"),
            boot_service: "piwatcher.service".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkerCfg {
    /// Presence forces an immediate shutdown on the next tick.
    pub shutdown: PathBuf,
    /// Presence turns the next shutdown into a deferred one.
    pub defer: PathBuf,
}

impl Default for MarkerCfg {
    fn default() -> Self {
        Self {
            shutdown: PathBuf::from("/run/birdbox/shutdown"),
            defer: PathBuf::from("/run/birdbox/defer"),
        }
    }
}

impl BirdboxCfg {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;
            toml::from_str(&raw)?
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_secs == 0 {
            return Err(ConfigError::Invalid("tick_secs must be non-zero".into()));
        }
        if (self.watchdog_secs as u64) < 2 * self.tick_secs {
            return Err(ConfigError::Invalid(format!(
                "watchdog_secs ({}) must be at least twice tick_secs ({})",
                self.watchdog_secs, self.tick_secs
            )));
        }
        if self.battery_samples == 0 {
            return Err(ConfigError::Invalid(
                "battery_samples must be non-zero".into(),
            ));
        }
        self.policy
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::TimeOfDay;

    #[test]
    fn defaults_are_valid() {
        assert!(BirdboxCfg::default().validate().is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = BirdboxCfg::load(Path::new("/nonexistent/birdbox.toml")).unwrap();
        assert_eq!(cfg.tick_secs, 60);
        assert!(cfg.mqtt.is_none());
    }

    #[test]
    fn parses_a_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("birdbox.toml");
        std::fs::write(
            &path,
            r#"
                watchdog_secs = 240

                [policy]
                morning_wake = "09:00"

                [gauge]
                kind = "i2c"
                addr = 0x64
                register = 4

                [mqtt]
                host = "broker.local"
                fleet = "birdbox"
                device_id = "bb-07"
            "#,
        )
        .unwrap();
        let cfg = BirdboxCfg::load(&path).unwrap();
        assert_eq!(cfg.watchdog_secs, 240);
        assert_eq!(cfg.policy.morning_wake, TimeOfDay::hm(9, 0));
        assert!(matches!(
            cfg.gauge,
            GaugeCfg::I2c {
                addr: 0x64,
                register: 4
            }
        ));
        assert_eq!(cfg.mqtt.unwrap().host, "broker.local");
    }

    #[test]
    fn kick_margin_is_enforced() {
        let cfg = BirdboxCfg {
            tick_secs: 120,
            watchdog_secs: 180,
            ..BirdboxCfg::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }
}
