//! Battery charge acquisition. Two gauge flavors exist in the field: the
//! solar controller's charge-indicator pins sampled over GPIO, and a fuel
//! gauge exposing a percent register on the I2C bus. Both hand back the
//! same ordinal 0–100 "bars" scale; only threshold comparisons are ever
//! made against it.

use std::sync::Mutex;

use async_trait::async_trait;
use rppal::gpio::{Gpio, InputPin};
use rppal::i2c::I2c;

use super::{DeviceError, DeviceResult};

/// Ordinal charge reading. `None` means the gauge could not be read; the
/// decision layer treats that as worst-case rather than failing.
#[async_trait]
pub trait BatteryGauge: Send + Sync {
    async fn read_level(&self, samples: u32) -> Option<u8>;
}

/// Charge-indicator pins on the solar controller. Active-low: a lit charge
/// bar pulls its pin down. One read pass samples every pin once; repeated
/// passes smooth out bars that blink near a threshold.
pub struct GpioBatteryGauge {
    pins: Vec<InputPin>,
}

impl GpioBatteryGauge {
    pub fn open(bcm_pins: &[u8]) -> DeviceResult<Self> {
        let gpio = Gpio::new().map_err(|e| DeviceError::Bus(e.to_string()))?;
        let mut pins = Vec::with_capacity(bcm_pins.len());
        for &n in bcm_pins {
            let pin = gpio
                .get(n)
                .map_err(|e| DeviceError::Bus(format!("pin {n}: {e}")))?
                .into_input_pullup();
            pins.push(pin);
        }
        Ok(Self { pins })
    }
}

#[async_trait]
impl BatteryGauge for GpioBatteryGauge {
    async fn read_level(&self, samples: u32) -> Option<u8> {
        if self.pins.is_empty() || samples == 0 {
            return None;
        }
        let mut lit: u32 = 0;
        for _ in 0..samples {
            for pin in &self.pins {
                if pin.is_low() {
                    lit += 1;
                }
            }
        }
        let span = self.pins.len() as u32 * samples;
        Some(((lit * 100) / span) as u8)
    }
}

/// Single percent register on an I2C fuel gauge.
pub struct I2cBatteryGauge {
    // rppal's I2c reads take &mut; access is serialized in the supervisor
    // but the trait object must still be Sync.
    bus: Mutex<I2c>,
    register: u8,
}

impl I2cBatteryGauge {
    pub fn open(addr: u16, register: u8) -> DeviceResult<Self> {
        let mut bus = I2c::new().map_err(|e| DeviceError::Bus(e.to_string()))?;
        bus.set_slave_address(addr)
            .map_err(|e| DeviceError::Bus(format!("addr {addr:#x}: {e}")))?;
        Ok(Self {
            bus: Mutex::new(bus),
            register,
        })
    }
}

#[async_trait]
impl BatteryGauge for I2cBatteryGauge {
    async fn read_level(&self, _samples: u32) -> Option<u8> {
        let mut bus = match self.bus.lock() {
            Ok(bus) => bus,
            Err(poisoned) => poisoned.into_inner(),
        };
        match bus.smbus_read_byte(self.register) {
            Ok(raw) => Some(raw.min(100)),
            Err(e) => {
                tracing::warn!(error = %e, "fuel gauge register read failed");
                None
            }
        }
    }
}
