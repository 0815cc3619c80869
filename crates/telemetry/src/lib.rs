//! One-way MQTT status channel for a birdbox node, plus the single inbound
//! command it honors (`force_up`). Publish failures never propagate: a node
//! out of radio range must keep managing its own power.

mod sink;

pub use sink::{MqttCfg, TelemetrySink};
