use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Broker connection settings. Topics are namespaced per device:
/// `<fleet>/<device_id>/<field>`.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttCfg {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Fleet namespace — the first topic segment.
    pub fleet: String,
    pub device_id: String,
}

fn default_port() -> u16 {
    1883
}

/// Fire-and-forget publisher. Retained fields carry the node's last known
/// decision across its long powered-off stretches; live fields are only
/// meaningful while it is up.
pub struct TelemetrySink {
    client: AsyncClient,
    root: String,
}

impl TelemetrySink {
    /// Connect and spawn the background event loop. Inbound publishes on
    /// `<root>/force_up` flip `force_up`; the controller polls that flag.
    pub fn connect(cfg: &MqttCfg, force_up: Arc<AtomicBool>, token: CancellationToken) -> Self {
        let client_id = format!("{}-{}", cfg.fleet, cfg.device_id);
        let mut opts = MqttOptions::new(client_id, &cfg.host, cfg.port);
        opts.set_keep_alive(Duration::from_secs(30));

        let (client, eventloop) = AsyncClient::new(opts, 16);
        let root = format!("{}/{}", cfg.fleet, cfg.device_id);
        let command_topic = format!("{root}/force_up");
        tokio::spawn(drive(eventloop, client.clone(), command_topic, force_up, token));

        Self { client, root }
    }

    /// Publish one status field. Failures are logged and dropped.
    pub async fn publish(&self, field: &str, value: String, retained: bool) {
        let topic = format!("{}/{field}", self.root);
        if let Err(e) = self
            .client
            .publish(topic, QoS::AtLeastOnce, retained, value)
            .await
        {
            tracing::debug!(error = %e, field, "telemetry publish dropped");
        }
    }

    /// Retained JSON snapshot of a whole status document.
    pub async fn publish_json(&self, field: &str, value: &impl serde::Serialize) {
        match serde_json::to_string(value) {
            Ok(body) => self.publish(field, body, true).await,
            Err(e) => tracing::debug!(error = %e, field, "status serialization failed"),
        }
    }
}

/// Runs the MQTT session: (re)subscribes on every connack, watches for the
/// force-up command, backs off on connection errors. Never returns an error
/// to the controller.
async fn drive(
    mut eventloop: EventLoop,
    client: AsyncClient,
    command_topic: String,
    force_up: Arc<AtomicBool>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("telemetry connected");
                    if let Err(e) = client.subscribe(command_topic.as_str(), QoS::AtLeastOnce).await {
                        tracing::debug!(error = %e, "command subscribe failed");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(p))) if p.topic == command_topic => {
                    let on = parse_flag(&p.payload);
                    force_up.store(on, Ordering::Relaxed);
                    tracing::info!(on, "remote force-up flag updated");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "mqtt connection error, retrying");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
    tracing::debug!("telemetry event loop stopped");
}

fn parse_flag(payload: &[u8]) -> bool {
    matches!(payload, b"1" | b"true" | b"on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_payloads() {
        assert!(parse_flag(b"1"));
        assert!(parse_flag(b"true"));
        assert!(parse_flag(b"on"));
        assert!(!parse_flag(b"0"));
        assert!(!parse_flag(b"off"));
        assert!(!parse_flag(b""));
    }

    #[test]
    fn port_defaults_when_omitted() {
        let cfg: MqttCfg = toml::from_str(
            r#"
                host = "broker.local"
                fleet = "birdbox"
                device_id = "bb-03"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.port, 1883);
    }
}
