use std::time::Duration;

use async_trait::async_trait;
use ringbridge_core::{Broker, BrokerError, QoS};
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
}

pub struct MqttBroker {
    client: AsyncClient,
}

/// Drives the rumqttc event loop; yields once per broker `ConnAck`.
pub struct MqttSession {
    pub connected: mpsc::UnboundedReceiver<()>,
    event_loop: JoinHandle<()>,
}

impl MqttBroker {
    pub fn connect(settings: &MqttSettings) -> (Self, MqttSession) {
        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(settings.keep_alive);
        if let Some(username) = &settings.username {
            options.set_credentials(username, settings.password.clone().unwrap_or_default());
        }

        let (client, mut event_loop) = AsyncClient::new(options, 64);
        let (connected_tx, connected) = mpsc::unbounded_channel();

        let event_loop = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!(code = ?ack.code, "connected to broker");
                        if connected_tx.send(()).is_err() {
                            break;
                        }
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "broker connection error");
                        sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        (Self { client }, MqttSession { connected, event_loop })
    }

    pub async fn disconnect(&self) -> Result<(), BrokerError> {
        self.client
            .disconnect()
            .await
            .map_err(|_| BrokerError::Disconnected)
    }
}

impl MqttSession {
    /// Waits briefly for queued publishes to flush after a disconnect.
    pub async fn finish(self) {
        if timeout(SHUTDOWN_GRACE, self.event_loop).await.is_err() {
            warn!("broker event loop did not stop in time");
        }
    }
}

fn to_mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

#[async_trait]
impl Broker for MqttBroker {
    async fn publish(&self, topic: &str, payload: String, qos: QoS) -> Result<(), BrokerError> {
        self.client
            .publish(topic, to_mqtt_qos(qos), false, payload)
            .await
            .map_err(|err| BrokerError::Publish {
                topic: topic.to_string(),
                reason: err.to_string(),
            })
    }
}
