use async_trait::async_trait;
use chrono::Utc;
use clap::ValueEnum;
use ringbridge_core::{Broker, BrokerError, QoS};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Dry-run broker: prints every publish instead of sending it.
pub struct StdoutBroker {
    format: OutputFormat,
}

impl StdoutBroker {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

pub(crate) fn render(format: OutputFormat, topic: &str, payload: &str, qos: QoS) -> String {
    match format {
        OutputFormat::Human => format!("{:<48} {}", topic, payload),
        OutputFormat::Json => serde_json::json!({
            "ts": Utc::now().to_rfc3339(),
            "topic": topic,
            "payload": payload,
            "qos": qos,
        })
        .to_string(),
    }
}

#[async_trait]
impl Broker for StdoutBroker {
    async fn publish(&self, topic: &str, payload: String, qos: QoS) -> Result<(), BrokerError> {
        println!("{}", render(self.format, topic, &payload, qos));
        Ok(())
    }
}
