use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::snapshot::DeviceSnapshot;

/// One `()` per upstream snapshot change.
pub type ChangeStream = mpsc::UnboundedReceiver<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("device not found")]
    DeviceNotFound,
    #[error("source closed")]
    Closed,
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker disconnected")]
    Disconnected,
    #[error("publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },
}

/// Provider-side device: a readable snapshot plus change notifications.
pub trait DeviceSource: Send + Sync + 'static {
    fn snapshot(&self) -> DeviceSnapshot;
    /// Sources that replay the current value deliver one notification up front.
    fn subscribe(&self) -> Result<ChangeStream, SourceError>;
}

#[async_trait]
pub trait Broker: Send + Sync + 'static {
    async fn publish(&self, topic: &str, payload: String, qos: QoS) -> Result<(), BrokerError>;
}
