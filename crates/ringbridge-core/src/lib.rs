pub mod bridge;
pub mod config;
pub mod driver;
pub mod snapshot;
pub mod topics;


pub use bridge::{Availability, DeviceStateBridge, SubscriptionState, PUBLISH_QOS};
pub use config::BridgeConfig;
pub use driver::{Broker, BrokerError, ChangeStream, DeviceSource, QoS, SourceError};
pub use snapshot::{AttributesPayload, BatteryLevel, BatteryStatus, DeviceSnapshot};
pub use topics::Topics;
