use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub ring_topic: String,
    pub component: String,
    pub availability_suffix: String,
    pub attributes_suffix: String,
    /// Pause before publishing `online`, lets an in-flight snapshot settle.
    pub online_settle_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ring_topic: "ring".to_string(),
            component: "alarm".to_string(),
            availability_suffix: "status".to_string(),
            attributes_suffix: "attributes".to_string(),
            online_settle_delay: Duration::from_secs(1),
        }
    }
}
