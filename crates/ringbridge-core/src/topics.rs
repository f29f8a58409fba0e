use serde::Serialize;

use crate::config::BridgeConfig;
use crate::snapshot::DeviceSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topics {
    pub alarm: String,
    pub device: String,
    pub availability: String,
    pub attributes: String,
}

impl Topics {
    pub fn new(config: &BridgeConfig, location_id: &str, device_id: &str) -> Self {
        let alarm = format!("{}/{}/alarm", config.ring_topic, location_id);
        let device = format!("{}/{}/{}", alarm, config.component, device_id);

        Self {
            availability: format!("{}/{}", device, config.availability_suffix),
            attributes: format!("{}/{}", device, config.attributes_suffix),
            alarm,
            device,
        }
    }

    pub fn for_snapshot(config: &BridgeConfig, snapshot: &DeviceSnapshot) -> Self {
        Self::new(config, &snapshot.location_id, &snapshot.zid)
    }
}
