use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Provider-side view of a single alarm device.
///
/// Owned and refreshed by the upstream source; the bridge only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub location_id: String,
    pub zid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_status: Option<BatteryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tamper_status: Option<serde_json::Value>,
    #[serde(flatten)]
    pub vars: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryStatus {
    Full,
    Ok,
    #[serde(rename = "none")]
    NoBattery,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryLevel {
    Percent(i64),
    /// Device has no battery at all, which is not the same as an empty one.
    NoBattery,
}

impl BatteryLevel {
    pub fn percent(self) -> Option<i64> {
        match self {
            BatteryLevel::Percent(value) => Some(value),
            BatteryLevel::NoBattery => None,
        }
    }
}

impl DeviceSnapshot {
    /// Collapses the two battery telemetry shapes into one percentage scale.
    ///
    /// A direct reading wins over the coarse status. Devices reporting 99%
    /// never climb to 100, so 99 is treated as full.
    pub fn battery_level(&self) -> BatteryLevel {
        if let Some(level) = self.battery_level {
            return BatteryLevel::Percent(if level == 99 { 100 } else { level });
        }

        match self.battery_status {
            Some(BatteryStatus::Full) => BatteryLevel::Percent(100),
            Some(BatteryStatus::Ok) => BatteryLevel::Percent(50),
            Some(BatteryStatus::NoBattery) => BatteryLevel::NoBattery,
            Some(BatteryStatus::Other) | None => BatteryLevel::Percent(0),
        }
    }

    /// Tamper flag as reported, if it is set to something truthy.
    pub fn tamper(&self) -> Option<&serde_json::Value> {
        self.tamper_status.as_ref().filter(|value| is_truthy(value))
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributesPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tamper_status: Option<serde_json::Value>,
}

impl AttributesPayload {
    pub fn from_snapshot(snapshot: &DeviceSnapshot) -> Self {
        Self {
            battery_level: snapshot.battery_level().percent(),
            tamper_status: snapshot.tamper().cloned(),
        }
    }
}
