use crate::source::FileSource;
use crate::stdout::{render, OutputFormat};
use async_trait::async_trait;
use ringbridge_core::{
    Broker, BrokerError, BridgeConfig, DeviceSource, DeviceStateBridge, QoS, SourceError,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Default)]
struct RecordingBroker {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingBroker {
    fn payloads_on(&self, topic: &str) -> Vec<String> {
        self.published
            .lock()
            .expect("published lock")
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn publish(&self, topic: &str, payload: String, _qos: QoS) -> Result<(), BrokerError> {
        self.published
            .lock()
            .expect("published lock")
            .push((topic.to_string(), payload));
        Ok(())
    }
}

fn make_temp_dir(name: &str) -> PathBuf {
    let mut path = env::temp_dir();
    let uniq = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("unix epoch")
        .as_nanos();
    path.push(format!("ringbridge-tests-{name}-{uniq}"));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

const DEVICE: &str = r#"{"locationId":"loc-1","zid":"zid-9","batteryLevel":80}"#;

#[test]
fn refresh_notifies_only_on_content_change() {
    // Arrange
    let dir = make_temp_dir("refresh");
    let file = dir.join("device.json");
    fs::write(&file, DEVICE).expect("write snapshot");
    let source = FileSource::load(&file).expect("load");
    let mut changes = source.subscribe().expect("subscribe");
    changes.try_recv().expect("seed notification");

    // Act
    let unchanged = source.refresh().expect("refresh unchanged");
    fs::write(&file, r#"{"locationId":"loc-1","zid":"zid-9","batteryLevel":99}"#)
        .expect("rewrite snapshot");
    let changed = source.refresh().expect("refresh changed");

    // Assert
    assert!(!unchanged);
    assert!(changed);
    assert_eq!(source.snapshot().battery_level, Some(99));
    assert!(changes.try_recv().is_ok(), "one notification for the change");
    assert!(changes.try_recv().is_err(), "no notification for the unchanged read");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn subscribe_replays_current_snapshot() {
    // Arrange
    let dir = make_temp_dir("seed");
    let file = dir.join("device.json");
    fs::write(&file, DEVICE).expect("write snapshot");
    let source = FileSource::load(&file).expect("load");

    // Act
    let mut first = source.subscribe().expect("subscribe");
    let mut second = source.subscribe().expect("subscribe again");

    // Assert
    assert!(first.try_recv().is_ok(), "new listener sees the current value");
    assert!(first.try_recv().is_err(), "exactly one seed notification");
    assert!(second.try_recv().is_ok());

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn attached_bridge_publishes_attributes_for_static_snapshot() {
    // Arrange
    let dir = make_temp_dir("static");
    let file = dir.join("device.json");
    fs::write(&file, DEVICE).expect("write snapshot");
    let source = Arc::new(FileSource::load(&file).expect("load"));
    let broker = Arc::new(RecordingBroker::default());
    let config = BridgeConfig {
        online_settle_delay: Duration::ZERO,
        ..BridgeConfig::default()
    };
    let mut bridge = DeviceStateBridge::new(Arc::clone(&source), config);
    let attributes = bridge.topics().attributes.clone();

    // Act
    bridge.attach_and_publish(&broker).await;
    for _ in 0..5 {
        source.refresh().expect("refresh");
    }
    let mut published = Vec::new();
    for _ in 0..200 {
        published = broker.payloads_on(&attributes);
        if !published.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Assert
    assert_eq!(published, vec![r#"{"battery_level":80}"#.to_string()]);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn dropped_listener_does_not_break_refresh() {
    // Arrange
    let dir = make_temp_dir("dropped");
    let file = dir.join("device.json");
    fs::write(&file, DEVICE).expect("write snapshot");
    let source = FileSource::load(&file).expect("load");
    drop(source.subscribe().expect("subscribe"));

    // Act
    fs::write(&file, r#"{"locationId":"loc-1","zid":"zid-9","batteryStatus":"full"}"#)
        .expect("rewrite snapshot");
    let changed = source.refresh().expect("refresh");

    // Assert
    assert!(changed);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_file_is_device_not_found() {
    let dir = make_temp_dir("missing");

    let err = FileSource::load(dir.join("absent.json")).err().expect("load should fail");

    assert!(matches!(err, SourceError::DeviceNotFound));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn malformed_file_is_invalid() {
    let dir = make_temp_dir("malformed");
    let file = dir.join("device.json");
    fs::write(&file, "{\"zid\":").expect("write snapshot");

    let err = FileSource::load(&file).err().expect("load should fail");

    assert!(matches!(err, SourceError::Invalid(_)));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn json_render_carries_topic_payload_and_tier() {
    let line = render(OutputFormat::Json, "ring/loc/alarm", "online", QoS::AtLeastOnce);

    let value: serde_json::Value = serde_json::from_str(&line).expect("json line");

    assert_eq!(value["topic"], "ring/loc/alarm");
    assert_eq!(value["payload"], "online");
    assert_eq!(value["qos"], "AtLeastOnce");
}
