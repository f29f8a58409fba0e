use std::fmt;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::driver::{Broker, DeviceSource, QoS};
use crate::snapshot::AttributesPayload;
use crate::topics::Topics;

/// Every bridge publish goes out at this tier.
pub const PUBLISH_QOS: QoS = QoS::AtLeastOnce;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Online,
    Offline,
}

impl Availability {
    pub fn as_str(self) -> &'static str {
        match self {
            Availability::Online => "online",
            Availability::Offline => "offline",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribed,
    /// Registration was attempted and rejected; retried on the next attach.
    Failed(String),
}

/// Keeps one upstream device in sync with the broker.
///
/// Owns the device's availability and its one-time change subscription.
/// Methods take `&mut self` and are driven by a single caller; attribute
/// publishes triggered by upstream changes run on a spawned listener task
/// that only touches the attributes topic.
pub struct DeviceStateBridge<S: DeviceSource> {
    source: Arc<S>,
    config: BridgeConfig,
    topics: Topics,
    availability: Availability,
    subscription: SubscriptionState,
}

impl<S: DeviceSource> DeviceStateBridge<S> {
    pub fn new(source: Arc<S>, config: BridgeConfig) -> Self {
        let topics = Topics::for_snapshot(&config, &source.snapshot());
        Self {
            source,
            config,
            topics,
            availability: Availability::Offline,
            subscription: SubscriptionState::Unsubscribed,
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn subscription(&self) -> &SubscriptionState {
        &self.subscription
    }

    pub async fn publish<B: Broker + ?Sized>(
        &self,
        broker: &B,
        topic: &str,
        payload: String,
        log: bool,
    ) {
        send(broker, topic, payload, log).await;
    }

    /// (Re)activates the bridge against a broker connection.
    ///
    /// The first successful call registers the change listener; later calls
    /// republish the current attributes instead. Availability is driven to
    /// `online` on every call.
    pub async fn attach_and_publish<B: Broker>(&mut self, broker: &Arc<B>) {
        match self.subscription {
            SubscriptionState::Subscribed => self.publish_attributes(broker.as_ref()).await,
            SubscriptionState::Unsubscribed | SubscriptionState::Failed(_) => {
                self.subscribe(broker)
            }
        }

        self.mark_online(broker.as_ref()).await;
    }

    pub async fn publish_attributes<B: Broker + ?Sized>(&self, broker: &B) {
        publish_attributes(self.source.as_ref(), broker, &self.topics.attributes).await;
    }

    /// Returns whether availability changed, which is also when it is logged.
    pub async fn mark_online<B: Broker + ?Sized>(&mut self, broker: &B) -> bool {
        let changed = self.availability != Availability::Online;
        sleep(self.config.online_settle_delay).await;
        self.set_availability(broker, Availability::Online, changed).await;
        changed
    }

    pub async fn mark_offline<B: Broker + ?Sized>(&mut self, broker: &B) -> bool {
        let changed = self.availability != Availability::Offline;
        self.set_availability(broker, Availability::Offline, changed).await;
        changed
    }

    async fn set_availability<B: Broker + ?Sized>(
        &mut self,
        broker: &B,
        state: Availability,
        log: bool,
    ) {
        self.availability = state;
        send(broker, &self.topics.availability, state.as_str().to_string(), log).await;
    }

    fn subscribe<B: Broker>(&mut self, broker: &Arc<B>) {
        let mut changes = match self.source.subscribe() {
            Ok(changes) => changes,
            Err(err) => {
                warn!(device = %self.topics.device, error = %err, "change subscription failed");
                self.subscription = SubscriptionState::Failed(err.to_string());
                return;
            }
        };

        let source = Arc::clone(&self.source);
        let broker = Arc::clone(broker);
        let topic = self.topics.attributes.clone();
        tokio::spawn(async move {
            while changes.recv().await.is_some() {
                publish_attributes(source.as_ref(), broker.as_ref(), &topic).await;
            }
            debug!(%topic, "change stream closed");
        });

        info!(device = %self.topics.device, "subscribed to device changes");
        self.subscription = SubscriptionState::Subscribed;
    }
}

async fn publish_attributes<S, B>(source: &S, broker: &B, topic: &str)
where
    S: DeviceSource + ?Sized,
    B: Broker + ?Sized,
{
    let attributes = AttributesPayload::from_snapshot(&source.snapshot());
    match serde_json::to_string(&attributes) {
        Ok(payload) => send(broker, topic, payload, true).await,
        Err(err) => warn!(%topic, error = %err, "failed to encode attributes"),
    }
}

async fn send<B: Broker + ?Sized>(broker: &B, topic: &str, payload: String, log: bool) {
    if log {
        debug!(%topic, %payload, "publish");
    }
    if let Err(err) = broker.publish(topic, payload, PUBLISH_QOS).await {
        warn!(%topic, error = %err, "publish failed");
    }
}
