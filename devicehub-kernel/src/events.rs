/**
 * EVENTS - Notifications du cycle de vie des devices
 *
 * RÔLE :
 * Chaque changement notable (enregistrement, session, update mis en file,
 * updates livrés) est publié vers un `EventSink`. Le kernel publie sur MQTT
 * quand un broker est configuré, sinon les événements sont ignorés.
 *
 * TOPICS :
 * `<prefix>/devices/<mac>/<event>@v1`, ex: `devicehub/devices/01-23-45-67-89-ab/update_queued@v1`
 *
 * La publication ne bloque jamais une requête : `try_publish`, et un échec
 * est seulement loggé.
 */

use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

use crate::config::MqttConf;
use crate::health::HealthTracker;
use crate::mac::MacAddress;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HubEvent {
    DeviceRegistered { mac: MacAddress, project_id: String, created: bool },
    DeviceDeregistered { mac: MacAddress, project_id: String },
    DeviceExpired { mac: MacAddress, project_id: String },
    SessionStarted { mac: MacAddress, user: String },
    SessionEnded { mac: MacAddress, user: String },
    SessionRevoked { mac: MacAddress, user: String, by: String },
    UpdateQueued { mac: MacAddress, seq: u64, user: String },
    UpdatesDelivered { mac: MacAddress, count: usize, last_seq: u64 },
}

impl HubEvent {
    pub fn mac(&self) -> MacAddress {
        match self {
            HubEvent::DeviceRegistered { mac, .. }
            | HubEvent::DeviceDeregistered { mac, .. }
            | HubEvent::DeviceExpired { mac, .. }
            | HubEvent::SessionStarted { mac, .. }
            | HubEvent::SessionEnded { mac, .. }
            | HubEvent::SessionRevoked { mac, .. }
            | HubEvent::UpdateQueued { mac, .. }
            | HubEvent::UpdatesDelivered { mac, .. } => *mac,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HubEvent::DeviceRegistered { .. } => "device_registered",
            HubEvent::DeviceDeregistered { .. } => "device_deregistered",
            HubEvent::DeviceExpired { .. } => "device_expired",
            HubEvent::SessionStarted { .. } => "session_started",
            HubEvent::SessionEnded { .. } => "session_ended",
            HubEvent::SessionRevoked { .. } => "session_revoked",
            HubEvent::UpdateQueued { .. } => "update_queued",
            HubEvent::UpdatesDelivered { .. } => "updates_delivered",
        }
    }

    pub fn topic(&self, prefix: &str) -> String {
        format!("{prefix}/devices/{}/{}@v1", self.mac(), self.name())
    }
}

pub trait EventSink: Send + Sync {
    fn publish(&self, event: &HubEvent);
}

pub type SharedEvents = Arc<dyn EventSink>;

/// Aucun bus configuré
pub struct NullEvents;

impl EventSink for NullEvents {
    fn publish(&self, event: &HubEvent) {
        tracing::debug!(event = event.name(), mac = %event.mac(), "[events] no bus, dropped");
    }
}

/// Garde les événements en mémoire (tests)
#[derive(Default)]
pub struct MemoryEvents {
    events: Mutex<Vec<HubEvent>>,
}

impl MemoryEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<HubEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<HubEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for MemoryEvents {
    fn publish(&self, event: &HubEvent) {
        self.events.lock().push(event.clone());
    }
}

pub struct MqttEvents {
    client: AsyncClient,
    prefix: String,
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(with = "time::serde::rfc3339")]
    ts: OffsetDateTime,
    #[serde(flatten)]
    event: &'a HubEvent,
}

impl EventSink for MqttEvents {
    fn publish(&self, event: &HubEvent) {
        let envelope = Envelope { ts: OffsetDateTime::now_utc(), event };
        let payload = match serde_json::to_vec(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("[events] cannot encode {}: {e}", event.name());
                return;
            }
        };
        let topic = event.topic(&self.prefix);
        if let Err(e) = self.client.try_publish(&topic, QoS::AtLeastOnce, false, payload) {
            tracing::warn!("[events] publish on {topic} failed: {e:?}");
        }
    }
}

/// Crée le client MQTT et lance la boucle d'événements en tâche de fond.
/// Doit être appelé depuis un runtime tokio.
pub fn spawn_mqtt_events(conf: &MqttConf, health: HealthTracker) -> MqttEvents {
    let mut opts = MqttOptions::new("devicehub-kernel", &conf.host, conf.port);
    opts.set_keep_alive(Duration::from_secs(15));
    let (client, mut eventloop) = AsyncClient::new(opts, 64);

    health.mark_bus_connecting();
    tracing::info!("[events] publishing to mqtt://{}:{} under '{}'", conf.host, conf.port, conf.topic_prefix);

    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    tracing::info!("[events] mqtt connected");
                    health.mark_bus_connected();
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("[events] mqtt error: {e:?}");
                    health.increment_reconnects();
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });

    MqttEvents { client, prefix: conf.topic_prefix.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mac() -> MacAddress {
        MacAddress::parse("01-23-45-67-89-ab").unwrap()
    }

    #[test]
    fn test_topic_layout() {
        let event = HubEvent::UpdateQueued { mac: mac(), seq: 7, user: "a@x.io".into() };
        assert_eq!(event.topic("devicehub"), "devicehub/devices/01-23-45-67-89-ab/update_queued@v1");
    }

    #[test]
    fn test_payload_is_tagged() {
        let event = HubEvent::SessionStarted { mac: mac(), user: "a@x.io".into() };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "session_started", "mac": "01-23-45-67-89-ab", "user": "a@x.io"})
        );
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemoryEvents::new();
        sink.publish(&HubEvent::DeviceExpired { mac: mac(), project_id: "p".into() });
        assert_eq!(sink.snapshot().len(), 1);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.snapshot().is_empty());
    }
}
