use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::SyncError;
use crate::message::event::ResourceUpdateEvent;
use crate::message::transport::{MemoryTransport, TcpTransport, Transport};
use shared::message::{BusMessage, EventType, HandshakePayload, PROTOCOL_VERSION, PushPayload};

/// Event Client
///
/// One process-wide connection to the push broker, shared by all sync
/// sessions. Sessions own only their subscriptions on it; received pushes
/// are normalized at this boundary and fanned out on a broadcast channel.
#[derive(Debug, Clone)]
pub struct EventClient {
    transport: ClientTransport,
    event_tx: broadcast::Sender<ResourceUpdateEvent>,
    connected: Arc<AtomicBool>,
    malformed_events: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
enum ClientTransport {
    Tcp(TcpTransport),
    Memory(MemoryTransport),
    /// No broker reachable; subscribe calls fail and sessions run pull-only
    Disconnected,
}

impl ClientTransport {
    async fn read_message(&self) -> Result<BusMessage, SyncError> {
        match self {
            ClientTransport::Tcp(t) => t.read_message().await,
            ClientTransport::Memory(t) => t.read_message().await,
            ClientTransport::Disconnected => Err(SyncError::TransportUnavailable(
                "Not connected".to_string(),
            )),
        }
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), SyncError> {
        match self {
            ClientTransport::Tcp(t) => t.write_message(msg).await,
            ClientTransport::Memory(t) => t.write_message(msg).await,
            ClientTransport::Disconnected => Err(SyncError::TransportUnavailable(
                "Not connected".to_string(),
            )),
        }
    }

    async fn close(&self) -> Result<(), SyncError> {
        match self {
            ClientTransport::Tcp(t) => t.close().await,
            ClientTransport::Memory(t) => t.close().await,
            ClientTransport::Disconnected => Ok(()),
        }
    }
}

impl EventClient {
    fn new(transport: ClientTransport) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        let connected = Arc::new(AtomicBool::new(true));
        let malformed_events = Arc::new(AtomicU64::new(0));

        let client = Self {
            transport: transport.clone(),
            event_tx: event_tx.clone(),
            connected: connected.clone(),
            malformed_events: malformed_events.clone(),
        };

        // Spawn background task to normalize and dispatch pushes
        tokio::spawn(async move {
            loop {
                match transport.read_message().await {
                    Ok(msg) => {
                        Self::dispatch(&msg, &event_tx, &malformed_events);
                    }
                    Err(e) => {
                        tracing::error!("Transport read error: {}", e);
                        // 连接断开，会话继续以拉取模式运行
                        connected.store(false, Ordering::Relaxed);
                        break;
                    }
                }
            }
        });

        client
    }

    /// Normalize one inbound frame and broadcast the canonical event.
    ///
    /// Malformed payloads are dropped and counted here, at the transport
    /// boundary; they never reach the store.
    fn dispatch(
        msg: &BusMessage,
        event_tx: &broadcast::Sender<ResourceUpdateEvent>,
        malformed_events: &AtomicU64,
    ) {
        if msg.event_type != EventType::Push {
            tracing::debug!(event_type = %msg.event_type, "Ignoring non-push frame");
            return;
        }

        let push: PushPayload = match msg.parse_payload() {
            Ok(push) => push,
            Err(e) => {
                malformed_events.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Dropping undecodable push frame: {}", e);
                return;
            }
        };

        match ResourceUpdateEvent::normalize(&push.event, &push.data) {
            Ok(Some(event)) => {
                if let Err(e) = event_tx.send(event) {
                    tracing::debug!("No subscribers for event: {}", e);
                }
            }
            Ok(None) => {
                tracing::debug!(event = %push.event, "Ignoring untracked event");
            }
            Err(e) => {
                malformed_events.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(event = %push.event, "Dropping malformed event: {}", e);
            }
        }
    }

    /// Connect via TCP and perform the protocol handshake
    pub async fn connect(addr: &str, client_name: &str) -> Result<Self, SyncError> {
        let transport = TcpTransport::connect(addr).await?;
        let client_transport = ClientTransport::Tcp(transport);

        let payload = HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some(client_name.to_string()),
        };

        client_transport
            .write_message(&BusMessage::handshake(&payload))
            .await?;

        Ok(Self::new(client_transport))
    }

    /// Create in-memory client
    pub fn memory(
        broker_broadcast_tx: &broadcast::Sender<BusMessage>,
        client_to_broker_tx: &broadcast::Sender<BusMessage>,
    ) -> Self {
        let transport = MemoryTransport::new(broker_broadcast_tx, client_to_broker_tx);
        Self::new(ClientTransport::Memory(transport))
    }

    /// Create a client with no broker connection.
    ///
    /// Subscribe calls fail with `TransportUnavailable` and no events are
    /// ever delivered; sessions keep the table current through the fallback
    /// timer alone.
    pub fn disconnected() -> Self {
        let (event_tx, _) = broadcast::channel(1);
        Self {
            transport: ClientTransport::Disconnected,
            event_tx,
            connected: Arc::new(AtomicBool::new(false)),
            malformed_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to normalized resource-update events
    pub fn subscribe_events(&self) -> broadcast::Receiver<ResourceUpdateEvent> {
        self.event_tx.subscribe()
    }

    /// Ask the broker to start delivering events for a topic (fire-and-forget)
    pub async fn subscribe(&self, topic: &str) -> Result<(), SyncError> {
        self.transport
            .write_message(&BusMessage::subscribe(topic))
            .await
    }

    /// Ask the broker to stop delivering events for a topic
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), SyncError> {
        self.transport
            .write_message(&BusMessage::unsubscribe(topic))
            .await
    }

    /// Whether the read loop is still attached to the broker
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Number of push payloads dropped for missing required fields
    pub fn malformed_event_count(&self) -> u64 {
        self.malformed_events.load(Ordering::Relaxed)
    }

    /// Close the client connection
    pub async fn close(&self) -> Result<(), SyncError> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_pair() -> (broadcast::Sender<BusMessage>, EventClient) {
        let (broker_tx, _) = broadcast::channel(64);
        let (client_tx, _) = broadcast::channel(64);
        let client = EventClient::memory(&broker_tx, &client_tx);
        (broker_tx, client)
    }

    #[tokio::test]
    async fn test_push_is_normalized_and_delivered() {
        let (broker_tx, client) = memory_pair();
        let mut rx = client.subscribe_events();

        let push = PushPayload {
            event: "sensor-update".to_string(),
            data: json!({"device_sensor_id": 4, "value": 8.25}),
        };
        broker_tx.send(BusMessage::push(&push)).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ResourceUpdateEvent::SensorUpdate {
                device_sensor_id: 4,
                value: 8.25,
                time: None,
            }
        );
        assert_eq!(client.malformed_event_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_push_is_counted_not_delivered() {
        let (broker_tx, client) = memory_pair();
        let mut rx = client.subscribe_events();

        // Missing device_sensor_id
        let bad = PushPayload {
            event: "sensor-update".to_string(),
            data: json!({"value": 5}),
        };
        broker_tx.send(BusMessage::push(&bad)).unwrap();

        // Follow with a valid event so the receiver has something to yield
        let good = PushPayload {
            event: "device-deleted".to_string(),
            data: json!({"id": 1}),
        };
        broker_tx.send(BusMessage::push(&good)).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event, ResourceUpdateEvent::DeviceDeleted { id: 1 });
        assert_eq!(client.malformed_event_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnected_client_fails_subscribe() {
        let client = EventClient::disconnected();
        assert!(!client.is_connected());
        let err = client.subscribe("devices").await.unwrap_err();
        assert!(matches!(err, SyncError::TransportUnavailable(_)));
    }
}
