use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::SyncError;
use shared::message::{BusMessage, EventType};

/// Transport abstraction for push channel communication
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_message(&self) -> Result<BusMessage, SyncError>;
    async fn write_message(&self, msg: &BusMessage) -> Result<(), SyncError>;
    async fn close(&self) -> Result<(), SyncError>;
}

/// TCP Transport Implementation
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self, SyncError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| SyncError::TransportUnavailable(e.to_string()))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_message(&self) -> Result<BusMessage, SyncError> {
        let mut reader = self.reader.lock().await;

        // Read event type (1 byte)
        let mut type_buf = [0u8; 1];
        reader
            .read_exact(&mut type_buf)
            .await
            .map_err(SyncError::Io)?;

        let event_type = EventType::try_from(type_buf[0])
            .map_err(|_| SyncError::InvalidMessage("Invalid event type".into()))?;

        // Read Request ID (16 bytes)
        let mut uuid_buf = [0u8; 16];
        reader
            .read_exact(&mut uuid_buf)
            .await
            .map_err(SyncError::Io)?;
        let request_id = Uuid::from_bytes(uuid_buf);

        // Read payload length (4 bytes)
        let mut len_buf = [0u8; 4];
        reader
            .read_exact(&mut len_buf)
            .await
            .map_err(SyncError::Io)?;

        let len = u32::from_le_bytes(len_buf) as usize;

        // Read payload
        let mut payload = vec![0u8; len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(SyncError::Io)?;

        Ok(BusMessage {
            request_id,
            event_type,
            payload,
        })
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), SyncError> {
        let mut writer = self.writer.lock().await;
        let mut data = Vec::new();
        data.push(msg.event_type as u8);
        data.extend_from_slice(msg.request_id.as_bytes());
        data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&msg.payload);

        writer.write_all(&data).await.map_err(SyncError::Io)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SyncError> {
        // Dropping the Arc references will eventually close the stream
        Ok(())
    }
}

/// Memory Transport Implementation (for In-Process communication)
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    /// Receiver for messages FROM the broker (broadcasts)
    rx: Arc<Mutex<broadcast::Receiver<BusMessage>>>,
    /// Sender for messages TO the broker
    tx: broadcast::Sender<BusMessage>,
}

impl MemoryTransport {
    /// Create a new memory transport
    ///
    /// # Arguments
    /// * `broker_broadcast_tx` - The broker's broadcast sender (to subscribe to pushes)
    /// * `client_to_broker_tx` - The channel to send messages TO the broker
    pub fn new(
        broker_broadcast_tx: &broadcast::Sender<BusMessage>,
        client_to_broker_tx: &broadcast::Sender<BusMessage>,
    ) -> Self {
        Self {
            rx: Arc::new(Mutex::new(broker_broadcast_tx.subscribe())),
            tx: client_to_broker_tx.clone(),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, SyncError> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .map_err(|e| SyncError::TransportUnavailable(format!("Memory channel error: {}", e)))
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), SyncError> {
        self.tx.send(msg.clone()).map_err(|e| {
            SyncError::TransportUnavailable(format!("Failed to send to broker: {}", e))
        })?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SyncError> {
        Ok(())
    }
}
