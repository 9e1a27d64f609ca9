//! 推送通道消息类型定义
//!
//! 这些类型在推送服务端和 clients 之间共享，用于
//! 进程内（内存）和网络（TCP）通信。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// 推送通道事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 握手消息
    Handshake = 0,
    /// 订阅主题
    Subscribe = 1,
    /// 取消订阅
    Unsubscribe = 2,
    /// 服务端推送事件
    Push = 3,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::Subscribe),
            2 => Ok(EventType::Unsubscribe),
            3 => Ok(EventType::Push),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::Subscribe => write!(f, "subscribe"),
            EventType::Unsubscribe => write!(f, "unsubscribe"),
            EventType::Push => write!(f, "push"),
        }
    }
}

/// 简化的消息结构 - 只包含业务必需字段
///
/// 推送是 fire-and-forget：没有 RPC 关联，也没有投递保证。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid, // 用于消息追踪
    pub event_type: EventType,
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// 创建新消息
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            payload,
        }
    }

    /// 创建握手消息 (客户端 -> 服务端)
    pub fn handshake(payload: &HandshakePayload) -> Self {
        Self::new(
            EventType::Handshake,
            serde_json::to_vec(payload).expect("Failed to serialize message data"),
        )
    }

    /// 创建订阅消息
    pub fn subscribe(topic: &str) -> Self {
        let payload = SubscribePayload {
            topic: topic.to_string(),
        };
        Self::new(
            EventType::Subscribe,
            serde_json::to_vec(&payload).expect("Failed to serialize message data"),
        )
    }

    /// 创建取消订阅消息
    pub fn unsubscribe(topic: &str) -> Self {
        let payload = SubscribePayload {
            topic: topic.to_string(),
        };
        Self::new(
            EventType::Unsubscribe,
            serde_json::to_vec(&payload).expect("Failed to serialize message data"),
        )
    }

    /// 创建推送事件消息 (服务端 -> 客户端)
    pub fn push(payload: &PushPayload) -> Self {
        Self::new(
            EventType::Push,
            serde_json::to_vec(payload).expect("Failed to serialize message data"),
        )
    }

    /// 解析业务载荷
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_roundtrip() {
        for raw in 0u8..=3 {
            let event_type = EventType::try_from(raw).unwrap();
            assert_eq!(event_type as u8, raw);
        }
        assert!(EventType::try_from(42).is_err());
    }

    #[test]
    fn test_push_message_payload_roundtrip() {
        let payload = PushPayload {
            event: "sensor-update".to_string(),
            data: serde_json::json!({"device_sensor_id": 7, "value": 21.5}),
        };
        let msg = BusMessage::push(&payload);
        assert_eq!(msg.event_type, EventType::Push);

        let parsed: PushPayload = msg.parse_payload().unwrap();
        assert_eq!(parsed.event, "sensor-update");
        assert_eq!(parsed.data["device_sensor_id"], 7);
    }
}
