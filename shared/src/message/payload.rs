use serde::{Deserialize, Serialize};

// ==================== Payloads ====================

/// 握手载荷 (客户端 -> 推送服务端)
///
/// 包含客户端的协议版本信息，用于服务端进行版本校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// 协议版本
    pub version: u16,
    /// 客户端名称/标识
    pub client_name: Option<String>,
}

/// 订阅/取消订阅载荷 (客户端 -> 推送服务端)
///
/// 主题是不透明字符串，由调用方完整给出，例如 `"devices"`、
/// `"device-id-42"`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribePayload {
    pub topic: String,
}

/// 推送事件载荷 (推送服务端 -> 客户端)
///
/// `event` 是事件名（如 `"sensor-update"`），`data` 是原始 JSON。
/// 客户端在传输边界将其规范化为强类型事件后再进入核心逻辑。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub event: String,
    pub data: serde_json::Value,
}
