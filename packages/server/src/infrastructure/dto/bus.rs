//! Inter-node bus DTOs.
//!
//! - [`ProtocolMessage`]: mutual-exclusion protocol and liveness traffic
//!   (`ra_channel` / `ra_heartbeat`), camelCase fields.
//! - [`RelayEnvelope`]: a room-scoped [`ServerEvent`] tagged with its room and
//!   originating node (`global`), flattened into one JSON object.

use serde::{Deserialize, Serialize};

use crate::domain::NodeId;

use super::websocket::ServerEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProtocolMessage {
    /// Request for a room's critical section
    #[serde(rename = "RA_REQUEST", rename_all = "camelCase")]
    Request {
        room_id: String,
        node_id: NodeId,
        timestamp: u64,
        user_name: String,
    },
    /// Grant addressed to `request_node_id`
    #[serde(rename = "RA_RESPONSE", rename_all = "camelCase")]
    Response {
        room_id: String,
        node_id: NodeId,
        request_node_id: NodeId,
        /// Timestamp of the request being answered, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_timestamp: Option<u64>,
    },
    #[serde(rename = "RA_NODE_ANNOUNCE", rename_all = "camelCase")]
    NodeAnnounce { node_id: NodeId },
    /// Liveness beacon; `timestamp` is wall-clock milliseconds
    #[serde(rename = "RA_HEARTBEAT", rename_all = "camelCase")]
    Heartbeat { node_id: NodeId, timestamp: i64 },
}

impl ProtocolMessage {
    /// The node that sent this message
    pub fn node_id(&self) -> NodeId {
        match self {
            ProtocolMessage::Request { node_id, .. }
            | ProtocolMessage::Response { node_id, .. }
            | ProtocolMessage::NodeAnnounce { node_id }
            | ProtocolMessage::Heartbeat { node_id, .. } => *node_id,
        }
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A game event relayed to the other nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    #[serde(flatten)]
    pub event: ServerEvent,
    pub global_room_id: String,
    pub instance_id: NodeId,
}

impl RelayEnvelope {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn node(n: u128) -> NodeId {
        NodeId::from_uuid(Uuid::from_u128(n))
    }

    #[test]
    fn test_request_uses_camel_case_fields() {
        // テスト項目: RA_REQUEST が camelCase のフィールドで出力される
        // given (前提条件):
        let request = ProtocolMessage::Request {
            room_id: "ab12cd".to_string(),
            node_id: node(1),
            timestamp: 7,
            user_name: "alice".to_string(),
        };

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&request.to_json()).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({
                "type": "RA_REQUEST",
                "roomId": "ab12cd",
                "nodeId": node(1).to_string(),
                "timestamp": 7,
                "userName": "alice",
            })
        );
    }

    #[test]
    fn test_response_without_request_timestamp_is_accepted() {
        // テスト項目: requestTimestamp を含まない RA_RESPONSE も解析できる
        // given (前提条件):
        let text = format!(
            r#"{{"type":"RA_RESPONSE","roomId":"ab12cd","nodeId":"{}","requestNodeId":"{}"}}"#,
            node(2),
            node(1)
        );

        // when (操作):
        let message = ProtocolMessage::parse(&text).unwrap();

        // then (期待する結果):
        assert_eq!(
            message,
            ProtocolMessage::Response {
                room_id: "ab12cd".to_string(),
                node_id: node(2),
                request_node_id: node(1),
                request_timestamp: None,
            }
        );
        assert_eq!(message.node_id(), node(2));
    }

    #[test]
    fn test_malformed_protocol_messages_are_rejected() {
        // テスト項目: 不正なノード ID や未知の type は解析エラーになる
        assert!(ProtocolMessage::parse(r#"{"type":"RA_NODE_ANNOUNCE","nodeId":"nope"}"#).is_err());
        assert!(ProtocolMessage::parse(r#"{"type":"RA_ELECT"}"#).is_err());
        assert!(ProtocolMessage::parse("{").is_err());
    }

    #[test]
    fn test_relay_envelope_flattens_event() {
        // テスト項目: 中継メッセージはイベントのフィールドとルーティング情報を 1 つの JSON に持つ
        // given (前提条件):
        let envelope = RelayEnvelope {
            event: ServerEvent::Chat {
                user_name: "bob".to_string(),
                chat_message: "hello".to_string(),
            },
            global_room_id: "ab12cd".to_string(),
            instance_id: node(3),
        };

        // when (操作):
        let text = envelope.to_json();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let parsed = RelayEnvelope::parse(&text).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({
                "type": "CHAT",
                "user_name": "bob",
                "chat_message": "hello",
                "global_room_id": "ab12cd",
                "instance_id": node(3).to_string(),
            })
        );
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_relay_envelope_with_unit_event() {
        // テスト項目: フィールドを持たないイベントも中継できる
        let text = format!(
            r#"{{"type":"ROUND_TIMEOUT","global_room_id":"ab12cd","instance_id":"{}"}}"#,
            node(4)
        );

        let parsed = RelayEnvelope::parse(&text).unwrap();

        assert_eq!(parsed.event, ServerEvent::RoundTimeout);
        assert_eq!(parsed.global_room_id, "ab12cd");
    }
}
