//! Frame construction and upstream parsing for both framings.
//!
//! Binary frames are prost-encoded `UpstreamMessage`/`DownstreamMessage`;
//! text frames are the JSON shapes of the same protocol. Data frames for
//! text consumers embed the raw record as structured JSON; when no raw
//! record is available the typed envelope is base64-encoded instead.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use prost::Message;
use serde::Deserialize;
use serde_json::json;
use serde_json::value::RawValue;

use crate::proto::pubsub::{
    downstream_message, message_data, upstream_message, Any, DownstreamMessage, MessageData,
    UpstreamMessage,
};

/// Routed upstream frame, independent of framing.
#[derive(Debug, Clone, PartialEq)]
pub enum Upstream {
    Join { group: String, ack_id: Option<u64> },
    Leave { group: String, ack_id: Option<u64> },
    Ping,
}

#[derive(Debug, Deserialize)]
struct UpstreamJson {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(rename = "ackId", default)]
    ack_id: Option<u64>,
}

/// Parses a binary upstream frame. Unknown variants are an error, which
/// callers log at debug and drop.
pub fn parse_upstream_binary(data: &[u8]) -> Result<Upstream, String> {
    let msg = UpstreamMessage::decode(data).map_err(|e| format!("decode upstream: {e}"))?;
    match msg.message {
        Some(upstream_message::Message::JoinGroupMessage(m)) => Ok(Upstream::Join {
            group: m.group,
            ack_id: m.ack_id,
        }),
        Some(upstream_message::Message::LeaveGroupMessage(m)) => Ok(Upstream::Leave {
            group: m.group,
            ack_id: m.ack_id,
        }),
        Some(upstream_message::Message::PingMessage(_)) => Ok(Upstream::Ping),
        None => Err("empty upstream message".to_string()),
    }
}

/// Parses a text upstream frame (`joinGroup` / `leaveGroup` / `ping`).
pub fn parse_upstream_text(data: &[u8]) -> Result<Upstream, String> {
    let msg: UpstreamJson =
        serde_json::from_slice(data).map_err(|e| format!("decode upstream json: {e}"))?;
    match msg.kind.as_str() {
        "joinGroup" => Ok(Upstream::Join {
            group: msg.group.unwrap_or_default(),
            ack_id: msg.ack_id,
        }),
        "leaveGroup" => Ok(Upstream::Leave {
            group: msg.group.unwrap_or_default(),
            ack_id: msg.ack_id,
        }),
        "ping" => Ok(Upstream::Ping),
        other => Err(format!("unknown upstream type: {other}")),
    }
}

pub fn connected_binary(connection_id: &str, user_id: &str) -> Vec<u8> {
    DownstreamMessage {
        message: Some(downstream_message::Message::SystemMessage(
            downstream_message::SystemMessage {
                message: Some(
                    downstream_message::system_message::Message::ConnectedMessage(
                        downstream_message::system_message::ConnectedMessage {
                            connection_id: connection_id.to_string(),
                            user_id: user_id.to_string(),
                        },
                    ),
                ),
            },
        )),
    }
    .encode_to_vec()
}

pub fn connected_text(connection_id: &str, user_id: &str) -> Vec<u8> {
    json!({
        "type": "system",
        "event": "connected",
        "connectionId": connection_id,
        "userId": user_id,
    })
    .to_string()
    .into_bytes()
}

pub fn ack_binary(ack_id: u64, success: bool) -> Vec<u8> {
    DownstreamMessage {
        message: Some(downstream_message::Message::AckMessage(
            downstream_message::AckMessage { ack_id, success },
        )),
    }
    .encode_to_vec()
}

pub fn ack_text(ack_id: u64, success: bool) -> Vec<u8> {
    json!({"type": "ack", "ackId": ack_id, "success": success})
        .to_string()
        .into_bytes()
}

pub fn pong_binary() -> Vec<u8> {
    DownstreamMessage {
        message: Some(downstream_message::Message::PongMessage(
            downstream_message::PongMessage {},
        )),
    }
    .encode_to_vec()
}

pub fn pong_text() -> Vec<u8> {
    json!({"type": "pong"}).to_string().into_bytes()
}

/// Binary data frame: the compressed payload wrapped in a typed envelope,
/// nested in the downstream frame.
pub fn data_binary(group: &str, encoded: &[u8], type_url: &str) -> Vec<u8> {
    DownstreamMessage {
        message: Some(downstream_message::Message::DataMessage(
            downstream_message::DataMessage {
                from: "server".to_string(),
                group: Some(group.to_string()),
                data: Some(MessageData {
                    data: Some(message_data::Data::ProtobufData(Any {
                        type_url: type_url.to_string(),
                        value: encoded.to_vec(),
                    })),
                }),
            },
        )),
    }
    .encode_to_vec()
}

#[derive(serde::Serialize)]
struct DataFrameRawJson<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    from: &'static str,
    group: &'a str,
    #[serde(rename = "dataType")]
    data_type: &'static str,
    data: &'a RawValue,
}

/// Text data frame carrying the original record line as structured JSON,
/// embedded verbatim. Falls back to [`data_text_envelope`] when the caller
/// has no raw line.
pub fn data_text_raw(group: &str, raw: &[u8]) -> Option<Vec<u8>> {
    let raw_str = std::str::from_utf8(raw).ok()?;
    let value: &RawValue = serde_json::from_str(raw_str).ok()?;
    serde_json::to_vec(&DataFrameRawJson {
        kind: "message",
        from: "group",
        group,
        data_type: "json",
        data: value,
    })
    .ok()
}

/// Text data frame with the base64-encoded typed envelope, for records that
/// cannot be embedded as JSON.
pub fn data_text_envelope(group: &str, encoded: &[u8], type_url: &str) -> Vec<u8> {
    let envelope = Any {
        type_url: type_url.to_string(),
        value: encoded.to_vec(),
    }
    .encode_to_vec();
    json!({
        "type": "message",
        "from": "group",
        "group": group,
        "dataType": "binary",
        "data": BASE64.encode(envelope),
    })
    .to_string()
    .into_bytes()
}
