//! Push-feed surface: hubs, connections, wire protocol, and the periodic
//! streamers that replay records into subscribed groups.

pub mod conn;
pub mod groups;
pub mod hub;
pub mod negotiate;
pub mod protocol;
pub mod streamer;

use std::time::Duration;

/// Time allowed to write a single frame to the peer.
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Read deadline; refreshed by any inbound traffic including pongs.
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Transport ping period. Must stay below the read deadline.
pub const PING_PERIOD: Duration = Duration::from_secs(54);

/// Maximum inbound frame size.
pub const MAX_MESSAGE_SIZE: usize = 512 * 1024;

/// Outbound queue capacity per connection.
pub const SEND_BUFFER_SIZE: usize = 256;

/// Supported subprotocols in negotiation order.
pub const SUBPROTOCOLS: [&str; 3] = [
    "protobuf.webpubsub.azure.v1",
    "json.reliable.webpubsub.azure.v1",
    "json.webpubsub.azure.v1",
];

/// Negotiated wire framing for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Typed-envelope binary frames (`protobuf.webpubsub.azure.v1`).
    Binary,
    /// JSON text frames (`json[.reliable].webpubsub.azure.v1`).
    Text,
}

impl Framing {
    /// Maps a subprotocol token to its framing. Unrecognized or absent
    /// offers default to binary.
    pub fn from_subprotocol(token: Option<&str>) -> Framing {
        match token {
            Some("json.reliable.webpubsub.azure.v1") | Some("json.webpubsub.azure.v1") => {
                Framing::Text
            }
            _ => Framing::Binary,
        }
    }
}
