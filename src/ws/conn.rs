//! Connection endpoint: upgrade, subprotocol negotiation, and the two
//! pumps. The read pump owns the connection lifecycle; the write pump owns
//! the socket's outbound half and the keepalive ticker.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::hub::{Conn, Hub};
use super::protocol::{self, Upstream};
use super::{Framing, MAX_MESSAGE_SIZE, PING_PERIOD, PONG_WAIT, SUBPROTOCOLS, WRITE_WAIT};
use crate::api::AppState;

#[derive(Debug, Deserialize)]
pub struct UpgradeQuery {
    pub access_token: Option<String>,
}

/// `GET /ws/{hub}?access_token=key:connid`.
pub async fn upgrade(
    State(state): State<AppState>,
    Path(hub_name): Path<String>,
    Query(query): Query<UpgradeQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = query.access_token.filter(|t| !t.is_empty()) else {
        return (StatusCode::UNAUTHORIZED, "missing access_token").into_response();
    };

    let Some(hub) = state.hubs.get(hub_name.as_str()).cloned() else {
        return (StatusCode::NOT_FOUND, "unknown hub").into_response();
    };

    // Token format: apiKey:originalConnID. Every upgrade gets a fresh
    // connection id regardless of what the token carried.
    let api_key = token.split(':').next().unwrap_or_default().to_string();
    let conn_id = Uuid::new_v4().to_string();
    let shutdown = state.shutdown.clone();

    ws.protocols(SUBPROTOCOLS)
        .max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, hub, api_key, conn_id, shutdown))
}

async fn handle_socket(
    socket: WebSocket,
    hub: Arc<Hub>,
    api_key: String,
    conn_id: String,
    shutdown: CancellationToken,
) {
    let framing = Framing::from_subprotocol(socket.protocol().and_then(|v| v.to_str().ok()));
    debug!(
        hub = hub.name(),
        conn_id = %conn_id,
        ?framing,
        "websocket subprotocol negotiated"
    );

    let (conn, outbound_rx) = Conn::new(conn_id, api_key, framing);
    hub.register(conn.clone()).await;

    let connected = match framing {
        Framing::Binary => protocol::connected_binary(&conn.conn_id, &conn.api_key),
        Framing::Text => protocol::connected_text(&conn.conn_id, &conn.api_key),
    };
    let _ = conn.try_enqueue(connected);

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_pump(
        sink,
        outbound_rx,
        framing,
        hub.clone(),
        conn.clone(),
    ));

    read_pump(stream, hub.clone(), conn.clone(), shutdown).await;

    hub.unregister(conn).await;
    // Unregister closes the outbound queue, which ends the write pump.
    let _ = writer.await;
}

/// Reads until error, close, deadline, or shutdown. The read deadline is
/// armed at pump start and refreshed only by pong receipt, so a peer must
/// answer the keepalive pings to stay connected; upstream traffic alone
/// does not count.
async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    hub: Arc<Hub>,
    conn: Arc<Conn>,
    shutdown: CancellationToken,
) {
    let mut deadline = tokio::time::Instant::now() + PONG_WAIT;

    loop {
        let msg = tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep_until(deadline) => {
                debug!(conn_id = %conn.conn_id, "read deadline exceeded");
                break;
            }
            read = stream.next() => match read {
                None => break,
                Some(Err(e)) => {
                    debug!(conn_id = %conn.conn_id, error = %e, "websocket read error");
                    break;
                }
                Some(Ok(msg)) => msg,
            },
        };

        match msg {
            Message::Binary(data) => handle_frame(&hub, &conn, &data),
            Message::Text(text) => handle_frame(&hub, &conn, text.as_bytes()),
            Message::Pong(_) => {
                deadline = tokio::time::Instant::now() + PONG_WAIT;
            }
            Message::Ping(_) => {}
            Message::Close(_) => break,
        }
    }
}

/// Decodes one upstream frame per the connection's framing and applies it.
fn handle_frame(hub: &Arc<Hub>, conn: &Arc<Conn>, data: &[u8]) {
    let parsed = match conn.framing {
        Framing::Binary => protocol::parse_upstream_binary(data),
        Framing::Text => protocol::parse_upstream_text(data),
    };

    let frame = match parsed {
        Ok(frame) => frame,
        Err(e) => {
            debug!(conn_id = %conn.conn_id, error = %e, "failed to parse upstream message");
            return;
        }
    };

    match frame {
        Upstream::Join { group, ack_id } => {
            if hub.validate_group(&group) {
                hub.join(conn, &group);
                if let Some(ack_id) = ack_id {
                    let _ = conn.try_enqueue(build_ack(conn.framing, ack_id, true));
                }
            } else {
                debug!(conn_id = %conn.conn_id, group = %group, "invalid group name");
                if let Some(ack_id) = ack_id {
                    let _ = conn.try_enqueue(build_ack(conn.framing, ack_id, false));
                }
            }
        }
        Upstream::Leave { group, ack_id } => {
            hub.leave(conn, &group);
            if let Some(ack_id) = ack_id {
                let _ = conn.try_enqueue(build_ack(conn.framing, ack_id, true));
            }
        }
        Upstream::Ping => {
            let pong = match conn.framing {
                Framing::Binary => protocol::pong_binary(),
                Framing::Text => protocol::pong_text(),
            };
            let _ = conn.try_enqueue(pong);
        }
    }
}

fn build_ack(framing: Framing, ack_id: u64, success: bool) -> Vec<u8> {
    match framing {
        Framing::Binary => protocol::ack_binary(ack_id, success),
        Framing::Text => protocol::ack_text(ack_id, success),
    }
}

/// Drains the outbound queue onto the socket and keeps the transport alive
/// with periodic pings. A closed queue sends a close frame and exits; any
/// write failure schedules unregister so the hub drops the connection.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Vec<u8>>,
    framing: Framing,
    hub: Arc<Hub>,
    conn: Arc<Conn>,
) {
    let start = tokio::time::Instant::now() + PING_PERIOD;
    let mut keepalive = tokio::time::interval_at(start, PING_PERIOD);
    keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => match frame {
                Some(frame) => {
                    let msg = match framing {
                        Framing::Binary => Message::Binary(frame),
                        Framing::Text => {
                            Message::Text(String::from_utf8_lossy(&frame).into_owned())
                        }
                    };
                    match tokio::time::timeout(WRITE_WAIT, sink.send(msg)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            debug!(conn_id = %conn.conn_id, error = %e, "websocket write error");
                            hub.schedule_unregister(conn.clone());
                            return;
                        }
                        Err(_) => {
                            debug!(conn_id = %conn.conn_id, "write deadline exceeded");
                            hub.schedule_unregister(conn.clone());
                            return;
                        }
                    }
                }
                None => {
                    // Queue closed by the hub; tell the peer and stop.
                    let _ = tokio::time::timeout(
                        WRITE_WAIT,
                        sink.send(Message::Close(None)),
                    )
                    .await;
                    return;
                }
            },
            _ = keepalive.tick() => {
                match tokio::time::timeout(WRITE_WAIT, sink.send(Message::Ping(Vec::new()))).await {
                    Ok(Ok(())) => {}
                    _ => {
                        hub.schedule_unregister(conn.clone());
                        return;
                    }
                }
            }
        }
    }
}
