//! End-to-end scenarios against a server on an ephemeral port: cursor
//! semantics over the request API, the negotiate → connect → join → data
//! flow on both framings, and invalid-group handling.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use prost::Message as _;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use bluefeed::api::routes::create_router;
use bluefeed::api::AppState;
use bluefeed::config::{Config, CursorScope, StoreMode};
use bluefeed::cursor::{CursorStore, PlaybackMode};
use bluefeed::proto::feed;
use bluefeed::proto::pubsub::{
    downstream_message, message_data, upstream_message, DownstreamMessage, UpstreamMessage,
};
use bluefeed::store::{MemoryStore, RecordStore};
use bluefeed::ws::groups::ALL_HUBS;
use bluefeed::ws::hub::Hub;
use bluefeed::ws::streamer::Streamer;

const DATE: &str = "2025-11-03";

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

fn write_orderflow_fixture(root: &Path, lines: usize) {
    let dir = root.join(DATE).join("SPX").join("orderflow");
    std::fs::create_dir_all(&dir).unwrap();
    let mut body = String::new();
    for i in 1..=lines {
        body.push_str(&format!(
            "{{\"timestamp\":{i},\"ticker\":\"SPX\",\"spot\":{}.5,\"zcvr\":-{i}.0}}\n",
            4500 + i
        ));
    }
    std::fs::write(dir.join("orderflow.jsonl"), body).unwrap();
}

fn chain_line(timestamp: usize) -> String {
    format!(
        "{{\"timestamp\":{timestamp},\"ticker\":\"SPX\",\"min_dte\":0,\"sec_min_dte\":1,\
         \"spot\":4500.5,\"zero_gamma\":4495.0,\"major_pos_vol\":4510.0,\"major_pos_oi\":4511.0,\
         \"major_neg_vol\":4480.0,\"major_neg_oi\":4481.0,\
         \"strikes\":[[4500.0,1.25,-2.5,[0.5]]],\
         \"sum_gex_vol\":1.5,\"sum_gex_oi\":-0.5,\"delta_risk_reversal\":0.0125,\
         \"max_priors\":[[1.0,0.1],[2.0,0.2],[3.0,0.3],[4.0,0.4],[5.0,0.5],[6.0,0.6]]}}"
    )
}

fn write_chain_fixture(root: &Path, family: &str, category: &str, lines: usize) {
    let dir = root.join(DATE).join("SPX").join(family);
    std::fs::create_dir_all(&dir).unwrap();
    let body: String = (1..=lines).map(|i| chain_line(i) + "\n").collect();
    std::fs::write(dir.join(format!("{category}.jsonl")), body).unwrap();
}

fn write_greek_fixture(root: &Path, category: &str, lines: usize) {
    let dir = root.join(DATE).join("SPX").join("state");
    std::fs::create_dir_all(&dir).unwrap();
    let body: String = (1..=lines)
        .map(|i| {
            format!(
                "{{\"timestamp\":{i},\"ticker\":\"SPX\",\"spot\":4500.0,\"min_dte\":0,\
                 \"sec_min_dte\":1,\"major_positive\":4510.0,\"major_negative\":4490.0,\
                 \"major_long_gamma\":4505.0,\"major_short_gamma\":4495.0,\
                 \"mini_contracts\":[[4500.0,0.15,0.16,12.5,[1.5]]]}}\n"
            )
        })
        .collect();
    std::fs::write(dir.join(format!("{category}.jsonl")), body).unwrap();
}

struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn spawn_server(
    root: &Path,
    playback_mode: PlaybackMode,
    push_enabled: bool,
    push_tick: Duration,
) -> TestServer {
    spawn_server_scoped(root, playback_mode, CursorScope::Shared, push_enabled, push_tick).await
}

async fn spawn_server_scoped(
    root: &Path,
    playback_mode: PlaybackMode,
    cursor_scope: CursorScope,
    push_enabled: bool,
    push_tick: Duration,
) -> TestServer {
    let config = Arc::new(Config {
        port: 0,
        data_root: root.to_path_buf(),
        data_date: DATE.to_string(),
        store_mode: StoreMode::Memory,
        playback_mode,
        cursor_scope,
        push_enabled,
        push_tick,
        group_prefix: "blue".to_string(),
    });

    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::open(root, DATE).unwrap());
    let cursors = Arc::new(CursorStore::new(playback_mode));
    let shutdown = CancellationToken::new();

    let mut hubs = HashMap::new();
    if push_enabled {
        for kind in ALL_HUBS {
            let hub = Hub::new(kind, &config.group_prefix);
            let hub_task = hub.clone();
            let hub_cancel = shutdown.clone();
            tokio::spawn(async move { hub_task.run(hub_cancel).await });

            let streamer =
                Streamer::new(hub.clone(), store.clone(), cursors.clone(), push_tick).unwrap();
            let streamer_cancel = shutdown.clone();
            tokio::spawn(async move { streamer.run(streamer_cancel).await });

            hubs.insert(kind.name(), hub);
        }
    }

    let state = AppState {
        config,
        store,
        cursors,
        hubs: Arc::new(hubs),
        shutdown: shutdown.clone(),
        loaded_at: Utc::now(),
    };
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serve_cancel = shutdown.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { serve_cancel.cancelled().await })
            .await
            .unwrap();
    });

    TestServer { addr, shutdown }
}

async fn get_json(client: &reqwest::Client, url: &str) -> (u16, serde_json::Value) {
    let response = client.get(url).send().await.unwrap();
    let status = response.status().as_u16();
    let body = response.json::<serde_json::Value>().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn exhaust_cursor_reads_then_404s() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_orderflow_fixture(tmp.path(), 3);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        false,
        Duration::from_secs(1),
    )
    .await;

    let client = reqwest::Client::new();
    let url = server.url("/orderflow/SPX?key=K");

    for expected in 1..=3 {
        let (status, body) = get_json(&client, &url).await;
        assert_eq!(status, 200);
        assert_eq!(body["timestamp"], expected);
        assert_eq!(body["ticker"], "SPX");
    }

    let (status, body) = get_json(&client, &url).await;
    assert_eq!(status, 404);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("no more data available"));
}

#[tokio::test]
async fn rotation_cursor_wraps_without_404() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_orderflow_fixture(tmp.path(), 3);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Rotation,
        false,
        Duration::from_secs(1),
    )
    .await;

    let client = reqwest::Client::new();
    let url = server.url("/orderflow/SPX?key=K");

    let mut seen = Vec::new();
    for _ in 0..5 {
        let (status, body) = get_json(&client, &url).await;
        assert_eq!(status, 200);
        seen.push(body["timestamp"].as_i64().unwrap());
    }
    assert_eq!(seen, vec![1, 2, 3, 1, 2]);
}

#[tokio::test]
async fn subscriber_keys_advance_independently_and_reset() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_orderflow_fixture(tmp.path(), 5);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        false,
        Duration::from_secs(1),
    )
    .await;

    let client = reqwest::Client::new();
    let url_a = server.url("/orderflow/SPX?key=A");
    let url_b = server.url("/orderflow/SPX?key=B");

    let mut replies = Vec::new();
    for url in [&url_a, &url_a, &url_b, &url_a] {
        let (status, body) = get_json(&client, url).await;
        assert_eq!(status, 200);
        replies.push(body["timestamp"].as_i64().unwrap());
    }
    // Indices A:0, A:1, B:0, A:2 over timestamps 1..
    assert_eq!(replies, vec![1, 2, 1, 3]);

    let reset: serde_json::Value = client
        .post(server.url("/cache/reset?key=B"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reset["count"], 1);

    let (status, body) = get_json(&client, &url_b).await;
    assert_eq!(status, 200);
    assert_eq!(body["timestamp"], 1);
}

#[tokio::test]
async fn empty_file_404s_under_rotation() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_orderflow_fixture(tmp.path(), 2);
    // A present-but-empty category alongside a real one.
    let dir = tmp.path().join(DATE).join("NDX").join("orderflow");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("orderflow.jsonl"), "\n\n").unwrap();

    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Rotation,
        false,
        Duration::from_secs(1),
    )
    .await;

    let client = reqwest::Client::new();
    let (status, _) = get_json(&client, &server.url("/orderflow/NDX?key=K")).await;
    assert_eq!(status, 404);
}

async fn connect_ws(server: &TestServer, token: &str, subprotocol: &str) -> WsClient {
    let url = server.ws_url(&format!("/ws/orderflow?access_token={token}"));
    let mut request = url.into_client_request().unwrap();
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_str(subprotocol).unwrap(),
    );
    let (ws, response) = connect_async(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("Sec-WebSocket-Protocol")
            .and_then(|v| v.to_str().ok()),
        Some(subprotocol)
    );
    ws
}

async fn next_binary_frame(ws: &mut WsClient) -> DownstreamMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            WsMessage::Binary(data) => {
                return DownstreamMessage::decode(data.as_slice()).unwrap()
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn next_text_frame(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            WsMessage::Text(text) => return serde_json::from_str(&text).unwrap(),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

fn join_frame(group: &str, ack_id: u64) -> WsMessage {
    WsMessage::Binary(
        UpstreamMessage {
            message: Some(upstream_message::Message::JoinGroupMessage(
                upstream_message::JoinGroupMessage {
                    group: group.to_string(),
                    ack_id: Some(ack_id),
                },
            )),
        }
        .encode_to_vec(),
    )
}

#[tokio::test]
async fn negotiate_join_and_stream_binary() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_orderflow_fixture(tmp.path(), 3);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        true,
        Duration::from_millis(100),
    )
    .await;

    // Handshake with Basic auth returns per-hub URLs carrying key:uuid.
    let client = reqwest::Client::new();
    let negotiate: serde_json::Value = client
        .get(server.url("/negotiate"))
        .header("Authorization", "Basic K")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let orderflow_url = negotiate["websocket_urls"]["orderflow"].as_str().unwrap();
    assert!(orderflow_url.contains("/ws/orderflow?access_token=K:"));

    let token = orderflow_url.split("access_token=").nth(1).unwrap();
    let mut ws = connect_ws(&server, token, "protobuf.webpubsub.azure.v1").await;

    // CONNECTED carries a fresh connection id and the subscriber key.
    let connected = next_binary_frame(&mut ws).await;
    match connected.message {
        Some(downstream_message::Message::SystemMessage(sys)) => match sys.message {
            Some(downstream_message::system_message::Message::ConnectedMessage(c)) => {
                assert_eq!(c.user_id, "K");
                assert!(!c.connection_id.is_empty());
            }
            other => panic!("unexpected system frame: {other:?}"),
        },
        other => panic!("expected connected frame, got {other:?}"),
    }

    ws.send(join_frame("blue_SPX_orderflow_orderflow", 7))
        .await
        .unwrap();

    let ack = next_binary_frame(&mut ws).await;
    match ack.message {
        Some(downstream_message::Message::AckMessage(ack)) => {
            assert_eq!(ack.ack_id, 7);
            assert!(ack.success);
        }
        other => panic!("expected ack, got {other:?}"),
    }

    // Within a tick: DATA with the typed compressed payload for record 0.
    let data = next_binary_frame(&mut ws).await;
    match data.message {
        Some(downstream_message::Message::DataMessage(data)) => {
            assert_eq!(data.group.as_deref(), Some("blue_SPX_orderflow_orderflow"));
            match data.data.unwrap().data.unwrap() {
                message_data::Data::ProtobufData(any) => {
                    assert_eq!(any.type_url, "proto.orderflow");
                    let decompressed = zstd::decode_all(any.value.as_slice()).unwrap();
                    let of = feed::Orderflow::decode(decompressed.as_slice()).unwrap();
                    assert_eq!(of.timestamp, 1);
                    assert_eq!(of.ticker, "SPX");
                    assert_eq!(of.spot, 450150); // 4501.5 × 100
                    assert_eq!(of.zero_convexity_ratio, -1);
                }
                other => panic!("unexpected payload: {other:?}"),
            }
        }
        other => panic!("expected data frame, got {other:?}"),
    }
}

#[tokio::test]
async fn json_subscriber_receives_raw_record() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_orderflow_fixture(tmp.path(), 3);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        true,
        Duration::from_millis(100),
    )
    .await;

    let mut ws = connect_ws(&server, "K:seed", "json.webpubsub.azure.v1").await;

    let connected = next_text_frame(&mut ws).await;
    assert_eq!(connected["type"], "system");
    assert_eq!(connected["event"], "connected");
    assert_eq!(connected["userId"], "K");

    ws.send(WsMessage::Text(
        r#"{"type":"joinGroup","group":"blue_SPX_orderflow_orderflow","ackId":3}"#.to_string(),
    ))
    .await
    .unwrap();

    let ack = next_text_frame(&mut ws).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["ackId"], 3);
    assert_eq!(ack["success"], true);

    let data = next_text_frame(&mut ws).await;
    assert_eq!(data["type"], "message");
    assert_eq!(data["from"], "group");
    assert_eq!(data["group"], "blue_SPX_orderflow_orderflow");
    assert_eq!(data["dataType"], "json");
    assert_eq!(data["data"]["timestamp"], 1);
    assert_eq!(data["data"]["spot"], 4501.5);
}

#[tokio::test]
async fn invalid_group_acks_failure_and_stays_silent() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_orderflow_fixture(tmp.path(), 3);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        true,
        Duration::from_millis(100),
    )
    .await;

    let mut ws = connect_ws(&server, "K:seed", "protobuf.webpubsub.azure.v1").await;
    let _connected = next_binary_frame(&mut ws).await;

    ws.send(join_frame("blue_SPX_orderflow_oops", 7))
        .await
        .unwrap();

    let ack = next_binary_frame(&mut ws).await;
    match ack.message {
        Some(downstream_message::Message::AckMessage(ack)) => {
            assert_eq!(ack.ack_id, 7);
            assert!(!ack.success);
        }
        other => panic!("expected ack, got {other:?}"),
    }

    // No data should arrive for a rejected group.
    let quiet = tokio::time::timeout(Duration::from_millis(400), ws.next()).await;
    match quiet {
        Err(_) => {}
        Ok(Some(Ok(WsMessage::Ping(_)))) | Ok(Some(Ok(WsMessage::Pong(_)))) => {}
        Ok(other) => panic!("expected silence, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_token_is_rejected_before_upgrade() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_orderflow_fixture(tmp.path(), 1);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        true,
        Duration::from_millis(100),
    )
    .await;

    let url = server.ws_url("/ws/orderflow");
    let request = url.into_client_request().unwrap();
    assert!(connect_async(request).await.is_err());
}

#[tokio::test]
async fn health_and_discovery_endpoints() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_orderflow_fixture(tmp.path(), 2);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        false,
        Duration::from_secs(1),
    )
    .await;

    let client = reqwest::Client::new();

    let (status, health) = get_json(&client, &server.url("/health")).await;
    assert_eq!(status, 200);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["data_date"], DATE);
    assert_eq!(health["data_mode"], "memory");
    assert_eq!(health["cache_mode"], "exhaust");

    let (status, tickers) = get_json(&client, &server.url("/tickers")).await;
    assert_eq!(status, 200);
    assert_eq!(tickers["indexes"][0], "SPX");
    assert_eq!(tickers["stocks"].as_array().unwrap().len(), 0);

    let (status, dates) = get_json(&client, &server.url("/dates")).await;
    assert_eq!(status, 200);
    assert_eq!(dates["dates"][0], DATE);
    assert_eq!(dates["count"], 1);

    // Raw download streams the backing file verbatim.
    let body = client
        .get(server.url("/download/state/SPX/full"))
        .send()
        .await
        .unwrap();
    assert_eq!(body.status().as_u16(), 404);
}

#[tokio::test]
async fn classic_chain_majors_and_maxchange_projections() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_chain_fixture(tmp.path(), "classic", "gex_full", 4);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        false,
        Duration::from_secs(1),
    )
    .await;

    let client = reqwest::Client::new();

    let (status, chain) = get_json(&client, &server.url("/classic/SPX/full?key=K")).await;
    assert_eq!(status, 200);
    assert_eq!(chain["timestamp"], 1);
    assert_eq!(chain["strikes"][0][0], 4500.0);
    assert_eq!(chain["strikes"][0][3][0], 0.5);
    assert_eq!(chain["max_priors"].as_array().unwrap().len(), 6);

    // Shared scope: the majors read advances the same cursor, so it sees
    // the second record.
    let (status, majors) = get_json(&client, &server.url("/classic/SPX/full/majors?key=K")).await;
    assert_eq!(status, 200);
    assert_eq!(majors["timestamp"], 2);
    assert_eq!(majors["mpos_vol"], 4510.0);
    assert_eq!(majors["net_gex_vol"], 1.5);
    assert!(majors.get("strikes").is_none());

    let (status, maxchange) =
        get_json(&client, &server.url("/classic/SPX/full/maxchange?key=K")).await;
    assert_eq!(status, 200);
    assert_eq!(maxchange["timestamp"], 3);
    assert_eq!(maxchange["current"][0], 1.0);
    assert_eq!(maxchange["thirty"][1], 0.6);

    // Unknown aggregation is a client error, not a cursor advance.
    let (status, _) = get_json(&client, &server.url("/classic/SPX/weekly?key=K")).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn independent_scope_gives_each_endpoint_its_own_cursor() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_chain_fixture(tmp.path(), "classic", "gex_full", 3);
    let server = spawn_server_scoped(
        tmp.path(),
        PlaybackMode::Exhaust,
        CursorScope::Independent,
        false,
        Duration::from_secs(1),
    )
    .await;

    let client = reqwest::Client::new();

    let (_, chain) = get_json(&client, &server.url("/classic/SPX/full?key=K")).await;
    let (_, majors) = get_json(&client, &server.url("/classic/SPX/full/majors?key=K")).await;
    let (_, maxchange) =
        get_json(&client, &server.url("/classic/SPX/full/maxchange?key=K")).await;

    // Each projection starts from index 0 under its own cursor.
    assert_eq!(chain["timestamp"], 1);
    assert_eq!(majors["timestamp"], 1);
    assert_eq!(maxchange["timestamp"], 1);

    let (_, chain) = get_json(&client, &server.url("/classic/SPX/full?key=K")).await;
    assert_eq!(chain["timestamp"], 2);
}

#[tokio::test]
async fn state_profile_serves_chain_and_greek_shapes() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_chain_fixture(tmp.path(), "state", "gex_zero", 2);
    write_greek_fixture(tmp.path(), "vanna_zero", 2);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        false,
        Duration::from_secs(1),
    )
    .await;

    let client = reqwest::Client::new();

    let (status, chain) = get_json(&client, &server.url("/state/SPX/zero?key=K")).await;
    assert_eq!(status, 200);
    assert_eq!(chain["zero_gamma"], 4495.0);

    let (status, greek) = get_json(&client, &server.url("/state/SPX/vanna_zero?key=G")).await;
    assert_eq!(status, 200);
    assert_eq!(greek["major_positive"], 4510.0);
    assert_eq!(greek["mini_contracts"][0][3], 12.5);

    let (status, _) = get_json(&client, &server.url("/state/SPX/sigma_zero?key=K")).await;
    assert_eq!(status, 400);

    // Download of a loaded state file streams the raw lines back.
    let body = client
        .get(server.url("/download/state/SPX/zero"))
        .send()
        .await
        .unwrap();
    assert_eq!(body.status().as_u16(), 200);
    assert_eq!(
        body.headers().get("content-type").unwrap(),
        "application/x-ndjson"
    );
    let text = body.text().await.unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.starts_with("{\"timestamp\":1,"));
}

#[tokio::test]
async fn chain_groups_stream_typed_gex_payloads() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_chain_fixture(tmp.path(), "state", "gex_full", 2);
    let server = spawn_server(
        tmp.path(),
        PlaybackMode::Exhaust,
        true,
        Duration::from_millis(100),
    )
    .await;

    let url = server.ws_url("/ws/state_gex?access_token=K:seed");
    let mut request = url.into_client_request().unwrap();
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_static("protobuf.webpubsub.azure.v1"),
    );
    let (mut ws, _) = connect_async(request).await.unwrap();

    let _connected = next_binary_frame(&mut ws).await;
    ws.send(join_frame("blue_SPX_state_gex_full", 11))
        .await
        .unwrap();
    let _ack = next_binary_frame(&mut ws).await;

    let data = next_binary_frame(&mut ws).await;
    match data.message {
        Some(downstream_message::Message::DataMessage(data)) => {
            match data.data.unwrap().data.unwrap() {
                message_data::Data::ProtobufData(any) => {
                    assert_eq!(any.type_url, "proto.gex");
                    let decompressed = zstd::decode_all(any.value.as_slice()).unwrap();
                    let gex = feed::Gex::decode(decompressed.as_slice()).unwrap();
                    assert_eq!(gex.timestamp, 1);
                    assert_eq!(gex.spot, 450050);
                    assert_eq!(gex.strikes.len(), 1);
                    assert_eq!(gex.strikes[0].strike_price, 450000);
                    assert_eq!(gex.max_priors.unwrap().tuples.len(), 6);
                }
                other => panic!("unexpected payload: {other:?}"),
            }
        }
        other => panic!("expected data frame, got {other:?}"),
    }
}
