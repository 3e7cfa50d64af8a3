use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{Hub, HubDependencies, HubSettings, NoopArchive, SystemClock, TrustingVerifier};
use config::{MetricsConfig, ServerConfig};
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::{net::TcpListener, net::TcpStream, time::timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use web_api::{router, AppState};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(metrics: MetricsConfig) -> SocketAddr {
    let hub = Hub::new(
        HubSettings::default(),
        HubDependencies {
            clock: Arc::new(SystemClock),
            archive: Arc::new(NoopArchive),
            identity: Arc::new(TrustingVerifier),
        },
    );
    let (handle, _task) = infrastructure::spawn_hub(hub, &metrics, 64);
    let app = router(AppState::new(handle), &ServerConfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.ok();
    });
    addr
}

fn quiet_metrics() -> MetricsConfig {
    MetricsConfig {
        publish_interval_ms: 60_000,
        reset_interval_ms: 60_000,
    }
}

async fn connect(addr: SocketAddr) -> (Socket, String) {
    let (mut socket, _) = connect_async(format!("ws://{addr}/api/v1/ws"))
        .await
        .expect("websocket connect");
    let connected = next_event(&mut socket, "connected").await;
    let session_id = connected["data"]["session_id"]
        .as_str()
        .expect("session id")
        .to_string();
    (socket, session_id)
}

async fn send(socket: &mut Socket, event: Value) {
    socket
        .send(TungsteniteMessage::Text(event.to_string().into()))
        .await
        .expect("send");
}

async fn register(socket: &mut Socket, user: &str) {
    send(
        socket,
        json!({"event": "register_session", "data": {"user_id": user}}),
    )
    .await;
    next_event(socket, "user_status_update").await;
}

/// 读取下一个文本帧
async fn next_frame(socket: &mut Socket) -> Value {
    loop {
        let message = timeout(Duration::from_secs(3), socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let TungsteniteMessage::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("json frame");
        }
    }
}

/// 读取直到出现指定名称的事件
async fn next_event(socket: &mut Socket, name: &str) -> Value {
    loop {
        let message = timeout(Duration::from_secs(3), socket.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {name}"))
            .expect("stream ended")
            .expect("websocket error");
        if let TungsteniteMessage::Text(text) = message {
            let value: Value = serde_json::from_str(text.as_str()).expect("json frame");
            if value["event"] == name {
                return value;
            }
        }
    }
}

#[tokio::test]
async fn global_message_reaches_all_sessions() {
    let addr = start_server(quiet_metrics()).await;
    let (mut alice, _) = connect(addr).await;
    let (mut bob, _) = connect(addr).await;
    register(&mut alice, "alice").await;
    register(&mut bob, "bob").await;

    send(
        &mut alice,
        json!({"event": "send_message", "data": {"content": "hello everyone"}}),
    )
    .await;

    for socket in [&mut alice, &mut bob] {
        let event = next_event(socket, "receive_message").await;
        assert_eq!(event["data"]["content"], "hello everyone");
        assert_eq!(event["data"]["sender_id"], "alice");
        assert_eq!(event["data"]["kind"], "global");
    }
}

#[tokio::test]
async fn malformed_frames_get_an_error_reply() {
    let addr = start_server(quiet_metrics()).await;
    let (mut socket, _) = connect(addr).await;

    socket
        .send(TungsteniteMessage::Text("not json".into()))
        .await
        .unwrap();
    let error = next_event(&mut socket, "error").await;
    assert_eq!(error["data"]["code"], "MALFORMED_REQUEST");

    // 连接仍然可用
    send(&mut socket, json!({"event": "ping", "data": {"timestamp": 99}})).await;
    let pong = next_event(&mut socket, "pong").await;
    assert_eq!(pong["data"]["timestamp"], 99);
}

#[tokio::test]
async fn malformed_replies_keep_frame_order() {
    let addr = start_server(quiet_metrics()).await;
    let (mut socket, _) = connect(addr).await;

    send(&mut socket, json!({"event": "ping", "data": {"timestamp": 1}})).await;
    socket
        .send(TungsteniteMessage::Text("{\"event\": \"teleport\"}".into()))
        .await
        .unwrap();
    send(&mut socket, json!({"event": "ping", "data": {"timestamp": 2}})).await;

    let first = next_frame(&mut socket).await;
    assert_eq!(first["event"], "pong");
    assert_eq!(first["data"]["timestamp"], 1);
    let second = next_frame(&mut socket).await;
    assert_eq!(second["event"], "error");
    assert_eq!(second["data"]["code"], "MALFORMED_REQUEST");
    let third = next_frame(&mut socket).await;
    assert_eq!(third["event"], "pong");
    assert_eq!(third["data"]["timestamp"], 2);
}

#[tokio::test]
async fn rooms_are_listed_over_http() {
    let addr = start_server(quiet_metrics()).await;
    let (mut alice, _) = connect(addr).await;
    register(&mut alice, "alice").await;

    send(
        &mut alice,
        json!({"event": "create_room", "data": {"name": "standup"}}),
    )
    .await;
    let created = next_event(&mut alice, "room_created").await;
    assert_eq!(created["data"]["name"], "standup");
    assert_eq!(created["data"]["creator_id"], "alice");

    let client = Client::new();
    let rooms: Value = client
        .get(format!("http://{addr}/api/v1/rooms"))
        .send()
        .await
        .expect("rooms request")
        .json()
        .await
        .expect("rooms json");
    assert_eq!(rooms.as_array().map(Vec::len), Some(1));
    assert_eq!(rooms[0]["id"], created["data"]["id"]);

    let presence: Value = client
        .get(format!("http://{addr}/api/v1/presence"))
        .send()
        .await
        .expect("presence request")
        .json()
        .await
        .expect("presence json");
    assert_eq!(presence[0]["user_id"], "alice");
    assert_eq!(presence[0]["status"], "online");

    let health = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("health request");
    assert!(health.status().is_success());
}

#[tokio::test]
async fn closing_a_socket_leaves_its_rooms() {
    let addr = start_server(quiet_metrics()).await;
    let (mut alice, _) = connect(addr).await;
    let (mut bob, bob_session) = connect(addr).await;
    register(&mut alice, "alice").await;
    register(&mut bob, "bob").await;

    send(&mut alice, json!({"event": "create_room", "data": {"name": "call"}})).await;
    let created = next_event(&mut alice, "room_created").await;
    let room_id = created["data"]["id"].clone();

    send(&mut alice, json!({"event": "join_room", "data": {"room_id": room_id}})).await;
    next_event(&mut alice, "room_joined").await;
    send(&mut bob, json!({"event": "join_room", "data": {"room_id": room_id}})).await;
    let joined = next_event(&mut bob, "room_joined").await;
    assert_eq!(joined["data"]["members"][0]["user_id"], "alice");
    next_event(&mut alice, "user_joined_room").await;

    bob.close(None).await.unwrap();

    let left = next_event(&mut alice, "user_left_room").await;
    assert_eq!(left["data"]["session_id"], bob_session.as_str());
    assert_eq!(left["data"]["user_id"], "bob");
}

#[tokio::test]
async fn stats_are_pushed_periodically() {
    let addr = start_server(MetricsConfig {
        publish_interval_ms: 100,
        reset_interval_ms: 100,
    })
    .await;
    let (mut alice, _) = connect(addr).await;
    register(&mut alice, "alice").await;

    let stats = next_event(&mut alice, "server_stats").await;
    assert_eq!(stats["data"]["active_sessions"], 1);
    assert_eq!(stats["data"]["active_users"], 1);
    assert!(stats["data"]["throughput"].is_u64());
}
