use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use parchis_server::adapter::{spawn_server, ServerConfig, PROTOCOL_VERSION};

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send(&mut self, msg: Value) {
        let mut line = msg.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn send_raw(&mut self, raw: &str) {
        self.writer.write_all(raw.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timeout waiting for line")
            .expect("io error")
            .expect("expected line");
        serde_json::from_str(&line).expect("invalid json")
    }

    /// Read until a message matches, returning everything read
    async fn recv_until(&mut self, pred: impl Fn(&Value) -> bool) -> Vec<Value> {
        let mut seen = Vec::new();
        loop {
            let msg = self.recv().await;
            let done = pred(&msg);
            seen.push(msg);
            if done {
                return seen;
            }
        }
    }

    async fn join(&mut self, seq: u64, name: &str) -> Value {
        self.send(json!({
            "type": "join",
            "seq": seq,
            "ts": 0,
            "name": name,
            "protocol_version": PROTOCOL_VERSION,
        }))
        .await;
        self.recv().await
    }
}

fn is_event(msg: &Value, kind: &str) -> bool {
    msg["type"] == "event" && msg["event"]["kind"] == kind
}

async fn start_server(dice_seed: Option<u64>) -> SocketAddr {
    let config = ServerConfig {
        port: 0,
        dice_seed,
        ..ServerConfig::default()
    };
    let (addr, _handle) = spawn_server(config).await.unwrap();
    addr
}

#[tokio::test]
async fn test_join_welcome_and_waiting() {
    let addr = start_server(Some(1)).await;
    let mut ana = Client::connect(addr).await;

    let welcome = ana.join(1, "ana").await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["seq"], 1);
    assert_eq!(welcome["color"], "red");
    assert_eq!(welcome["player_id"], 1);
    assert_eq!(welcome["protocol_version"], PROTOCOL_VERSION);

    let waiting = ana.recv().await;
    assert!(is_event(&waiting, "waiting_for_players"));
    assert_eq!(waiting["event"]["count"], 1);
    assert_eq!(waiting["event"]["required"], 2);
}

#[tokio::test]
async fn test_intent_before_join_is_rejected() {
    let addr = start_server(None).await;
    let mut client = Client::connect(addr).await;

    client.send(json!({"type": "roll", "seq": 1, "ts": 0})).await;
    let err = client.recv().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "join_required");
    assert_eq!(err["seq"], 1);
}

#[tokio::test]
async fn test_invalid_lines_and_stale_seq() {
    let addr = start_server(None).await;
    let mut client = Client::connect(addr).await;

    client.send_raw(r#"{"type":"move","seq":4,"piece":"x"}"#).await;
    let err = client.recv().await;
    assert_eq!(err["code"], "invalid_message");
    assert_eq!(err["seq"], 4);

    client.send(json!({"type": "dance", "seq": 5})).await;
    let err = client.recv().await;
    assert_eq!(err["code"], "invalid_message");
    assert_eq!(err["seq"], 5);

    let welcome = client.join(6, "ana").await;
    assert_eq!(welcome["type"], "welcome");
    let _waiting = client.recv().await;

    client.send(json!({"type": "start", "seq": 6})).await;
    let err = client.recv().await;
    assert_eq!(err["code"], "invalid_sequence");
}

#[tokio::test]
async fn test_protocol_mismatch_closes_connection() {
    let addr = start_server(None).await;
    let mut client = Client::connect(addr).await;
    client
        .send(json!({"type": "join", "seq": 1, "name": "ana", "protocol_version": "9.0.0"}))
        .await;
    let err = client.recv().await;
    assert_eq!(err["code"], "protocol_mismatch");

    let next = tokio::time::timeout(Duration::from_secs(2), client.lines.next_line())
        .await
        .expect("timeout waiting for close")
        .expect("io error");
    assert!(next.is_none());
}

#[tokio::test]
async fn test_two_players_start_determine_and_play() {
    let addr = start_server(Some(11)).await;
    let mut ana = Client::connect(addr).await;
    let mut bo = Client::connect(addr).await;

    ana.join(1, "ana").await;
    ana.recv().await;
    let welcome = bo.join(1, "bo").await;
    assert_eq!(welcome["color"], "blue");
    bo.recv().await;
    // Ana also sees Bo's waiting update.
    let waiting = ana.recv().await;
    assert_eq!(waiting["event"]["count"], 2);

    // Only the admin may start.
    bo.send(json!({"type": "start", "seq": 2})).await;
    let err = bo.recv().await;
    assert_eq!(err["code"], "not_admin");
    assert_eq!(err["kind"], "illegal_action");

    ana.send(json!({"type": "start", "seq": 2})).await;
    assert_eq!(ana.recv().await["type"], "ack");
    assert!(is_event(&ana.recv().await, "determination_started"));
    assert!(is_event(&bo.recv().await, "determination_started"));

    ana.send(json!({"type": "determine_roll", "seq": 3, "d1": 6, "d2": 6}))
        .await;
    assert_eq!(ana.recv().await["type"], "ack");
    let ana_roll = bo.recv().await;
    assert!(is_event(&ana_roll, "determination_roll_result"));
    assert_eq!(ana_roll["event"]["sum"], 12);
    assert_eq!(ana_roll["event"]["next"], "blue");
    bo.send(json!({"type": "determine_roll", "seq": 3, "d1": 1, "d2": 2}))
        .await;
    let seen = bo.recv_until(|m| is_event(m, "turn_changed")).await;
    assert_eq!(seen[0]["type"], "ack");
    let started = seen
        .iter()
        .find(|m| is_event(m, "match_started"))
        .expect("match started");
    assert_eq!(started["event"]["players"][0]["color"], "red");
    assert_eq!(seen.last().unwrap()["event"]["color"], "red");

    let ana_seen = ana.recv_until(|m| is_event(m, "turn_changed")).await;
    assert!(ana_seen.iter().any(|m| is_event(m, "determination_finished")));

    // Not Bo's turn.
    bo.send(json!({"type": "roll", "seq": 4})).await;
    let err = bo.recv().await;
    assert_eq!(err["code"], "not_your_turn");

    ana.send(json!({"type": "roll", "seq": 4})).await;
    assert_eq!(ana.recv().await["type"], "ack");
    let rolled = ana.recv().await;
    assert!(is_event(&rolled, "dice_rolled"));
    assert_eq!(rolled["event"]["color"], "red");
    let bo_rolled = bo.recv().await;
    assert_eq!(bo_rolled["event"], rolled["event"]);
}

#[tokio::test]
async fn test_disconnect_promotes_admin_and_reports_departure() {
    let addr = start_server(None).await;
    let mut ana = Client::connect(addr).await;
    let mut bo = Client::connect(addr).await;

    ana.join(1, "ana").await;
    ana.recv().await;
    bo.join(1, "bo").await;
    bo.recv().await;
    ana.recv().await;

    drop(ana);

    let seen = bo.recv_until(|m| is_event(m, "waiting_for_players")).await;
    assert!(seen
        .iter()
        .any(|m| is_event(m, "player_left") && m["event"]["color"] == "red"));
    assert!(seen
        .iter()
        .any(|m| is_event(m, "admin_changed") && m["event"]["color"] == "blue"));
    assert_eq!(seen.last().unwrap()["event"]["count"], 1);

    // Bo is admin now, but alone.
    bo.send(json!({"type": "start", "seq": 2})).await;
    let err = bo.recv().await;
    assert_eq!(err["code"], "not_enough_players");
}

#[tokio::test]
async fn test_state_lists_free_colors_before_joining() {
    let addr = start_server(None).await;
    let mut ana = Client::connect(addr).await;
    let mut watcher = Client::connect(addr).await;

    watcher.send(json!({"type": "state", "seq": 1})).await;
    let state = watcher.recv().await;
    assert_eq!(state["type"], "state");
    assert_eq!(state["seq"], 1);
    assert_eq!(state["phase"], "awaiting_players");
    assert!(state.get("match_id").is_none());
    assert_eq!(
        state["available_colors"],
        json!(["red", "blue", "yellow", "green"])
    );

    ana.send(json!({"type": "join", "seq": 1, "name": "ana", "color": "amarillo"}))
        .await;
    assert_eq!(ana.recv().await["color"], "yellow");

    watcher.send(json!({"type": "state", "seq": 2})).await;
    let state = watcher.recv().await;
    assert_eq!(state["match_id"], 1);
    assert_eq!(state["available_colors"], json!(["red", "blue", "green"]));
    assert_eq!(state["players"][0]["name"], "ana");
    assert_eq!(state["players"][0]["is_admin"], true);
    assert_eq!(state["players"][0]["pieces"][0]["zone"], "jail");
}

#[tokio::test]
async fn test_release_one_and_state_after_start() {
    let addr = start_server(Some(5)).await;
    let mut ana = Client::connect(addr).await;
    let mut bo = Client::connect(addr).await;

    ana.join(1, "ana").await;
    ana.recv().await;
    bo.join(1, "bo").await;
    bo.recv().await;
    ana.recv().await;

    ana.send(json!({"type": "start", "seq": 2})).await;
    ana.recv_until(|m| is_event(m, "determination_started")).await;
    ana.send(json!({"type": "determine_roll", "seq": 3, "d1": 6, "d2": 6}))
        .await;
    bo.recv_until(|m| is_event(m, "determination_roll_result")).await;
    bo.send(json!({"type": "determine_roll", "seq": 2, "d1": 1, "d2": 2}))
        .await;
    ana.recv_until(|m| is_event(m, "turn_changed")).await;

    // Missing piece index.
    ana.send(json!({"type": "release_one", "seq": 4})).await;
    let err = ana.recv().await;
    assert_eq!(err["code"], "invalid_message");

    ana.send(json!({"type": "release_one", "seq": 5, "piece": 0}))
        .await;
    let err = ana.recv().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "dice_not_rolled");
    assert_eq!(err["kind"], "protocol_violation");

    ana.send(json!({"type": "state", "seq": 6})).await;
    let state = ana.recv().await;
    assert_eq!(state["phase"], "awaiting_roll");
    assert_eq!(state["current"], "red");
    assert_eq!(state["available_colors"], json!([]));
    assert_eq!(state["players"][1]["color"], "blue");
    assert!(state.get("dice").is_none());
}
