//! TCP server for match clients
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking; the match itself is driven synchronously
//! through [`MatchSession`] from each connection task.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::GameEvent;
use crate::engine::{MatchManager, MatchSession, MatchView, Outbound, SessionConfig};
use crate::protocol::*;
use crate::registry::{to_line, Registry, Seat};
use crate::types::{ConnectionId, PlayerId, MIN_PLAYERS};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub min_players: usize,
    pub auto_release: bool,
    pub dice_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            protocol_version: PROTOCOL_VERSION.to_string(),
            min_players: MIN_PLAYERS,
            auto_release: true,
            dice_seed: None,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            auto_release: self.auto_release,
            min_players: self.min_players,
            dice_seed: self.dice_seed,
        }
    }
}

/// Shared server state
#[derive(Debug)]
pub struct ServerState {
    config: ServerConfig,
    manager: MatchManager,
    registry: Registry,
    /// Held across a session call and its dispatch so clients see events in engine order
    order: Mutex<()>,
    next_connection: AtomicU64,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let manager = MatchManager::new(config.session_config());
        Self {
            config,
            manager,
            registry: Registry::new(),
            order: Mutex::new(()),
            next_connection: AtomicU64::new(0),
        }
    }
}

/// The match a connection has joined
#[derive(Debug, Clone)]
struct Joined {
    session: Arc<MatchSession>,
    player: PlayerId,
}

enum Flow {
    Continue,
    Close,
}

/// Start the TCP server
///
/// `ready_tx` receives the bound address once the listener is up, which lets
/// callers bind port 0.
pub async fn run_server(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, protocol = %config.protocol_version, "match server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(config));

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        let id = ConnectionId(state.next_connection.fetch_add(1, Ordering::Relaxed) + 1);
        info!(connection = id.0, %addr, "client connected");

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, addr, id, state).await {
                warn!(connection = id.0, error = %e, "client error");
            }
            info!(connection = id.0, "client disconnected");
        });
    }
}

/// Run the server on a background task and wait until it is listening
pub async fn spawn_server(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, JoinHandle<anyhow::Result<()>>)> {
    let (ready_tx, ready_rx) = oneshot::channel();
    let handle = tokio::spawn(run_server(config, Some(ready_tx)));
    match ready_rx.await {
        Ok(addr) => Ok((addr, handle)),
        Err(_) => match handle.await {
            Ok(Err(e)) => Err(e),
            Ok(Ok(())) => anyhow::bail!("server exited before listening"),
            Err(e) => Err(e.into()),
        },
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    id: ConnectionId,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    // Channel to send lines to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.registry.register(id, addr, tx.clone()).await;

    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut joined: Option<Joined> = None;
    let mut line = String::new();
    let result = loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(e) => break Err(e.into()),
        };
        if bytes_read == 0 {
            break Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(connection = id.0, line = trimmed, "received");

        if let Flow::Close = handle_line(&state, id, &tx, &mut joined, trimmed).await {
            break Ok(());
        }
    };

    state.registry.unregister(id).await;
    if let Some(joined) = joined {
        leave(&state, joined).await;
    }
    drop(tx);
    let _ = write_task.await;
    result
}

fn send<T: Serialize>(tx: &mpsc::UnboundedSender<String>, msg: &T) {
    if let Some(line) = to_line(msg) {
        let _ = tx.send(line);
    }
}

async fn handle_line(
    state: &ServerState,
    id: ConnectionId,
    tx: &mpsc::UnboundedSender<String>,
    joined: &mut Option<Joined>,
    line: &str,
) -> Flow {
    let msg = match parse_message(line) {
        Ok(ParsedMessage::Client(msg)) => msg,
        Ok(ParsedMessage::Unknown(unknown)) => {
            let message = format!("unknown message type '{}'", unknown.msg_type);
            send(tx, &create_error(unknown.seq, ErrorCode::InvalidMessage, &message));
            return Flow::Continue;
        }
        Err(e) => {
            let seq = extract_seq_best_effort(line).unwrap_or(0);
            send(tx, &create_error(seq, ErrorCode::InvalidMessage, &e.to_string()));
            return Flow::Continue;
        }
    };

    // Sequencing: enforce monotonic seq per sender.
    if !state.registry.check_and_update_seq(id, msg.seq).await {
        send(
            tx,
            &create_error(msg.seq, ErrorCode::InvalidSequence, "seq must be strictly increasing"),
        );
        return Flow::Continue;
    }

    let request = match Request::try_from(msg.body) {
        Ok(request) => request,
        Err(e) => {
            send(tx, &create_error(msg.seq, ErrorCode::InvalidMessage, &e.to_string()));
            return Flow::Continue;
        }
    };

    match request {
        Request::Join {
            name,
            color,
            protocol_version,
        } => {
            if !is_compatible_version(&state.config.protocol_version, &protocol_version) {
                let message = format!("Protocol version {} not supported", protocol_version);
                send(tx, &create_error(msg.seq, ErrorCode::ProtocolMismatch, &message));
                return Flow::Close;
            }
            if joined.as_ref().is_some_and(|j| !j.session.is_finished()) {
                send(
                    tx,
                    &create_error(msg.seq, ErrorCode::AlreadyJoined, "Already seated in a match"),
                );
                return Flow::Continue;
            }

            let _order = state.order.lock().await;
            let session = state.manager.session();
            match session.join(&name, color, id) {
                Ok((player, outbound)) => {
                    let seat = Seat {
                        match_id: session.id(),
                        player,
                    };
                    state.registry.bind(id, seat).await;
                    let (welcome, rest): (Vec<Outbound>, Vec<Outbound>) = outbound
                        .into_iter()
                        .partition(|o| matches!(o.event, GameEvent::Welcome { .. }));
                    for out in welcome {
                        if let GameEvent::Welcome { player, color, name } = &out.event {
                            send(
                                tx,
                                &create_welcome(
                                    msg.seq,
                                    &state.config.protocol_version,
                                    session.id(),
                                    *player,
                                    *color,
                                    name,
                                ),
                            );
                        }
                    }
                    info!(connection = id.0, match_id = session.id(), player = %player, "player joined");
                    state.registry.dispatch(session.id(), &rest).await;
                    *joined = Some(Joined { session, player });
                }
                Err(err) => {
                    warn!(connection = id.0, code = err.code(), "join rejected");
                    send(tx, &create_engine_error(msg.seq, &err));
                }
            }
        }
        Request::State => {
            let _order = state.order.lock().await;
            // A seated player sees its own match; anyone else sees the one they would join.
            let session = match joined.as_ref() {
                Some(j) => Some(Arc::clone(&j.session)),
                None => state.manager.current().filter(|s| !s.is_finished()),
            };
            let reply = match session {
                Some(session) => create_state(msg.seq, Some(session.id()), &session.view()),
                None => create_state(msg.seq, None, &MatchView::empty()),
            };
            send(tx, &reply);
        }
        Request::Intent(intent) => {
            let Some(current) = joined.as_ref() else {
                send(
                    tx,
                    &create_error(msg.seq, ErrorCode::JoinRequired, "Send join before playing"),
                );
                return Flow::Continue;
            };

            let _order = state.order.lock().await;
            match current.session.handle(current.player, intent) {
                Ok(outbound) => {
                    send(tx, &create_ack(msg.seq));
                    state
                        .registry
                        .dispatch(current.session.id(), &outbound)
                        .await;
                }
                Err(err) => {
                    warn!(
                        connection = id.0,
                        player = %current.player,
                        intent = intent.name(),
                        code = err.code(),
                        "intent rejected"
                    );
                    send(tx, &create_engine_error(msg.seq, &err));
                }
            }
        }
    }
    Flow::Continue
}

/// Remove a departed player from its match and tell the others
async fn leave(state: &ServerState, joined: Joined) {
    let _order = state.order.lock().await;
    match joined.session.disconnect(joined.player) {
        Ok(outbound) => {
            info!(match_id = joined.session.id(), player = %joined.player, "player left");
            state
                .registry
                .dispatch(joined.session.id(), &outbound)
                .await;
        }
        Err(err) => {
            debug!(match_id = joined.session.id(), player = %joined.player, code = err.code(), "disconnect ignored");
        }
    }
    state.manager.release_if_done(&joined.session);
}
