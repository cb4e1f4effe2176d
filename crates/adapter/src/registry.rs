//! Connection registry
//!
//! Tracks every open connection, the seat it holds and the channel feeding
//! its writer task. Events produced by a match are turned into lines once and
//! pushed to the connections in their audience.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error};

use crate::engine::Outbound;
use crate::protocol::create_event;
use crate::types::{ConnectionId, PlayerId};

/// Seat held by a connection: the match it joined and its player id there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    pub match_id: u64,
    pub player: PlayerId,
}

/// Handle to a connected client
#[derive(Debug)]
pub struct ClientHandle {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub seat: Option<Seat>,
    pub last_seq: Option<u64>,
    pub tx: mpsc::UnboundedSender<String>,
}

#[derive(Debug, Default)]
pub struct Registry {
    clients: RwLock<Vec<ClientHandle>>,
    event_seq: AtomicU64,
}

/// Serialize one protocol message into a line (without the newline)
pub fn to_line<T: Serialize>(msg: &T) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(line) => Some(line),
        Err(err) => {
            error!(%err, "failed to serialize outbound message");
            None
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        id: ConnectionId,
        addr: SocketAddr,
        tx: mpsc::UnboundedSender<String>,
    ) {
        let mut clients = self.clients.write().await;
        clients.push(ClientHandle {
            id,
            addr,
            seat: None,
            last_seq: None,
            tx,
        });
    }

    /// Forget a connection, returning the seat it held
    pub async fn unregister(&self, id: ConnectionId) -> Option<Seat> {
        let mut clients = self.clients.write().await;
        let idx = clients.iter().position(|c| c.id == id)?;
        let client = clients.remove(idx);
        debug!(connection = id.0, addr = %client.addr, "connection unregistered");
        client.seat
    }

    pub async fn bind(&self, id: ConnectionId, seat: Seat) {
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.iter_mut().find(|c| c.id == id) {
            client.seat = Some(seat);
        }
    }

    /// Record `seq` if it is strictly greater than the last one seen
    pub async fn check_and_update_seq(&self, id: ConnectionId, seq: u64) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == id) else {
            return true;
        };
        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }

    /// Push events of `match_id` to every connection in their audience
    ///
    /// Each event gets the next server sequence number, so callers must
    /// dispatch in the order the engine produced the events.
    pub async fn dispatch(&self, match_id: u64, outbound: &[Outbound]) {
        if outbound.is_empty() {
            return;
        }
        let clients = self.clients.read().await;
        for out in outbound {
            let seq = self.event_seq.fetch_add(1, Ordering::Relaxed) + 1;
            let Some(line) = to_line(&create_event(seq, &out.event)) else {
                continue;
            };
            let mut delivered = 0usize;
            for client in clients.iter() {
                let Some(seat) = client.seat else {
                    continue;
                };
                if seat.match_id != match_id || !out.audience.includes(seat.player) {
                    continue;
                }
                if client.tx.send(line.clone()).is_ok() {
                    delivered += 1;
                }
            }
            debug!(match_id, event = out.event.name(), delivered, "event dispatched");
        }
    }
}
