//! Adapter module - match clients over a TCP socket with a JSON protocol
//!
//! Players connect over TCP and drive the shared match with line-delimited
//! JSON. Every connection task calls into the same
//! [`MatchSession`](crate::engine::MatchSession); events are written back
//! after the engine lock is released.
//!
//! # Protocol Overview
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7878)
//! 2. **Join**: Client sends `join`, server responds with `welcome`
//! 3. **Admin**: The first player in a match may `start` it
//! 4. **Events**: Every state change is pushed as an `event` message
//! 5. **Intents**: Each intent is answered with `ack` or `error`
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **join**: Take a seat, optionally asking for a color
//! - **state**: Ask for the board and the free colors (no seat needed)
//! - **start**, **determine_roll**, **roll**, **release_all**, **release_one**,
//!   **move**, **choose_bonus**: Match intents
//!
//! ## Server → Client
//!
//! - **welcome**: Seat assignment (player id and color)
//! - **event**: One engine event
//! - **state**: Seats, pieces, dice and free colors
//! - **ack**: Intent accepted
//! - **error**: Rejection with `code`, `kind` and `message`
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"join","seq":1,"ts":1700000000000,"name":"ana","protocol_version":"1.0.0"}
//! Server -> Client: {"type":"welcome","seq":1,"ts":...,"protocol_version":"1.0.0","match_id":1,"player_id":1,"color":"red","name":"ana"}
//! Server -> Client: {"type":"event","seq":1,"ts":...,"event":{"kind":"waiting_for_players","count":1,"required":2}}
//! Client -> Server: {"type":"roll","seq":2,"ts":1700000000100}
//! Server -> Client: {"type":"error","seq":2,"ts":...,"code":"match_not_started","kind":"protocol_violation","message":"..."}
//! ```

pub mod protocol;
pub mod registry;
pub mod server;

pub use parchis_core as core;
pub use parchis_engine as engine;
pub use parchis_types as types;

pub use protocol::{
    parse_message, ClientBody, ClientMessage, ErrorCode, ErrorKind, ParsedMessage, Request,
    StateMessage, WireEvent, PROTOCOL_VERSION,
};
pub use server::{run_server, spawn_server, ServerConfig};
