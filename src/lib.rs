//! Parchis match server (workspace facade crate).
//!
//! Re-exports the workspace crates under one name so binaries and
//! integration tests can use `parchis_server::{core,engine,adapter,types}`.

pub use parchis_adapter as adapter;
pub use parchis_core as core;
pub use parchis_engine as engine;
pub use parchis_types as types;
