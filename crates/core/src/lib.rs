//! Core game logic module - pure, deterministic, and testable
//!
//! This module contains all the rules of the match: board topology, piece
//! movement, dice, captures, the turn-order roll-off and win detection.
//! It has **zero dependencies** on networking or I/O, making it:
//!
//! - **Deterministic**: Seeded or scripted dice reproduce a match exactly
//! - **Testable**: Unit tests for every rule and edge case
//! - **Atomic**: A rejected intent never changes state
//!
//! # Module Structure
//!
//! - [`board`]: 68-cell ring, exit/safe-entry cells per color, home lanes
//! - [`piece`]: Jailed / Active / HomeLane / Home state machine and movement
//! - [`player`]: A seat with its four pieces and admin/host flags
//! - [`rng`]: Dice sources (`StdRng`-backed and scripted)
//! - [`determination`]: Roll-off that fixes the initial turn order
//! - [`game_engine`]: Turn loop, dice bookkeeping, captures, bonus, wins
//! - [`event`]: Events returned by successful operations
//! - [`error`]: Rejection taxonomy with stable wire codes
//! - [`snapshot`]: Observable state and replay from the event stream
//!
//! # Example
//!
//! ```
//! use parchis_core::{GameEngine, ScriptedDice};
//! use parchis_types::{Color, ConnectionId, DiceRoll};
//!
//! let mut engine = GameEngine::new(Box::new(ScriptedDice::new([(3, 4)])));
//! let (red, _) = engine.join("ana", None, ConnectionId(1)).unwrap();
//! let (blue, _) = engine.join("bo", None, ConnectionId(2)).unwrap();
//!
//! engine.start(red).unwrap();
//! engine.determine_roll(red, Some(DiceRoll::new(6, 5))).unwrap();
//! engine.determine_roll(blue, Some(DiceRoll::new(2, 1))).unwrap();
//!
//! assert_eq!(engine.current_player().unwrap().color(), Color::Red);
//! engine.roll_dice(red).unwrap();
//! // Every piece is still in jail and the roll is not a double.
//! assert!(!engine.has_legal_action());
//! ```

pub mod board;
pub mod determination;
pub mod error;
pub mod event;
pub mod game_engine;
pub mod piece;
pub mod player;
pub mod rng;
pub mod snapshot;

pub use parchis_types as types;

// Re-export commonly used types for convenience
pub use board::Board;
pub use determination::{RoundOutcome, TurnDetermination};
pub use error::{EngineError, EngineResult, IllegalAction, ProtocolViolation};
pub use event::{GameEvent, PlayerInfo};
pub use game_engine::{GameEngine, LegalAction, Phase, UsedDice};
pub use piece::Piece;
pub use player::Player;
pub use rng::{DiceSource, ScriptedDice, SeededDice};
pub use snapshot::{EngineSnapshot, EventReplay, PlayerSnapshot};
