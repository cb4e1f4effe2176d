//! Events emitted by engine operations
//!
//! Events are the only output of a successful mutation. The transport decides
//! who receives each one; [`crate::snapshot::EventReplay`] rebuilds the engine
//! snapshot from the full stream.

use crate::types::{CapturedPiece, Color, MoveAction, PieceLocation, PlayerId};

/// Public view of a seated player
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub color: Color,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Sent to the joining player only
    Welcome {
        player: PlayerId,
        color: Color,
        name: String,
    },
    WaitingForPlayers {
        count: usize,
        required: usize,
    },
    DeterminationStarted,
    DeterminationRollResult {
        color: Color,
        d1: u8,
        d2: u8,
        sum: u8,
        next: Option<Color>,
    },
    DeterminationTie {
        tied: Vec<Color>,
        sum: u8,
    },
    DeterminationFinished {
        order: Vec<Color>,
    },
    /// Players in turn order
    MatchStarted {
        players: Vec<PlayerInfo>,
    },
    TurnChanged {
        color: Color,
    },
    DiceRolled {
        color: Color,
        d1: u8,
        d2: u8,
        sum: u8,
        is_double: bool,
    },
    TokenMoved {
        color: Color,
        piece: u8,
        from: PieceLocation,
        to: PieceLocation,
        action: MoveAction,
    },
    TokensCaptured {
        by: Color,
        captured: Vec<CapturedPiece>,
    },
    /// Sent to the roller only
    BonusOffered {
        color: Color,
        eligible: Vec<u8>,
    },
    MatchWon {
        color: Color,
    },
    PlayerLeft {
        color: Color,
    },
    AdminChanged {
        color: Color,
    },
    /// Winners in finishing order, then whoever was left
    MatchFinished {
        ranking: Vec<Color>,
    },
    /// The roll could not be used and the turn was passed on
    TurnPassed {
        color: Color,
    },
}

impl GameEvent {
    /// Stable event name used on the wire and in logs
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::Welcome { .. } => "welcome",
            GameEvent::WaitingForPlayers { .. } => "waiting_for_players",
            GameEvent::DeterminationStarted => "determination_started",
            GameEvent::DeterminationRollResult { .. } => "determination_roll_result",
            GameEvent::DeterminationTie { .. } => "determination_tie",
            GameEvent::DeterminationFinished { .. } => "determination_finished",
            GameEvent::MatchStarted { .. } => "match_started",
            GameEvent::TurnChanged { .. } => "turn_changed",
            GameEvent::DiceRolled { .. } => "dice_rolled",
            GameEvent::TokenMoved { .. } => "token_moved",
            GameEvent::TokensCaptured { .. } => "tokens_captured",
            GameEvent::BonusOffered { .. } => "bonus_offered",
            GameEvent::MatchWon { .. } => "match_won",
            GameEvent::PlayerLeft { .. } => "player_left",
            GameEvent::AdminChanged { .. } => "admin_changed",
            GameEvent::MatchFinished { .. } => "match_finished",
            GameEvent::TurnPassed { .. } => "turn_passed",
        }
    }
}
