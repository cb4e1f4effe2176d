//! Rejection taxonomy for engine operations
//!
//! Every public operation either succeeds or fails with an [`EngineError`]
//! without touching state. Each reason has a stable snake_case `code()` used
//! on the wire.

use thiserror::Error;

use crate::types::{Color, DieSelector};

/// An intent arrived in a state that does not expect it
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("the match has already started")]
    MatchAlreadyStarted,
    #[error("the match has not started yet")]
    MatchNotStarted,
    #[error("the match is finished")]
    MatchFinished,
    #[error("turn order determination is not running")]
    DeterminationNotActive,
    #[error("turn order determination is in progress")]
    DeterminationInProgress,
    #[error("the dice were already rolled this turn")]
    DiceAlreadyRolled,
    #[error("the dice have not been rolled")]
    DiceNotRolled,
    #[error("the triple doubles bonus must be resolved first")]
    BonusPending,
    #[error("no triple doubles bonus is active")]
    NoBonusActive,
    #[error("releasing from jail is only allowed right after a double")]
    ReleaseNotAllowed,
    #[error("an action was already taken with this roll")]
    ActionAlreadyTaken,
}

impl ProtocolViolation {
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolViolation::MatchAlreadyStarted => "match_already_started",
            ProtocolViolation::MatchNotStarted => "match_not_started",
            ProtocolViolation::MatchFinished => "match_finished",
            ProtocolViolation::DeterminationNotActive => "determination_not_active",
            ProtocolViolation::DeterminationInProgress => "determination_in_progress",
            ProtocolViolation::DiceAlreadyRolled => "dice_already_rolled",
            ProtocolViolation::DiceNotRolled => "dice_not_rolled",
            ProtocolViolation::BonusPending => "bonus_pending",
            ProtocolViolation::NoBonusActive => "no_bonus_active",
            ProtocolViolation::ReleaseNotAllowed => "release_not_allowed",
            ProtocolViolation::ActionAlreadyTaken => "action_already_taken",
        }
    }
}

/// Turn, ownership or rule violation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IllegalAction {
    #[error("unknown player")]
    UnknownPlayer,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("only the admin can do that")]
    NotAdmin,
    #[error("the match is full")]
    MatchFull,
    #[error("color {0} is already taken")]
    ColorTaken(Color),
    #[error("player name must not be empty")]
    InvalidName,
    #[error("need at least {need} players, have {have}")]
    NotEnoughPlayers { have: usize, need: usize },
    #[error("you already rolled in this determination round")]
    AlreadyRolled,
    #[error("you are not expected to roll in this determination round")]
    NotExpectedToRoll,
    #[error("die value {0} is outside 1..=6")]
    InvalidDieValue(u8),
    #[error("piece {0} does not exist")]
    InvalidPiece(u8),
    #[error("the piece is in jail")]
    PieceJailed,
    #[error("the piece is not in jail")]
    PieceNotJailed,
    #[error("the piece is already home")]
    PieceAlreadyHome,
    #[error("the move overshoots home")]
    Overshoot,
    #[error("the {} die was already used", .0.as_str())]
    DieAlreadyUsed(DieSelector),
    #[error("your only movable piece must use the sum of both dice")]
    SumRequired,
    #[error("pieces in the home lane cannot use the dice sum")]
    SumNotAllowedInHomeLane,
    #[error("you have no pieces in jail")]
    NoJailedPieces,
    #[error("that piece cannot take the bonus")]
    PieceNotEligibleForBonus,
}

impl IllegalAction {
    pub fn code(&self) -> &'static str {
        match self {
            IllegalAction::UnknownPlayer => "unknown_player",
            IllegalAction::NotYourTurn => "not_your_turn",
            IllegalAction::NotAdmin => "not_admin",
            IllegalAction::MatchFull => "match_full",
            IllegalAction::ColorTaken(_) => "color_taken",
            IllegalAction::InvalidName => "invalid_name",
            IllegalAction::NotEnoughPlayers { .. } => "not_enough_players",
            IllegalAction::AlreadyRolled => "already_rolled",
            IllegalAction::NotExpectedToRoll => "not_expected_to_roll",
            IllegalAction::InvalidDieValue(_) => "invalid_die_value",
            IllegalAction::InvalidPiece(_) => "invalid_piece",
            IllegalAction::PieceJailed => "piece_jailed",
            IllegalAction::PieceNotJailed => "piece_not_jailed",
            IllegalAction::PieceAlreadyHome => "piece_already_home",
            IllegalAction::Overshoot => "overshoot",
            IllegalAction::DieAlreadyUsed(_) => "die_already_used",
            IllegalAction::SumRequired => "sum_required",
            IllegalAction::SumNotAllowedInHomeLane => "sum_not_allowed_in_home_lane",
            IllegalAction::NoJailedPieces => "no_jailed_pieces",
            IllegalAction::PieceNotEligibleForBonus => "piece_not_eligible_for_bonus",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
    #[error(transparent)]
    Illegal(#[from] IllegalAction),
    /// Internal inconsistency; fatal to the operation that found it
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    /// Stable wire code for the rejection reason
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Protocol(p) => p.code(),
            EngineError::Illegal(i) => i.code(),
            EngineError::Invariant(_) => "internal_error",
        }
    }

    /// Error class: `protocol_violation`, `illegal_action` or `invariant_violation`
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Protocol(_) => "protocol_violation",
            EngineError::Illegal(_) => "illegal_action",
            EngineError::Invariant(_) => "invariant_violation",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_kinds() {
        let err: EngineError = IllegalAction::NotYourTurn.into();
        assert_eq!(err.code(), "not_your_turn");
        assert_eq!(err.kind(), "illegal_action");

        let err: EngineError = ProtocolViolation::DiceNotRolled.into();
        assert_eq!(err.code(), "dice_not_rolled");
        assert_eq!(err.kind(), "protocol_violation");

        let err = EngineError::Invariant("turn index out of range".into());
        assert_eq!(err.kind(), "invariant_violation");
    }

    #[test]
    fn test_messages_are_readable() {
        let err = EngineError::from(IllegalAction::DieAlreadyUsed(DieSelector::Second));
        assert_eq!(err.to_string(), "the second die was already used");
        let err = EngineError::from(IllegalAction::ColorTaken(Color::Blue));
        assert_eq!(err.to_string(), "color blue is already taken");
    }
}
