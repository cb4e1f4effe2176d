//! JSON protocol types for the match server
//!
//! Every line on the socket is one JSON object with `type`, `seq` and `ts`.
//! Events are carried inside `event` messages as [`WireEvent`], a serde
//! mirror of [`GameEvent`] that converts losslessly in both directions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{EngineError, GameEvent, Phase, PlayerInfo, PlayerSnapshot};
use crate::engine::{Intent, MatchView};
use crate::types::{
    CapturedPiece, Color, DiceRoll, DieSelector, MoveAction, PieceLocation, PlayerId,
};

pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Protocol versions with the same major number are compatible
pub fn is_compatible_version(server: &str, client: &str) -> bool {
    let major = |v: &str| v.split('.').next().map(str::to_string);
    major(server).is_some_and(|m| Some(m) == major(client))
}

// ============== Shared Wire Types ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireColor {
    #[serde(alias = "rojo")]
    Red,
    #[serde(alias = "azul")]
    Blue,
    #[serde(alias = "amarillo")]
    Yellow,
    #[serde(alias = "verde")]
    Green,
}

impl From<Color> for WireColor {
    fn from(color: Color) -> Self {
        match color {
            Color::Red => WireColor::Red,
            Color::Blue => WireColor::Blue,
            Color::Yellow => WireColor::Yellow,
            Color::Green => WireColor::Green,
        }
    }
}

impl From<WireColor> for Color {
    fn from(color: WireColor) -> Self {
        match color {
            WireColor::Red => Color::Red,
            WireColor::Blue => Color::Blue,
            WireColor::Yellow => Color::Yellow,
            WireColor::Green => Color::Green,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireDie {
    #[serde(rename = "first", alias = "1")]
    First,
    #[serde(rename = "second", alias = "2")]
    Second,
    #[serde(rename = "sum", alias = "3")]
    Sum,
}

impl From<DieSelector> for WireDie {
    fn from(die: DieSelector) -> Self {
        match die {
            DieSelector::First => WireDie::First,
            DieSelector::Second => WireDie::Second,
            DieSelector::Sum => WireDie::Sum,
        }
    }
}

impl From<WireDie> for DieSelector {
    fn from(die: WireDie) -> Self {
        match die {
            WireDie::First => DieSelector::First,
            WireDie::Second => DieSelector::Second,
            WireDie::Sum => DieSelector::Sum,
        }
    }
}

/// Piece location as `{"zone":"main","cell":12}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "zone", rename_all = "snake_case")]
pub enum WireLocation {
    Jail,
    Main { cell: u8 },
    Lane { cell: u8 },
    Home,
}

impl From<PieceLocation> for WireLocation {
    fn from(location: PieceLocation) -> Self {
        match location {
            PieceLocation::Jail => WireLocation::Jail,
            PieceLocation::Main(cell) => WireLocation::Main { cell },
            PieceLocation::Lane(cell) => WireLocation::Lane { cell },
            PieceLocation::Home => WireLocation::Home,
        }
    }
}

impl From<WireLocation> for PieceLocation {
    fn from(location: WireLocation) -> Self {
        match location {
            WireLocation::Jail => PieceLocation::Jail,
            WireLocation::Main { cell } => PieceLocation::Main(cell),
            WireLocation::Lane { cell } => PieceLocation::Lane(cell),
            WireLocation::Home => PieceLocation::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireMoveAction {
    #[serde(rename = "move_first")]
    MoveFirst,
    #[serde(rename = "move_second")]
    MoveSecond,
    #[serde(rename = "move_sum")]
    MoveSum,
    #[serde(rename = "release")]
    Release,
    #[serde(rename = "bonus")]
    Bonus,
}

impl From<MoveAction> for WireMoveAction {
    fn from(action: MoveAction) -> Self {
        match action {
            MoveAction::Move(DieSelector::First) => WireMoveAction::MoveFirst,
            MoveAction::Move(DieSelector::Second) => WireMoveAction::MoveSecond,
            MoveAction::Move(DieSelector::Sum) => WireMoveAction::MoveSum,
            MoveAction::Release => WireMoveAction::Release,
            MoveAction::Bonus => WireMoveAction::Bonus,
        }
    }
}

impl From<WireMoveAction> for MoveAction {
    fn from(action: WireMoveAction) -> Self {
        match action {
            WireMoveAction::MoveFirst => MoveAction::Move(DieSelector::First),
            WireMoveAction::MoveSecond => MoveAction::Move(DieSelector::Second),
            WireMoveAction::MoveSum => MoveAction::Move(DieSelector::Sum),
            WireMoveAction::Release => MoveAction::Release,
            WireMoveAction::Bonus => MoveAction::Bonus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePlayer {
    pub id: u32,
    pub color: WireColor,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCaptured {
    pub color: WireColor,
    pub piece: u8,
}

/// Wire form of [`GameEvent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireEvent {
    Welcome {
        player_id: u32,
        color: WireColor,
        name: String,
    },
    WaitingForPlayers {
        count: usize,
        required: usize,
    },
    DeterminationStarted,
    DeterminationRollResult {
        color: WireColor,
        d1: u8,
        d2: u8,
        sum: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next: Option<WireColor>,
    },
    DeterminationTie {
        tied: Vec<WireColor>,
        sum: u8,
    },
    DeterminationFinished {
        order: Vec<WireColor>,
    },
    MatchStarted {
        players: Vec<WirePlayer>,
    },
    TurnChanged {
        color: WireColor,
    },
    DiceRolled {
        color: WireColor,
        d1: u8,
        d2: u8,
        sum: u8,
        is_double: bool,
    },
    TokenMoved {
        color: WireColor,
        piece: u8,
        from: WireLocation,
        to: WireLocation,
        action: WireMoveAction,
    },
    TokensCaptured {
        by: WireColor,
        captured: Vec<WireCaptured>,
    },
    BonusOffered {
        color: WireColor,
        eligible: Vec<u8>,
    },
    MatchWon {
        color: WireColor,
    },
    PlayerLeft {
        color: WireColor,
    },
    AdminChanged {
        color: WireColor,
    },
    MatchFinished {
        ranking: Vec<WireColor>,
    },
    TurnPassed {
        color: WireColor,
    },
}

fn wire_colors(colors: &[Color]) -> Vec<WireColor> {
    colors.iter().copied().map(WireColor::from).collect()
}

fn engine_colors(colors: Vec<WireColor>) -> Vec<Color> {
    colors.into_iter().map(Color::from).collect()
}

impl From<&GameEvent> for WireEvent {
    fn from(event: &GameEvent) -> Self {
        match event {
            GameEvent::Welcome {
                player,
                color,
                name,
            } => WireEvent::Welcome {
                player_id: player.0,
                color: (*color).into(),
                name: name.clone(),
            },
            GameEvent::WaitingForPlayers { count, required } => WireEvent::WaitingForPlayers {
                count: *count,
                required: *required,
            },
            GameEvent::DeterminationStarted => WireEvent::DeterminationStarted,
            GameEvent::DeterminationRollResult {
                color,
                d1,
                d2,
                sum,
                next,
            } => WireEvent::DeterminationRollResult {
                color: (*color).into(),
                d1: *d1,
                d2: *d2,
                sum: *sum,
                next: next.map(WireColor::from),
            },
            GameEvent::DeterminationTie { tied, sum } => WireEvent::DeterminationTie {
                tied: wire_colors(tied),
                sum: *sum,
            },
            GameEvent::DeterminationFinished { order } => WireEvent::DeterminationFinished {
                order: wire_colors(order),
            },
            GameEvent::MatchStarted { players } => WireEvent::MatchStarted {
                players: players
                    .iter()
                    .map(|p| WirePlayer {
                        id: p.id.0,
                        color: p.color.into(),
                        name: p.name.clone(),
                    })
                    .collect(),
            },
            GameEvent::TurnChanged { color } => WireEvent::TurnChanged {
                color: (*color).into(),
            },
            GameEvent::DiceRolled {
                color,
                d1,
                d2,
                sum,
                is_double,
            } => WireEvent::DiceRolled {
                color: (*color).into(),
                d1: *d1,
                d2: *d2,
                sum: *sum,
                is_double: *is_double,
            },
            GameEvent::TokenMoved {
                color,
                piece,
                from,
                to,
                action,
            } => WireEvent::TokenMoved {
                color: (*color).into(),
                piece: *piece,
                from: (*from).into(),
                to: (*to).into(),
                action: (*action).into(),
            },
            GameEvent::TokensCaptured { by, captured } => WireEvent::TokensCaptured {
                by: (*by).into(),
                captured: captured
                    .iter()
                    .map(|c| WireCaptured {
                        color: c.color.into(),
                        piece: c.piece,
                    })
                    .collect(),
            },
            GameEvent::BonusOffered { color, eligible } => WireEvent::BonusOffered {
                color: (*color).into(),
                eligible: eligible.clone(),
            },
            GameEvent::MatchWon { color } => WireEvent::MatchWon {
                color: (*color).into(),
            },
            GameEvent::PlayerLeft { color } => WireEvent::PlayerLeft {
                color: (*color).into(),
            },
            GameEvent::AdminChanged { color } => WireEvent::AdminChanged {
                color: (*color).into(),
            },
            GameEvent::MatchFinished { ranking } => WireEvent::MatchFinished {
                ranking: wire_colors(ranking),
            },
            GameEvent::TurnPassed { color } => WireEvent::TurnPassed {
                color: (*color).into(),
            },
        }
    }
}

impl From<WireEvent> for GameEvent {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::Welcome {
                player_id,
                color,
                name,
            } => GameEvent::Welcome {
                player: PlayerId(player_id),
                color: color.into(),
                name,
            },
            WireEvent::WaitingForPlayers { count, required } => {
                GameEvent::WaitingForPlayers { count, required }
            }
            WireEvent::DeterminationStarted => GameEvent::DeterminationStarted,
            WireEvent::DeterminationRollResult {
                color,
                d1,
                d2,
                sum,
                next,
            } => GameEvent::DeterminationRollResult {
                color: color.into(),
                d1,
                d2,
                sum,
                next: next.map(Color::from),
            },
            WireEvent::DeterminationTie { tied, sum } => GameEvent::DeterminationTie {
                tied: engine_colors(tied),
                sum,
            },
            WireEvent::DeterminationFinished { order } => GameEvent::DeterminationFinished {
                order: engine_colors(order),
            },
            WireEvent::MatchStarted { players } => GameEvent::MatchStarted {
                players: players
                    .into_iter()
                    .map(|p| PlayerInfo {
                        id: PlayerId(p.id),
                        color: p.color.into(),
                        name: p.name,
                    })
                    .collect(),
            },
            WireEvent::TurnChanged { color } => GameEvent::TurnChanged {
                color: color.into(),
            },
            WireEvent::DiceRolled {
                color,
                d1,
                d2,
                sum,
                is_double,
            } => GameEvent::DiceRolled {
                color: color.into(),
                d1,
                d2,
                sum,
                is_double,
            },
            WireEvent::TokenMoved {
                color,
                piece,
                from,
                to,
                action,
            } => GameEvent::TokenMoved {
                color: color.into(),
                piece,
                from: from.into(),
                to: to.into(),
                action: action.into(),
            },
            WireEvent::TokensCaptured { by, captured } => GameEvent::TokensCaptured {
                by: by.into(),
                captured: captured
                    .into_iter()
                    .map(|c| CapturedPiece {
                        color: c.color.into(),
                        piece: c.piece,
                    })
                    .collect(),
            },
            WireEvent::BonusOffered { color, eligible } => GameEvent::BonusOffered {
                color: color.into(),
                eligible,
            },
            WireEvent::MatchWon { color } => GameEvent::MatchWon {
                color: color.into(),
            },
            WireEvent::PlayerLeft { color } => GameEvent::PlayerLeft {
                color: color.into(),
            },
            WireEvent::AdminChanged { color } => GameEvent::AdminChanged {
                color: color.into(),
            },
            WireEvent::MatchFinished { ranking } => GameEvent::MatchFinished {
                ranking: engine_colors(ranking),
            },
            WireEvent::TurnPassed { color } => GameEvent::TurnPassed {
                color: color.into(),
            },
        }
    }
}

// ============== Client -> Server Messages ==============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    #[serde(flatten)]
    pub body: ClientBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientBody {
    Join {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<WireColor>,
        #[serde(default = "default_protocol_version")]
        protocol_version: String,
    },
    Start,
    /// Both dice or neither; without dice the server rolls
    DetermineRoll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d1: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d2: Option<u8>,
    },
    Roll,
    ReleaseAll,
    ReleaseOne {
        piece: u8,
    },
    Move {
        piece: u8,
        die: WireDie,
    },
    ChooseBonus {
        piece: u8,
    },
    /// Board state query; allowed before joining
    State,
}

const CLIENT_TYPES: [&str; 9] = [
    "join",
    "start",
    "determine_roll",
    "roll",
    "release_all",
    "release_one",
    "move",
    "choose_bonus",
    "state",
];

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

/// What a client message asks the server to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Join {
        name: String,
        color: Option<Color>,
        protocol_version: String,
    },
    State,
    Intent(Intent),
}

/// A well-formed message whose fields do not make sense together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("d1 and d2 must be sent together")]
    PartialRoll,
}

impl TryFrom<ClientBody> for Request {
    type Error = MessageError;

    fn try_from(body: ClientBody) -> Result<Self, Self::Error> {
        let intent = match body {
            ClientBody::Join {
                name,
                color,
                protocol_version,
            } => {
                return Ok(Request::Join {
                    name,
                    color: color.map(Color::from),
                    protocol_version,
                })
            }
            ClientBody::Start => Intent::Start,
            ClientBody::DetermineRoll { d1, d2 } => match (d1, d2) {
                (Some(d1), Some(d2)) => Intent::DetermineRoll(Some(DiceRoll::new(d1, d2))),
                (None, None) => Intent::DetermineRoll(None),
                _ => return Err(MessageError::PartialRoll),
            },
            ClientBody::Roll => Intent::RollDice,
            ClientBody::ReleaseAll => Intent::ReleaseAll,
            ClientBody::ReleaseOne { piece } => Intent::ReleaseOne { piece },
            ClientBody::Move { piece, die } => Intent::MoveToken {
                piece,
                die: die.into(),
            },
            ClientBody::ChooseBonus { piece } => Intent::ChooseBonus { piece },
            ClientBody::State => return Ok(Request::State),
        };
        Ok(Request::Intent(intent))
    }
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "event")]
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateType {
    #[serde(rename = "state")]
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

/// Rejections raised by the transport before an intent reaches the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    JoinRequired,
    AlreadyJoined,
    InvalidMessage,
    InvalidSequence,
    ProtocolMismatch,
}

impl ErrorCode {
    /// Wire code, as serialized
    pub fn code(self) -> String {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(code)) => code,
            _ => format!("{:?}", self),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProtocolViolation,
    IllegalAction,
    InvariantViolation,
}

impl From<&EngineError> for ErrorKind {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Protocol(_) => ErrorKind::ProtocolViolation,
            EngineError::Illegal(_) => ErrorKind::IllegalAction,
            EngineError::Invariant(_) => ErrorKind::InvariantViolation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WirePhase {
    AwaitingPlayers,
    DeterminingOrder,
    AwaitingRoll,
    AwaitingAction,
    Finished,
}

impl From<Phase> for WirePhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::AwaitingPlayers => WirePhase::AwaitingPlayers,
            Phase::DeterminingOrder => WirePhase::DeterminingOrder,
            Phase::AwaitingRoll => WirePhase::AwaitingRoll,
            Phase::AwaitingAction => WirePhase::AwaitingAction,
            Phase::Finished => WirePhase::Finished,
        }
    }
}

/// One seat in a `state` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSeat {
    pub id: u32,
    pub color: WireColor,
    pub name: String,
    pub pieces: Vec<WireLocation>,
    pub is_admin: bool,
    pub finished: bool,
}

impl From<&PlayerSnapshot> for WireSeat {
    fn from(p: &PlayerSnapshot) -> Self {
        Self {
            id: p.id.0,
            color: p.color.into(),
            name: p.name.clone(),
            pieces: p.pieces.iter().copied().map(WireLocation::from).collect(),
            is_admin: p.is_admin,
            finished: p.finished,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDice {
    pub d1: u8,
    pub d2: u8,
}

/// Response to `state`: seats in turn order and the free colors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMessage {
    #[serde(rename = "type")]
    pub msg_type: StateType,
    pub seq: u64,
    pub ts: u64,
    /// Absent when no match is open yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<u64>,
    pub phase: WirePhase,
    pub players: Vec<WireSeat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<WireColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dice: Option<WireDice>,
    pub consecutive_doubles: u8,
    pub available_colors: Vec<WireColor>,
}

/// Response to `join`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub match_id: u64,
    pub player_id: u32,
    pub color: WireColor,
    pub name: String,
}

/// One engine event, in the order the engine produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub msg_type: EventType,
    pub seq: u64,
    pub ts: u64,
    pub event: WireEvent,
}

/// Intent accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

/// Intent rejected; the match state is unchanged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
}

// ============== Message Parsing ==============

/// Parse a JSON message from a string
///
/// A well-formed object with an unknown `type` parses as
/// [`ParsedMessage::Unknown`] rather than failing.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    match serde_json::from_str::<ClientMessage>(json) {
        Ok(m) => Ok(ParsedMessage::Client(m)),
        Err(e) => {
            #[derive(Debug, Deserialize)]
            struct Header {
                #[serde(rename = "type")]
                msg_type: Option<String>,
                seq: Option<u64>,
            }
            let header = serde_json::from_str::<Header>(json)?;
            let msg_type = header.msg_type.unwrap_or_default();
            if CLIENT_TYPES.contains(&msg_type.as_str()) {
                return Err(e);
            }
            Ok(ParsedMessage::Unknown(UnknownMessage {
                seq: header.seq.unwrap_or(0),
                msg_type,
            }))
        }
    }
}

/// Parsed incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    Client(ClientMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
    pub msg_type: String,
}

/// Pull `seq` out of a line that failed to parse
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

// ============== Utility Functions ==============

/// Create a client message (used by tests and tooling)
pub fn create_client_message(seq: u64, body: ClientBody) -> ClientMessage {
    ClientMessage {
        seq,
        ts: current_timestamp_ms(),
        body,
    }
}

pub fn create_welcome(
    seq: u64,
    protocol_version: &str,
    match_id: u64,
    player: PlayerId,
    color: Color,
    name: &str,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        match_id,
        player_id: player.0,
        color: color.into(),
        name: name.to_string(),
    }
}

pub fn create_event(seq: u64, event: &GameEvent) -> EventMessage {
    EventMessage {
        msg_type: EventType::Event,
        seq,
        ts: current_timestamp_ms(),
        event: WireEvent::from(event),
    }
}

pub fn create_ack(seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    }
}

pub fn create_state(seq: u64, match_id: Option<u64>, view: &MatchView) -> StateMessage {
    StateMessage {
        msg_type: StateType::State,
        seq,
        ts: current_timestamp_ms(),
        match_id,
        phase: view.phase.into(),
        players: view.snapshot.players.iter().map(WireSeat::from).collect(),
        current: view.snapshot.current().map(WireColor::from),
        dice: view.snapshot.dice.map(|d| WireDice { d1: d.d1, d2: d.d2 }),
        consecutive_doubles: view.consecutive_doubles,
        available_colors: wire_colors(&view.available_colors),
    }
}

/// Transport-level rejection
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code: code.code(),
        kind: ErrorKind::ProtocolViolation,
        message: message.to_string(),
    }
}

/// Rejection reported by the match engine
pub fn create_engine_error(seq: u64, err: &EngineError) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code: err.code().to_string(),
        kind: ErrorKind::from(err),
        message: err.to_string(),
    }
}

/// Get current timestamp in milliseconds
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
