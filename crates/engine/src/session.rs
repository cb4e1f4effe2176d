//! Match session - the single lock around a rule engine
//!
//! Every connection task calls into one shared [`MatchSession`]. Each intent
//! takes the lock once, applies the intent and then its follow-ups (automatic
//! release, auto-pass, turn advance), routes the resulting events and releases
//! the lock before anything is written to a socket.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, error, warn};

use crate::core::{
    DiceSource, EngineError, EngineResult, EngineSnapshot, GameEngine, GameEvent, Phase, Player,
    SeededDice,
};
use crate::types::{Color, ConnectionId, DiceRoll, DieSelector, PlayerId, MIN_PLAYERS};

/// Per-match settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Release jailed pieces automatically after a sub-cap double
    pub auto_release: bool,
    /// Players required before the admin may start
    pub min_players: usize,
    /// Fixed dice seed for reproducible matches
    pub dice_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_release: true,
            min_players: MIN_PLAYERS,
            dice_seed: None,
        }
    }
}

/// Player intents other than joining
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Start,
    /// Determination roll; `None` lets the server roll
    DetermineRoll(Option<DiceRoll>),
    RollDice,
    ReleaseAll,
    ReleaseOne { piece: u8 },
    MoveToken { piece: u8, die: DieSelector },
    ChooseBonus { piece: u8 },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Start => "start",
            Intent::DetermineRoll(_) => "determine_roll",
            Intent::RollDice => "roll",
            Intent::ReleaseAll => "release_all",
            Intent::ReleaseOne { .. } => "release_one",
            Intent::MoveToken { .. } => "move",
            Intent::ChooseBonus { .. } => "choose_bonus",
        }
    }
}

/// Who should receive an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Only(PlayerId),
}

impl Audience {
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Audience::All => true,
            Audience::Only(target) => *target == player,
        }
    }
}

/// An event with its audience
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub audience: Audience,
    pub event: GameEvent,
}

/// What a state query reports about a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub phase: Phase,
    pub snapshot: EngineSnapshot,
    pub consecutive_doubles: u8,
    /// Colors a new player could still join as
    pub available_colors: Vec<Color>,
}

impl MatchView {
    /// View of a lobby nobody has joined yet
    pub fn empty() -> Self {
        Self {
            phase: Phase::AwaitingPlayers,
            snapshot: EngineSnapshot::default(),
            consecutive_doubles: 0,
            available_colors: Color::ALL.to_vec(),
        }
    }
}

#[derive(Debug)]
pub struct MatchSession {
    id: u64,
    config: SessionConfig,
    engine: Mutex<GameEngine>,
}

impl MatchSession {
    /// New session rolling `StdRng` dice (seeded from the config when set)
    pub fn new(id: u64, config: SessionConfig) -> Self {
        let dice: Box<dyn DiceSource> = match config.dice_seed {
            Some(seed) => Box::new(SeededDice::new(seed)),
            None => Box::new(SeededDice::from_entropy()),
        };
        Self::with_dice(id, config, dice)
    }

    pub fn with_dice(id: u64, config: SessionConfig, dice: Box<dyn DiceSource>) -> Self {
        let engine = GameEngine::new(dice).with_min_players(config.min_players);
        Self {
            id,
            config,
            engine: Mutex::new(engine),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, GameEngine> {
        self.engine.lock().unwrap_or_else(|poisoned| {
            warn!(session = self.id, "engine lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn join(
        &self,
        name: &str,
        preferred: Option<Color>,
        connection: ConnectionId,
    ) -> EngineResult<(PlayerId, Vec<Outbound>)> {
        let mut engine = self.lock();
        let (player, events) = engine.join(name, preferred, connection)?;
        Ok((player, route(&engine, events)))
    }

    /// Apply one intent and its follow-ups
    pub fn handle(&self, player: PlayerId, intent: Intent) -> EngineResult<Vec<Outbound>> {
        let mut engine = self.lock();
        let result = match intent {
            Intent::Start => engine.start(player),
            Intent::DetermineRoll(roll) => engine.determine_roll(player, roll),
            Intent::RollDice => engine.roll_dice(player),
            Intent::ReleaseAll => engine.release_all_from_jail(player),
            Intent::ReleaseOne { piece } => engine.release_from_jail(player, piece),
            Intent::MoveToken { piece, die } => engine.move_token(player, piece, die),
            Intent::ChooseBonus { piece } => engine.apply_triple_doubles_bonus(player, piece),
        };
        let mut events = match result {
            Ok(events) => events,
            Err(err) => {
                if let EngineError::Invariant(detail) = &err {
                    error!(session = self.id, intent = intent.name(), detail = %detail, "invariant violated");
                } else {
                    debug!(session = self.id, player = %player, intent = intent.name(), code = err.code(), "intent rejected");
                }
                return Err(err);
            }
        };
        self.run_follow_ups(&mut engine, &mut events);
        Ok(route(&engine, events))
    }

    /// Remove a player whose connection went away
    pub fn disconnect(&self, player: PlayerId) -> EngineResult<Vec<Outbound>> {
        let mut engine = self.lock();
        let mut events = engine.handle_disconnect(player)?;
        self.run_follow_ups(&mut engine, &mut events);
        Ok(route(&engine, events))
    }

    /// Automatic steps after a successful mutation, looped until the engine waits on a player
    fn run_follow_ups(&self, engine: &mut GameEngine, events: &mut Vec<GameEvent>) {
        loop {
            if engine.phase() != Phase::AwaitingAction || engine.bonus_active() {
                break;
            }
            if engine.should_advance_turn() {
                events.extend(engine.advance_turn());
                continue;
            }
            if self.config.auto_release && engine.can_release() {
                let Some(current) = engine.current_player().map(Player::id) else {
                    break;
                };
                match engine.release_all_from_jail(current) {
                    Ok(released) => {
                        events.extend(released);
                        continue;
                    }
                    Err(err) => {
                        error!(session = self.id, %err, "automatic release failed");
                        break;
                    }
                }
            }
            if !engine.has_legal_action() {
                events.extend(engine.force_advance_turn());
                continue;
            }
            break;
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.lock().snapshot()
    }

    /// Snapshot plus the lobby and turn details, read under one lock
    pub fn view(&self) -> MatchView {
        let engine = self.lock();
        MatchView {
            phase: engine.phase(),
            snapshot: engine.snapshot(),
            consecutive_doubles: engine.consecutive_doubles(),
            available_colors: engine.available_colors(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    pub fn is_finished(&self) -> bool {
        self.lock().match_finished()
    }

    pub fn player_count(&self) -> usize {
        self.lock().players().len()
    }

    /// Run `f` with exclusive access to the engine
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut GameEngine) -> R) -> R {
        let mut engine = self.lock();
        f(&mut engine)
    }
}

/// Attach an audience to every event
fn route(engine: &GameEngine, events: Vec<GameEvent>) -> Vec<Outbound> {
    events
        .into_iter()
        .map(|event| {
            let audience = match &event {
                GameEvent::Welcome { player, .. } => Audience::Only(*player),
                GameEvent::BonusOffered { color, .. } => engine
                    .player_by_color(*color)
                    .map_or(Audience::All, |p| Audience::Only(p.id())),
                _ => Audience::All,
            };
            Outbound { audience, event }
        })
        .collect()
}
