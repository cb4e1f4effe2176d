//! Game engine - the per-match turn, dice, movement and capture state machine
//!
//! The engine is the single source of truth for a match: seats and turn order,
//! the current dice, which dice are spent, and when the match ends. Every
//! public operation validates first and mutates second, so a rejected intent
//! leaves the engine untouched. Successful operations return the events they
//! produced; the caller decides who hears about them.
//!
//! # Phases
//!
//! ```text
//! AwaitingPlayers -> DeterminingOrder -> AwaitingRoll <-> AwaitingAction -> Finished
//! ```
//!
//! # Dice rules
//!
//! - A double earns another roll, unless it is the third in a row: then the
//!   player must send one piece straight Home and the turn passes.
//! - After a sub-cap double the player may release every jailed piece, or a
//!   single one, once and before moving.
//! - Each die is spent on one piece; the sum spends both and ends the roll.
//! - A player whose only movable piece is on the main track and not near home
//!   must use the sum.
//! - Pieces in the home lane never use the sum.
//! - When one die is left and no piece can use it, it is discarded.

use arrayvec::ArrayVec;
use tracing::{debug, info, warn};

use crate::board::Board;
use crate::determination::{RoundOutcome, TurnDetermination};
use crate::error::{EngineError, EngineResult, IllegalAction, ProtocolViolation};
use crate::event::{GameEvent, PlayerInfo};
use crate::piece::Piece;
use crate::player::Player;
use crate::rng::{DiceSource, SeededDice};
use crate::snapshot::{EngineSnapshot, PlayerSnapshot};
use crate::types::{
    CapturedPiece, Color, ConnectionId, DiceRoll, DieSelector, MoveAction, PieceLocation,
    PlayerId, MAX_DOUBLES_BEFORE_BONUS, MAX_PLAYERS, MIN_PLAYERS, PIECES_PER_PLAYER,
};

/// Where the match is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    AwaitingPlayers,
    DeterminingOrder,
    AwaitingRoll,
    AwaitingAction,
    Finished,
}

/// One thing the current player could legally do right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegalAction {
    Move { piece: u8, die: DieSelector },
    ReleaseAll,
    Release { piece: u8 },
    Bonus { piece: u8 },
}

/// Which individual dice have been spent this roll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UsedDice {
    pub first: bool,
    pub second: bool,
}

impl UsedDice {
    pub fn all(&self) -> bool {
        self.first && self.second
    }

    pub fn any(&self) -> bool {
        self.first || self.second
    }

    /// The single unspent die, if exactly one is left
    pub fn remaining(&self) -> Option<DieSelector> {
        match (self.first, self.second) {
            (true, false) => Some(DieSelector::Second),
            (false, true) => Some(DieSelector::First),
            _ => None,
        }
    }

    fn mark(&mut self, die: DieSelector) {
        match die {
            DieSelector::First => self.first = true,
            DieSelector::Second => self.second = true,
            DieSelector::Sum => {
                self.first = true;
                self.second = true;
            }
        }
    }

    /// First already-spent die the selector would need
    fn conflict(&self, die: DieSelector) -> Option<DieSelector> {
        let first = self.first.then_some(DieSelector::First);
        let second = self.second.then_some(DieSelector::Second);
        match die {
            DieSelector::First => first,
            DieSelector::Second => second,
            DieSelector::Sum => first.or(second),
        }
    }
}

#[derive(Debug)]
pub struct GameEngine {
    board: Board,
    /// Seats; after determination this is the turn order
    players: Vec<Player>,
    next_player_id: u32,
    min_players: usize,
    turn_index: usize,
    dice: DiceRoll,
    dice_rolled: bool,
    consecutive_doubles: u8,
    bonus_active: bool,
    /// The roll in play is a sub-cap double: the player rolls again afterwards
    extra_roll: bool,
    used_dice: UsedDice,
    action_taken: bool,
    must_advance: bool,
    match_started: bool,
    match_finished: bool,
    determination: TurnDetermination,
    /// Finishing order; completed with the remaining players when the match ends
    ranking: Vec<Color>,
    dice_source: Box<dyn DiceSource>,
}

impl GameEngine {
    /// Create an empty match rolling the given dice
    pub fn new(dice_source: Box<dyn DiceSource>) -> Self {
        Self {
            board: Board::new(),
            players: Vec::with_capacity(MAX_PLAYERS),
            next_player_id: 1,
            min_players: MIN_PLAYERS,
            turn_index: 0,
            dice: DiceRoll::new(1, 1),
            dice_rolled: false,
            consecutive_doubles: 0,
            bonus_active: false,
            extra_roll: false,
            used_dice: UsedDice::default(),
            action_taken: false,
            must_advance: false,
            match_started: false,
            match_finished: false,
            determination: TurnDetermination::new(),
            ranking: Vec::with_capacity(MAX_PLAYERS),
            dice_source,
        }
    }

    /// Create an empty match with `StdRng` dice seeded from `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self::new(Box::new(SeededDice::new(seed)))
    }

    /// Players required before the admin may start (clamped to 2..=4)
    pub fn with_min_players(mut self, min_players: usize) -> Self {
        self.min_players = min_players.clamp(MIN_PLAYERS, MAX_PLAYERS);
        self
    }

    // ============== Accessors ==============

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    pub fn player_by_color(&self, color: Color) -> Option<&Player> {
        self.players.iter().find(|p| p.color() == color)
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    /// Player holding the turn while the match is running
    pub fn current_player(&self) -> Option<&Player> {
        if !self.in_play() {
            return None;
        }
        self.players.get(self.turn_index)
    }

    /// Dice in play, if the current player has rolled
    pub fn dice(&self) -> Option<DiceRoll> {
        self.dice_rolled.then_some(self.dice)
    }

    pub fn dice_rolled(&self) -> bool {
        self.dice_rolled
    }

    pub fn consecutive_doubles(&self) -> u8 {
        self.consecutive_doubles
    }

    pub fn bonus_active(&self) -> bool {
        self.bonus_active
    }

    pub fn used_dice(&self) -> UsedDice {
        self.used_dice
    }

    pub fn action_taken(&self) -> bool {
        self.action_taken
    }

    pub fn must_advance(&self) -> bool {
        self.must_advance
    }

    pub fn match_started(&self) -> bool {
        self.match_started
    }

    pub fn match_finished(&self) -> bool {
        self.match_finished
    }

    pub fn determination(&self) -> &TurnDetermination {
        &self.determination
    }

    pub fn phase(&self) -> Phase {
        if self.match_finished {
            Phase::Finished
        } else if self.determination.is_active() {
            Phase::DeterminingOrder
        } else if !self.match_started {
            Phase::AwaitingPlayers
        } else if !self.dice_rolled {
            Phase::AwaitingRoll
        } else {
            Phase::AwaitingAction
        }
    }

    /// Players that have not brought all four pieces Home
    pub fn unfinished_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_finished()).count()
    }

    /// Colors a joining player could still take; empty once the lobby has closed
    pub fn available_colors(&self) -> Vec<Color> {
        if self.match_started || self.match_finished || self.determination.is_active() {
            return Vec::new();
        }
        Color::ALL
            .into_iter()
            .filter(|c| self.player_by_color(*c).is_none())
            .collect()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    id: p.id(),
                    color: p.color(),
                    name: p.name().to_string(),
                    pieces: std::array::from_fn(|i| p.pieces()[i].location()),
                    is_admin: p.is_admin(),
                    finished: p.is_finished(),
                })
                .collect(),
            turn_index: self.turn_index,
            dice: self.dice(),
            match_started: self.match_started,
            match_finished: self.match_finished,
        }
    }

    // ============== Lobby ==============

    /// Seat a new player
    ///
    /// The first player to join becomes admin and host. Without a preferred
    /// color the first free one in Red, Blue, Yellow, Green order is assigned.
    pub fn join(
        &mut self,
        name: &str,
        preferred: Option<Color>,
        connection: ConnectionId,
    ) -> EngineResult<(PlayerId, Vec<GameEvent>)> {
        if self.match_finished {
            return Err(ProtocolViolation::MatchFinished.into());
        }
        if self.match_started || self.determination.is_active() {
            return Err(ProtocolViolation::MatchAlreadyStarted.into());
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(IllegalAction::InvalidName.into());
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(IllegalAction::MatchFull.into());
        }
        let taken = |c: Color| self.players.iter().any(|p| p.color() == c);
        let color = match preferred {
            Some(c) if taken(c) => return Err(IllegalAction::ColorTaken(c).into()),
            Some(c) => c,
            None => Color::ALL
                .into_iter()
                .find(|c| !taken(*c))
                .ok_or(IllegalAction::MatchFull)?,
        };

        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        let mut player = Player::new(id, color, name, connection);
        if self.players.is_empty() {
            player.set_admin(true);
            player.set_host(true);
        }
        self.players.push(player);
        info!(player = %id, %color, name, "player joined");

        Ok((
            id,
            vec![
                GameEvent::Welcome {
                    player: id,
                    color,
                    name: name.to_string(),
                },
                GameEvent::WaitingForPlayers {
                    count: self.players.len(),
                    required: self.min_players,
                },
            ],
        ))
    }

    /// Admin starts the match: opens the turn order roll-off
    pub fn start(&mut self, player: PlayerId) -> EngineResult<Vec<GameEvent>> {
        if self.match_finished {
            return Err(ProtocolViolation::MatchFinished.into());
        }
        if self.match_started {
            return Err(ProtocolViolation::MatchAlreadyStarted.into());
        }
        if self.determination.is_active() {
            return Err(ProtocolViolation::DeterminationInProgress.into());
        }
        let idx = self.player_index(player)?;
        if !self.players[idx].is_admin() {
            return Err(IllegalAction::NotAdmin.into());
        }
        if self.players.len() < self.min_players {
            return Err(IllegalAction::NotEnoughPlayers {
                have: self.players.len(),
                need: self.min_players,
            }
            .into());
        }

        self.determination
            .begin(self.players.iter().map(Player::id));
        info!(players = self.players.len(), "turn order determination started");
        Ok(vec![GameEvent::DeterminationStarted])
    }

    // ============== Turn order determination ==============

    /// Register a determination roll; `None` rolls the server dice
    pub fn determine_roll(
        &mut self,
        player: PlayerId,
        roll: Option<DiceRoll>,
    ) -> EngineResult<Vec<GameEvent>> {
        if self.match_finished {
            return Err(ProtocolViolation::MatchFinished.into());
        }
        if !self.determination.is_active() {
            return Err(if self.match_started {
                ProtocolViolation::MatchAlreadyStarted
            } else {
                ProtocolViolation::DeterminationNotActive
            }
            .into());
        }
        let idx = self.player_index(player)?;
        let color = self.players[idx].color();
        let roll = match roll {
            Some(roll) => {
                self.determination.check_roll(player, roll)?;
                roll
            }
            None => {
                self.determination.check_roller(player)?;
                self.roll_source()?
            }
        };

        let outcome = self.determination.register_roll(player, roll)?;
        debug!(%color, d1 = roll.d1, d2 = roll.d2, "determination roll");
        let next = self
            .determination
            .next_roller()
            .and_then(|id| self.player(id))
            .map(Player::color);

        let mut events = vec![GameEvent::DeterminationRollResult {
            color,
            d1: roll.d1,
            d2: roll.d2,
            sum: roll.sum(),
            next,
        }];
        events.extend(self.round_outcome_events(outcome));
        Ok(events)
    }

    fn round_outcome_events(&mut self, outcome: RoundOutcome) -> Vec<GameEvent> {
        match outcome {
            RoundOutcome::Pending { .. } => Vec::new(),
            RoundOutcome::Tie { tied, sum } => {
                let tied: Vec<Color> = tied
                    .iter()
                    .filter_map(|id| self.player(*id))
                    .map(Player::color)
                    .collect();
                debug!(?tied, sum, "determination tie");
                vec![GameEvent::DeterminationTie { tied, sum }]
            }
            RoundOutcome::Winner(id) => self.finish_determination(id),
        }
    }

    /// Seat players clockwise from the winner and open the first turn
    fn finish_determination(&mut self, winner: PlayerId) -> Vec<GameEvent> {
        let Some(winner_color) = self.player(winner).map(Player::color) else {
            warn!(player = %winner, "determination winner left the match");
            return Vec::new();
        };
        let order: Vec<Color> = winner_color
            .clockwise_order()
            .into_iter()
            .filter(|c| self.player_by_color(*c).is_some())
            .collect();
        self.players.sort_by_key(|p| {
            order
                .iter()
                .position(|c| *c == p.color())
                .unwrap_or(usize::MAX)
        });

        self.turn_index = 0;
        self.match_started = true;
        self.consecutive_doubles = 0;
        self.reset_roll_state();
        info!(winner = %winner_color, ?order, "match started");

        let players = self
            .players
            .iter()
            .map(|p| PlayerInfo {
                id: p.id(),
                color: p.color(),
                name: p.name().to_string(),
            })
            .collect();
        vec![
            GameEvent::DeterminationFinished { order },
            GameEvent::MatchStarted { players },
            GameEvent::TurnChanged {
                color: winner_color,
            },
        ]
    }

    // ============== Turn loop ==============

    /// Roll both dice for the current player
    pub fn roll_dice(&mut self, player: PlayerId) -> EngineResult<Vec<GameEvent>> {
        let idx = self.require_turn(player)?;
        if self.bonus_active {
            return Err(ProtocolViolation::BonusPending.into());
        }
        if self.dice_rolled {
            return Err(ProtocolViolation::DiceAlreadyRolled.into());
        }
        let roll = self.roll_source()?;
        let color = self.players[idx].color();

        self.dice = roll;
        self.dice_rolled = true;
        self.used_dice = UsedDice::default();
        self.action_taken = false;
        self.must_advance = false;
        self.extra_roll = false;

        let mut events = vec![GameEvent::DiceRolled {
            color,
            d1: roll.d1,
            d2: roll.d2,
            sum: roll.sum(),
            is_double: roll.is_double(),
        }];

        if !roll.is_double() {
            self.consecutive_doubles = 0;
        } else {
            self.consecutive_doubles += 1;
            if self.consecutive_doubles < MAX_DOUBLES_BEFORE_BONUS {
                self.extra_roll = true;
            } else {
                let eligible = self.players[idx].bonus_eligible();
                self.must_advance = true;
                if eligible.is_empty() {
                    // Nothing to send home: the bonus is lost with the roll.
                    self.consecutive_doubles = 0;
                    self.used_dice.mark(DieSelector::Sum);
                    info!(%color, "triple doubles without an eligible piece, bonus forfeited");
                } else {
                    self.bonus_active = true;
                    info!(%color, "triple doubles bonus offered");
                    events.push(GameEvent::BonusOffered {
                        color,
                        eligible: eligible.to_vec(),
                    });
                }
            }
        }

        debug!(%color, d1 = roll.d1, d2 = roll.d2, doubles = self.consecutive_doubles, "dice rolled");
        Ok(events)
    }

    /// True when the current player may release every jailed piece now
    pub fn can_release(&self) -> bool {
        self.in_play()
            && self.dice_rolled
            && self.extra_roll
            && !self.bonus_active
            && !self.action_taken
            && self
                .players
                .get(self.turn_index)
                .is_some_and(Player::has_jailed_pieces)
    }

    /// Release every jailed piece of the current player onto its exit cell
    pub fn release_all_from_jail(&mut self, player: PlayerId) -> EngineResult<Vec<GameEvent>> {
        let idx = self.check_release(player)?;
        if !self.players[idx].has_jailed_pieces() {
            return Err(IllegalAction::NoJailedPieces.into());
        }

        let jailed: ArrayVec<u8, PIECES_PER_PLAYER> = self.players[idx]
            .pieces()
            .iter()
            .filter(|p| p.is_jailed())
            .map(Piece::index)
            .collect();
        let mut events = Vec::with_capacity(jailed.len() * 2);
        for index in jailed {
            events.extend(self.release_piece(idx, index)?);
        }
        self.action_taken = true;
        debug!(color = %self.players[idx].color(), released = events.len(), "released pieces from jail");
        Ok(events)
    }

    /// Release one jailed piece of the current player onto its exit cell
    ///
    /// Same window as [`release_all_from_jail`](Self::release_all_from_jail):
    /// right after a sub-cap double, before any other action with the roll.
    pub fn release_from_jail(&mut self, player: PlayerId, piece: u8) -> EngineResult<Vec<GameEvent>> {
        let idx = self.check_release(player)?;
        if !self.players[idx].piece(piece)?.is_jailed() {
            return Err(IllegalAction::PieceNotJailed.into());
        }

        let events = self.release_piece(idx, piece)?;
        self.action_taken = true;
        debug!(color = %self.players[idx].color(), piece, "released one piece from jail");
        Ok(events)
    }

    /// Move one piece with one die or with the sum of both
    pub fn move_token(
        &mut self,
        player: PlayerId,
        piece: u8,
        die: DieSelector,
    ) -> EngineResult<Vec<GameEvent>> {
        let idx = self.require_turn(player)?;
        if !self.dice_rolled {
            return Err(ProtocolViolation::DiceNotRolled.into());
        }
        if self.bonus_active {
            return Err(ProtocolViolation::BonusPending.into());
        }
        let target = self.check_move(idx, piece, die)?;

        let board = self.board;
        let color = self.players[idx].color();
        let steps = self.dice.value(die);
        let moving = self.players[idx].piece_mut(piece)?;
        let from = moving.location();
        let to = moving.move_by(steps, &board)?;
        if to != target {
            return Err(EngineError::Invariant(format!(
                "piece {piece} of {color} previewed {target:?} but moved to {to:?}"
            )));
        }

        let mut events = vec![GameEvent::TokenMoved {
            color,
            piece,
            from,
            to,
            action: MoveAction::Move(die),
        }];
        if let PieceLocation::Main(cell) = to {
            let captured = self.resolve_captures(cell, color);
            if !captured.is_empty() {
                debug!(%color, cell, count = captured.len(), "captured pieces");
                events.push(GameEvent::TokensCaptured { by: color, captured });
            }
        }

        self.used_dice.mark(die);
        if die == DieSelector::Sum {
            self.must_advance = true;
        }
        self.action_taken = true;
        debug!(%color, piece, ?from, ?to, die = die.as_str(), "piece moved");

        if to == PieceLocation::Home {
            events.extend(self.check_win(idx));
        }
        if !self.match_finished {
            self.discard_unusable_die(idx);
        }
        Ok(events)
    }

    /// Send one piece straight Home after the third consecutive double
    pub fn apply_triple_doubles_bonus(
        &mut self,
        player: PlayerId,
        piece: u8,
    ) -> EngineResult<Vec<GameEvent>> {
        let idx = self.require_turn(player)?;
        if !self.bonus_active {
            return Err(ProtocolViolation::NoBonusActive.into());
        }
        let chosen = self.players[idx].piece(piece)?;
        if !(chosen.is_active() || chosen.in_home_lane()) {
            return Err(IllegalAction::PieceNotEligibleForBonus.into());
        }

        let color = self.players[idx].color();
        let target = self.players[idx].piece_mut(piece)?;
        let from = target.location();
        target.send_home();

        self.consecutive_doubles = 0;
        self.bonus_active = false;
        self.must_advance = true;
        self.action_taken = true;
        self.used_dice.mark(DieSelector::Sum);
        info!(%color, piece, "triple doubles bonus applied");

        let mut events = vec![GameEvent::TokenMoved {
            color,
            piece,
            from,
            to: PieceLocation::Home,
            action: MoveAction::Bonus,
        }];
        events.extend(self.check_win(idx));
        Ok(events)
    }

    /// The roll in play is over and the turn should move on
    pub fn should_advance_turn(&self) -> bool {
        if !self.in_play() || !self.dice_rolled {
            return false;
        }
        let current_finished = self
            .players
            .get(self.turn_index)
            .is_some_and(Player::is_finished);
        current_finished
            || (self.action_taken && (self.must_advance || self.used_dice.all()))
    }

    /// End the roll in play
    ///
    /// A sub-cap double keeps the turn with the same player for another roll;
    /// anything else passes it clockwise to the next player still playing.
    pub fn advance_turn(&mut self) -> Vec<GameEvent> {
        if !self.in_play() || self.players.is_empty() {
            return Vec::new();
        }
        let current_finished = self
            .players
            .get(self.turn_index)
            .map_or(true, Player::is_finished);
        let keep = self.extra_roll && !current_finished;

        self.reset_roll_state();
        if keep {
            debug!(doubles = self.consecutive_doubles, "double rolled, same player rolls again");
        } else {
            self.consecutive_doubles = 0;
            self.rotate_turn();
        }

        match self.players.get(self.turn_index) {
            Some(next) => {
                debug!(color = %next.color(), "turn changed");
                vec![GameEvent::TurnChanged {
                    color: next.color(),
                }]
            }
            None => Vec::new(),
        }
    }

    /// Discard whatever is left of the roll and advance (auto-pass)
    pub fn force_advance_turn(&mut self) -> Vec<GameEvent> {
        let Some(color) = self.current_player().map(Player::color) else {
            return Vec::new();
        };
        self.used_dice.mark(DieSelector::Sum);
        self.action_taken = true;
        self.bonus_active = false;
        info!(%color, "turn passed");

        let mut events = vec![GameEvent::TurnPassed { color }];
        events.extend(self.advance_turn());
        events
    }

    /// Every legal action for the current player, validated exactly like the operations
    pub fn available_actions(&self) -> Vec<LegalAction> {
        if !self.in_play() || !self.dice_rolled {
            return Vec::new();
        }
        let Some(player) = self.players.get(self.turn_index) else {
            return Vec::new();
        };
        if self.bonus_active {
            return player
                .bonus_eligible()
                .into_iter()
                .map(|piece| LegalAction::Bonus { piece })
                .collect();
        }

        let mut actions = Vec::new();
        if self.can_release() {
            actions.push(LegalAction::ReleaseAll);
            actions.extend(
                player
                    .pieces()
                    .iter()
                    .filter(|p| p.is_jailed())
                    .map(|p| LegalAction::Release { piece: p.index() }),
            );
        }
        for piece in 0..PIECES_PER_PLAYER as u8 {
            for die in [DieSelector::First, DieSelector::Second, DieSelector::Sum] {
                if self.check_move(self.turn_index, piece, die).is_ok() {
                    actions.push(LegalAction::Move { piece, die });
                }
            }
        }
        actions
    }

    pub fn has_legal_action(&self) -> bool {
        !self.available_actions().is_empty()
    }

    // ============== Disconnect ==============

    /// Remove a player that disconnected
    ///
    /// The turn passes on if they held it, the admin role moves to the first
    /// remaining seat, the determination round is re-evaluated, and a running
    /// match with at most one player still in it is finished.
    pub fn handle_disconnect(&mut self, player: PlayerId) -> EngineResult<Vec<GameEvent>> {
        let idx = self.player_index(player)?;
        let running = self.in_play();
        let held_turn = running && idx == self.turn_index;

        let removed = self.players.remove(idx);
        let color = removed.color();
        info!(%color, player = %player, "player left");
        let mut events = vec![GameEvent::PlayerLeft { color }];

        if idx < self.turn_index {
            self.turn_index -= 1;
        } else if idx == self.turn_index {
            self.turn_index = if self.players.is_empty() {
                0
            } else {
                idx % self.players.len()
            };
        }
        if held_turn {
            self.consecutive_doubles = 0;
            self.reset_roll_state();
        }

        if removed.is_admin() {
            if let Some(first) = self.players.first_mut() {
                first.set_admin(true);
                info!(color = %first.color(), "admin promoted");
                events.push(GameEvent::AdminChanged {
                    color: first.color(),
                });
            }
        }

        if self.determination.is_active() {
            if self.players.len() < self.min_players {
                self.determination.cancel();
                info!("determination cancelled, not enough players");
                events.push(self.waiting_event());
            } else if let Some(outcome) = self.determination.remove_player(player) {
                events.extend(self.round_outcome_events(outcome));
            }
        } else if !self.match_started && !self.match_finished {
            events.push(self.waiting_event());
        }

        if running {
            if self.unfinished_count() <= 1 {
                events.extend(self.finish_match());
            } else if held_turn {
                if self
                    .players
                    .get(self.turn_index)
                    .map_or(true, Player::is_finished)
                {
                    self.rotate_turn();
                }
                if let Some(next) = self.players.get(self.turn_index) {
                    events.push(GameEvent::TurnChanged {
                        color: next.color(),
                    });
                }
            }
        }
        Ok(events)
    }

    // ============== Scenario setup ==============

    /// Put a piece of `color` at an arbitrary location
    ///
    /// Used to set up positions in tests and benchmarks; no events, no captures.
    pub fn arrange_piece(
        &mut self,
        color: Color,
        piece: u8,
        location: PieceLocation,
    ) -> EngineResult<()> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.color() == color)
            .ok_or(IllegalAction::UnknownPlayer)?;
        player.piece_mut(piece)?.place(location);
        Ok(())
    }

    // ============== Internals ==============

    fn in_play(&self) -> bool {
        self.match_started && !self.match_finished
    }

    fn player_index(&self, id: PlayerId) -> Result<usize, IllegalAction> {
        self.players
            .iter()
            .position(|p| p.id() == id)
            .ok_or(IllegalAction::UnknownPlayer)
    }

    /// Validate that `player` may act in the running match
    fn require_turn(&self, player: PlayerId) -> EngineResult<usize> {
        if self.match_finished {
            return Err(ProtocolViolation::MatchFinished.into());
        }
        if self.determination.is_active() {
            return Err(ProtocolViolation::DeterminationInProgress.into());
        }
        if !self.match_started {
            return Err(ProtocolViolation::MatchNotStarted.into());
        }
        let idx = self.player_index(player)?;
        if idx != self.turn_index {
            return Err(IllegalAction::NotYourTurn.into());
        }
        Ok(idx)
    }

    /// Preconditions shared by both release intents
    fn check_release(&self, player: PlayerId) -> EngineResult<usize> {
        let idx = self.require_turn(player)?;
        if !self.dice_rolled {
            return Err(ProtocolViolation::DiceNotRolled.into());
        }
        if self.bonus_active {
            return Err(ProtocolViolation::BonusPending.into());
        }
        if !self.extra_roll {
            return Err(ProtocolViolation::ReleaseNotAllowed.into());
        }
        if self.action_taken {
            return Err(ProtocolViolation::ActionAlreadyTaken.into());
        }
        Ok(idx)
    }

    /// Put one jailed piece on its exit cell and capture whatever rival stands there
    fn release_piece(&mut self, idx: usize, index: u8) -> EngineResult<Vec<GameEvent>> {
        let board = self.board;
        let color = self.players[idx].color();
        let exit = self.players[idx].piece_mut(index)?.release(&board)?;
        let mut events = vec![GameEvent::TokenMoved {
            color,
            piece: index,
            from: PieceLocation::Jail,
            to: PieceLocation::Main(exit),
            action: MoveAction::Release,
        }];
        let captured = self.resolve_captures(exit, color);
        if !captured.is_empty() {
            events.push(GameEvent::TokensCaptured { by: color, captured });
        }
        Ok(events)
    }

    fn roll_source(&mut self) -> EngineResult<DiceRoll> {
        let roll = self.dice_source.roll();
        if !roll.is_valid() {
            return Err(EngineError::Invariant(format!(
                "dice source produced {}/{}",
                roll.d1, roll.d2
            )));
        }
        Ok(roll)
    }

    /// Full move validation; returns the destination on success
    fn check_move(&self, idx: usize, piece: u8, die: DieSelector) -> Result<PieceLocation, IllegalAction> {
        let player = self.players.get(idx).ok_or(IllegalAction::UnknownPlayer)?;
        let moving = player.piece(piece)?;
        if let Some(spent) = self.used_dice.conflict(die) {
            return Err(IllegalAction::DieAlreadyUsed(spent));
        }
        if moving.is_jailed() {
            return Err(IllegalAction::PieceJailed);
        }
        if moving.is_home() {
            return Err(IllegalAction::PieceAlreadyHome);
        }
        if die == DieSelector::Sum && moving.in_home_lane() {
            return Err(IllegalAction::SumNotAllowedInHomeLane);
        }
        if die != DieSelector::Sum && self.sum_forced_piece(player) == Some(piece) {
            return Err(IllegalAction::SumRequired);
        }
        moving.preview(self.dice.value(die), &self.board)
    }

    /// The piece that must use the sum, if the forced-sum rule applies
    ///
    /// Applies before any die is spent, when the player has exactly one
    /// movable piece and it is on the main track and not near home.
    fn sum_forced_piece(&self, player: &Player) -> Option<u8> {
        if self.used_dice.any() {
            return None;
        }
        let mut movable = player.pieces().iter().filter(|p| {
            p.is_active()
                || (p.in_home_lane()
                    && [self.dice.d1, self.dice.d2]
                        .iter()
                        .any(|steps| p.preview(*steps, &self.board).is_ok()))
        });
        let only = movable.next()?;
        if movable.next().is_some() || !only.is_active() {
            return None;
        }
        let cell = only.main_position()?;
        if self.board.is_near_home(player.color(), cell) {
            return None;
        }
        Some(only.index())
    }

    /// Drop the last unspent die when no piece can use it
    fn discard_unusable_die(&mut self, idx: usize) {
        let Some(die) = self.used_dice.remaining() else {
            return;
        };
        let usable =
            (0..PIECES_PER_PLAYER as u8).any(|piece| self.check_move(idx, piece, die).is_ok());
        if !usable {
            debug!(die = die.as_str(), value = self.dice.value(die), "remaining die unusable, discarded");
            self.used_dice.mark(die);
        }
    }

    /// Send every rival piece on a non-safe `cell` back to jail
    fn resolve_captures(&mut self, cell: u8, attacker: Color) -> Vec<CapturedPiece> {
        if self.board.is_safe_cell(cell) {
            return Vec::new();
        }
        let mut captured = Vec::new();
        for player in self.players.iter_mut().filter(|p| p.color() != attacker) {
            let color = player.color();
            for index in player.active_on(cell) {
                if let Ok(piece) = player.piece_mut(index) {
                    piece.jail();
                    captured.push(CapturedPiece {
                        color,
                        piece: index,
                    });
                }
            }
        }
        captured
    }

    fn check_win(&mut self, idx: usize) -> Vec<GameEvent> {
        let Some(player) = self.players.get_mut(idx) else {
            return Vec::new();
        };
        if player.is_finished() || !player.all_home() {
            return Vec::new();
        }
        player.mark_finished();
        let color = player.color();
        self.ranking.push(color);
        info!(%color, place = self.ranking.len(), "player brought all pieces home");

        let mut events = vec![GameEvent::MatchWon { color }];
        if self.unfinished_count() <= 1 {
            events.extend(self.finish_match());
        }
        events
    }

    fn finish_match(&mut self) -> Vec<GameEvent> {
        if self.match_finished {
            return Vec::new();
        }
        self.match_finished = true;
        self.bonus_active = false;
        self.reset_roll_state();
        for player in self.players.iter().filter(|p| !p.is_finished()) {
            if !self.ranking.contains(&player.color()) {
                self.ranking.push(player.color());
            }
        }
        info!(ranking = ?self.ranking, "match finished");
        vec![GameEvent::MatchFinished {
            ranking: self.ranking.clone(),
        }]
    }

    fn reset_roll_state(&mut self) {
        self.dice_rolled = false;
        self.used_dice = UsedDice::default();
        self.action_taken = false;
        self.must_advance = false;
        self.extra_roll = false;
        self.bonus_active = false;
    }

    /// Move the turn clockwise to the next player who has not finished
    fn rotate_turn(&mut self) {
        let n = self.players.len();
        for step in 1..=n {
            let i = (self.turn_index + step) % n;
            if !self.players[i].is_finished() {
                self.turn_index = i;
                return;
            }
        }
    }

    fn waiting_event(&self) -> GameEvent {
        GameEvent::WaitingForPlayers {
            count: self.players.len(),
            required: self.min_players,
        }
    }
}
