//! Turn order determination - the roll-off that picks who starts
//!
//! Every pending player rolls both dice once. When the round is complete the
//! unique highest sum wins; a tie clears the round and only the tied players
//! roll again. The engine turns the winner into a clockwise seating order.

use std::collections::BTreeMap;

use crate::error::IllegalAction;
use crate::types::{DiceRoll, PlayerId};

/// What a registered roll (or a removal) did to the round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// More rolls are needed; `next` is the lowest pending player id
    Pending { next: Option<PlayerId> },
    /// Highest sum shared; only `tied` roll again
    Tie { tied: Vec<PlayerId>, sum: u8 },
    /// Unique highest sum
    Winner(PlayerId),
}

#[derive(Debug, Clone, Default)]
pub struct TurnDetermination {
    active: bool,
    rolls: BTreeMap<PlayerId, DiceRoll>,
    still_to_roll: Vec<PlayerId>,
    winner: Option<PlayerId>,
}

impl TurnDetermination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh roll-off among `players`
    pub fn begin(&mut self, players: impl IntoIterator<Item = PlayerId>) {
        let mut pending: Vec<PlayerId> = players.into_iter().collect();
        pending.sort();
        pending.dedup();
        self.active = true;
        self.rolls.clear();
        self.still_to_roll = pending;
        self.winner = None;
    }

    /// Abandon the roll-off
    pub fn cancel(&mut self) {
        self.active = false;
        self.rolls.clear();
        self.still_to_roll.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Players who still have to roll in the current round (ascending id)
    pub fn pending(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.still_to_roll
            .iter()
            .copied()
            .filter(|id| !self.rolls.contains_key(id))
    }

    /// Players taking part in the current round (ascending id)
    pub fn participants(&self) -> &[PlayerId] {
        &self.still_to_roll
    }

    pub fn roll_of(&self, player: PlayerId) -> Option<DiceRoll> {
        self.rolls.get(&player).copied()
    }

    /// Lowest player id that has not rolled yet
    pub fn next_roller(&self) -> Option<PlayerId> {
        self.pending().next()
    }

    /// Check that `player` is due to roll in this round
    pub fn check_roller(&self, player: PlayerId) -> Result<(), IllegalAction> {
        if self.rolls.contains_key(&player) {
            return Err(IllegalAction::AlreadyRolled);
        }
        if !self.still_to_roll.contains(&player) {
            return Err(IllegalAction::NotExpectedToRoll);
        }
        Ok(())
    }

    /// Check that `player` may roll `roll` now, without registering anything
    pub fn check_roll(&self, player: PlayerId, roll: DiceRoll) -> Result<(), IllegalAction> {
        self.check_roller(player)?;
        for die in [roll.d1, roll.d2] {
            if !(1..=6).contains(&die) {
                return Err(IllegalAction::InvalidDieValue(die));
            }
        }
        Ok(())
    }

    /// Record a roll and evaluate the round
    pub fn register_roll(
        &mut self,
        player: PlayerId,
        roll: DiceRoll,
    ) -> Result<RoundOutcome, IllegalAction> {
        self.check_roll(player, roll)?;
        self.rolls.insert(player, roll);
        Ok(self.evaluate())
    }

    /// Drop a player that left; re-evaluates the round when they were pending
    pub fn remove_player(&mut self, player: PlayerId) -> Option<RoundOutcome> {
        if !self.active || !self.still_to_roll.contains(&player) {
            return None;
        }
        self.still_to_roll.retain(|id| *id != player);
        self.rolls.remove(&player);
        if self.still_to_roll.is_empty() {
            self.cancel();
            return None;
        }
        Some(self.evaluate())
    }

    fn evaluate(&mut self) -> RoundOutcome {
        if self.pending().next().is_some() {
            return RoundOutcome::Pending {
                next: self.next_roller(),
            };
        }

        let best = self.rolls.values().map(DiceRoll::sum).max().unwrap_or(0);
        let leaders: Vec<PlayerId> = self
            .rolls
            .iter()
            .filter(|(_, roll)| roll.sum() == best)
            .map(|(id, _)| *id)
            .collect();

        match leaders.as_slice() {
            [winner] => {
                let winner = *winner;
                self.winner = Some(winner);
                self.active = false;
                RoundOutcome::Winner(winner)
            }
            _ => {
                self.rolls.clear();
                self.still_to_roll = leaders.clone();
                RoundOutcome::Tie {
                    tied: leaders,
                    sum: best,
                }
            }
        }
    }
}
