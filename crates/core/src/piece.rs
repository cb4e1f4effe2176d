//! Piece module - per-token state machine and movement
//!
//! A piece is Jailed, Active (on the main ring), in its HomeLane, or Home.
//! Movement is computed by [`Piece::preview`] without mutation and committed
//! with [`Piece::move_by`]; a rejected move never changes the piece.
//!
//! # Movement rules
//!
//! - Jailed and Home pieces never move.
//! - In the home lane a piece advances `steps` cells; landing exactly on
//!   index 7 is Home, going past it is an overshoot.
//! - On the main ring a piece walks forward one cell at a time. If it passes
//!   its own safe-entry cell after `k` steps, the remaining `steps - k` are
//!   spent in the home lane (8 remaining reaches Home, more overshoots).
//!   Stopping exactly on the safe-entry cell keeps it Active.

use crate::board::Board;
use crate::error::IllegalAction;
use crate::types::{
    Color, PieceLocation, PieceState, HOME_POSITION, MAIN_CELL_COUNT, STEPS_TO_HOME_FROM_ENTRY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    color: Color,
    index: u8,
    state: PieceState,
    /// Valid only while Active
    main_position: Option<u8>,
    /// Valid only while in the home lane or Home (7 = Home)
    home_position: Option<u8>,
}

impl Piece {
    /// Create a jailed piece
    pub fn new(color: Color, index: u8) -> Self {
        Self {
            color,
            index,
            state: PieceState::Jailed,
            main_position: None,
            home_position: None,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn state(&self) -> PieceState {
        self.state
    }

    pub fn main_position(&self) -> Option<u8> {
        self.main_position
    }

    pub fn home_position(&self) -> Option<u8> {
        self.home_position
    }

    pub fn is_jailed(&self) -> bool {
        self.state == PieceState::Jailed
    }

    pub fn is_home(&self) -> bool {
        self.state == PieceState::Home
    }

    pub fn in_home_lane(&self) -> bool {
        self.state == PieceState::HomeLane
    }

    pub fn is_active(&self) -> bool {
        self.state == PieceState::Active
    }

    /// Current location in event form
    pub fn location(&self) -> PieceLocation {
        match (self.state, self.main_position, self.home_position) {
            (PieceState::Active, Some(cell), _) => PieceLocation::Main(cell),
            (PieceState::HomeLane, _, Some(lane)) => PieceLocation::Lane(lane),
            (PieceState::Home, _, _) => PieceLocation::Home,
            _ => PieceLocation::Jail,
        }
    }

    /// Destination after moving `steps` cells, without mutating the piece
    pub fn preview(&self, steps: u8, board: &Board) -> Result<PieceLocation, IllegalAction> {
        match self.state {
            PieceState::Jailed => Err(IllegalAction::PieceJailed),
            PieceState::Home => Err(IllegalAction::PieceAlreadyHome),
            PieceState::HomeLane => {
                let current = self.home_position.unwrap_or(0);
                let target = current + steps;
                if target > HOME_POSITION {
                    Err(IllegalAction::Overshoot)
                } else if target == HOME_POSITION {
                    Ok(PieceLocation::Home)
                } else {
                    Ok(PieceLocation::Lane(target))
                }
            }
            PieceState::Active => {
                let Some(cell) = self.main_position else {
                    return Err(IllegalAction::PieceJailed);
                };
                let to_entry = board.distance_to_entry(self.color, cell);
                if steps <= to_entry {
                    let target = ((cell as u16 + steps as u16) % MAIN_CELL_COUNT as u16) as u8;
                    return Ok(PieceLocation::Main(target));
                }
                Self::enter_lane(steps - to_entry)
            }
        }
    }

    /// Spend `remaining` steps after passing the safe-entry cell
    fn enter_lane(remaining: u8) -> Result<PieceLocation, IllegalAction> {
        match remaining {
            r if r == STEPS_TO_HOME_FROM_ENTRY => Ok(PieceLocation::Home),
            r if r > STEPS_TO_HOME_FROM_ENTRY => Err(IllegalAction::Overshoot),
            r => Ok(PieceLocation::Lane(r - 1)),
        }
    }

    /// Move `steps` cells; the piece is unchanged on failure
    pub fn move_by(&mut self, steps: u8, board: &Board) -> Result<PieceLocation, IllegalAction> {
        let target = self.preview(steps, board)?;
        self.place(target);
        Ok(target)
    }

    /// Put a jailed piece onto its exit cell
    pub fn release(&mut self, board: &Board) -> Result<u8, IllegalAction> {
        if !self.is_jailed() {
            return Err(IllegalAction::PieceNotJailed);
        }
        let exit = board.exit_cell_of(self.color);
        self.place(PieceLocation::Main(exit));
        Ok(exit)
    }

    /// Send the piece straight Home (triple doubles bonus)
    pub fn send_home(&mut self) {
        self.place(PieceLocation::Home);
    }

    /// Send the piece back to jail (captured)
    pub fn jail(&mut self) {
        self.place(PieceLocation::Jail);
    }

    /// Overwrite the piece location, keeping state and positions consistent
    pub fn place(&mut self, location: PieceLocation) {
        let (state, main, home) = match location {
            PieceLocation::Jail => (PieceState::Jailed, None, None),
            PieceLocation::Main(cell) => (PieceState::Active, Some(cell % MAIN_CELL_COUNT), None),
            PieceLocation::Lane(lane) => (PieceState::HomeLane, None, Some(lane.min(HOME_POSITION - 1))),
            PieceLocation::Home => (PieceState::Home, None, Some(HOME_POSITION)),
        };
        self.state = state;
        self.main_position = main;
        self.home_position = home;
    }
}
