//! Board module - static topology of the four-color track
//!
//! The main track is a ring of 68 cells indexed 0..67. Every color owns an
//! exit cell (where released pieces enter the ring), a safe-entry cell (the
//! last main-track cell before its private lane) and a home lane of 7 stepping
//! cells followed by Home.
//!
//! The board carries no mutable state; piece positions live on the pieces.

use crate::types::{Color, HOME_LANE_STEPS, MAIN_CELL_COUNT, NEAR_HOME_DISTANCE};

/// Exit cell per color, indexed by `Color::index()`
const EXIT_CELLS: [u8; 4] = [38, 21, 4, 55];

/// Safe-entry cell per color, indexed by `Color::index()`
const SAFE_ENTRY_CELLS: [u8; 4] = [33, 16, 67, 50];

/// Cells where no capture can happen
const SHARED_SAFE_CELLS: [u8; 12] = [4, 11, 16, 21, 28, 33, 38, 45, 50, 55, 62, 67];

/// One cell of a home lane (`index == HOME_LANE_STEPS` is Home)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneCell {
    pub color: Color,
    pub index: u8,
}

impl LaneCell {
    pub fn is_home(&self) -> bool {
        self.index == HOME_LANE_STEPS
    }
}

/// Immutable board topology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Board;

impl Board {
    pub fn new() -> Self {
        Self
    }

    /// Cell where a released piece of `color` enters the ring
    pub fn exit_cell_of(&self, color: Color) -> u8 {
        EXIT_CELLS[color.index()]
    }

    /// Last main-track cell before the home lane of `color`
    pub fn safe_entry_cell_of(&self, color: Color) -> u8 {
        SAFE_ENTRY_CELLS[color.index()]
    }

    /// The 7 stepping cells of the home lane of `color` followed by Home
    pub fn home_lane_of(&self, color: Color) -> [LaneCell; HOME_LANE_STEPS as usize + 1] {
        let mut lane = [LaneCell { color, index: 0 }; HOME_LANE_STEPS as usize + 1];
        for (i, cell) in lane.iter_mut().enumerate() {
            cell.index = i as u8;
        }
        lane
    }

    /// True for the shared safe cells (exit and safe-entry cells included)
    pub fn is_safe_cell(&self, cell: u8) -> bool {
        SHARED_SAFE_CELLS.contains(&cell)
    }

    /// Forward distance (with wraparound) from `cell` to the safe-entry cell of `color`
    pub fn distance_to_entry(&self, color: Color, cell: u8) -> u8 {
        let entry = self.safe_entry_cell_of(color);
        (entry + MAIN_CELL_COUNT - cell % MAIN_CELL_COUNT) % MAIN_CELL_COUNT
    }

    /// A main-track piece of `color` standing on `cell` is "near home"
    /// when it is at most 7 cells away from its safe-entry cell.
    pub fn is_near_home(&self, color: Color, cell: u8) -> bool {
        self.distance_to_entry(color, cell) <= NEAR_HOME_DISTANCE
    }
}
