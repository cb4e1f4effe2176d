//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the server.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (rule engine, match session, wire protocol).
//!
//! # Board Dimensions
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `MAIN_CELL_COUNT` | 68 | Cells on the shared main track (indexed 0-67) |
//! | `HOME_LANE_STEPS` | 7 | Stepping cells in a private home lane |
//! | `HOME_POSITION` | 7 | Home lane index meaning "arrived" |
//! | `NEAR_HOME_DISTANCE` | 7 | Max distance to the safe-entry cell counted as "near home" |
//!
//! # Match Limits
//!
//! - `MIN_PLAYERS`: 2
//! - `MAX_PLAYERS`: 4
//! - `PIECES_PER_PLAYER`: 4
//! - `MAX_DOUBLES_BEFORE_BONUS`: 3 consecutive doubles award the bonus
//!
//! # Examples
//!
//! ```
//! use parchis_types::{Color, DiceRoll, DieSelector, MAIN_CELL_COUNT};
//!
//! assert_eq!(Color::Red.to_string(), "red");
//! assert_eq!(Color::Red.clockwise_next(), Color::Green);
//!
//! let roll = DiceRoll::new(5, 5);
//! assert!(roll.is_double());
//! assert_eq!(roll.value(DieSelector::Sum), 10);
//! assert_eq!(MAIN_CELL_COUNT, 68);
//! ```

/// Cells on the shared main track (68)
pub const MAIN_CELL_COUNT: u8 = 68;

/// Stepping cells inside a home lane before Home (7)
pub const HOME_LANE_STEPS: u8 = 7;

/// Home lane position that means the piece reached Home
pub const HOME_POSITION: u8 = HOME_LANE_STEPS;

/// Steps from the safe-entry cell straight into Home (7 lane cells + Home)
pub const STEPS_TO_HOME_FROM_ENTRY: u8 = HOME_LANE_STEPS + 1;

/// Forward distance to the safe-entry cell still counted as "near home"
pub const NEAR_HOME_DISTANCE: u8 = 7;

/// Tokens owned by every player
pub const PIECES_PER_PLAYER: usize = 4;

/// Minimum players required to start a match
pub const MIN_PLAYERS: usize = 2;

/// Maximum players in a match (one per color)
pub const MAX_PLAYERS: usize = 4;

/// Consecutive doubles that trigger the send-home bonus
pub const MAX_DOUBLES_BEFORE_BONUS: u8 = 3;

/// Highest face of a die
pub const DIE_FACES: u8 = 6;

/// The four player colors
///
/// Declaration order is the auto-assignment order used when a joining
/// player does not ask for a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Red,
    Blue,
    Yellow,
    Green,
}

impl Color {
    /// All colors in auto-assignment order
    pub const ALL: [Color; 4] = [Color::Red, Color::Blue, Color::Yellow, Color::Green];

    /// Stable array index for per-color tables
    pub fn index(self) -> usize {
        match self {
            Color::Red => 0,
            Color::Blue => 1,
            Color::Yellow => 2,
            Color::Green => 3,
        }
    }

    /// Next color clockwise around the table
    ///
    /// Red → Green → Yellow → Blue → Red
    pub fn clockwise_next(self) -> Self {
        match self {
            Color::Red => Color::Green,
            Color::Green => Color::Yellow,
            Color::Yellow => Color::Blue,
            Color::Blue => Color::Red,
        }
    }

    /// Clockwise seating order starting at `self`
    ///
    /// # Examples
    ///
    /// ```
    /// use parchis_types::Color;
    ///
    /// assert_eq!(
    ///     Color::Yellow.clockwise_order(),
    ///     [Color::Yellow, Color::Blue, Color::Red, Color::Green]
    /// );
    /// ```
    pub fn clockwise_order(self) -> [Color; 4] {
        let second = self.clockwise_next();
        let third = second.clockwise_next();
        [self, second, third, third.clockwise_next()]
    }

    /// Convert to lowercase string for the wire protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Green => "green",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic id assigned to a player when they join
///
/// Opaque to the transport; used to order the turn-determination rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Transport-assigned connection handle; the rule engine stores it but never reads it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

/// Lifecycle of a single piece
///
/// - **Jailed**: not yet on the board (or sent back by a capture)
/// - **Active**: on the shared main track
/// - **HomeLane**: inside its color's private lane
/// - **Home**: arrived, never moves again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceState {
    Jailed,
    Active,
    HomeLane,
    Home,
}

/// Which die value a move consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DieSelector {
    /// The first die
    First,
    /// The second die
    Second,
    /// Both dice added together (consumes both)
    Sum,
}

impl DieSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            DieSelector::First => "first",
            DieSelector::Second => "second",
            DieSelector::Sum => "sum",
        }
    }
}

/// Where a piece is, as reported in events
///
/// This is the event-facing form of a piece position; the rule engine keeps
/// the state and both positions separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceLocation {
    Jail,
    /// Main-track cell 0-67
    Main(u8),
    /// Home lane cell 0-6
    Lane(u8),
    Home,
}

/// Why a piece changed location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveAction {
    /// Ordinary move with a die or the dice sum
    Move(DieSelector),
    /// Released from jail onto the exit cell after a double
    Release,
    /// Sent straight Home by the triple-doubles bonus
    Bonus,
}

/// Result of one roll of the two dice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiceRoll {
    pub d1: u8,
    pub d2: u8,
}

impl DiceRoll {
    pub fn new(d1: u8, d2: u8) -> Self {
        Self { d1, d2 }
    }

    pub fn sum(&self) -> u8 {
        self.d1 + self.d2
    }

    pub fn is_double(&self) -> bool {
        self.d1 == self.d2
    }

    /// Value moved by the given selector
    pub fn value(&self, selector: DieSelector) -> u8 {
        match selector {
            DieSelector::First => self.d1,
            DieSelector::Second => self.d2,
            DieSelector::Sum => self.sum(),
        }
    }

    /// Both faces are within 1..=6
    pub fn is_valid(&self) -> bool {
        (1..=DIE_FACES).contains(&self.d1) && (1..=DIE_FACES).contains(&self.d2)
    }
}

/// A piece that was sent back to jail by a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapturedPiece {
    pub color: Color,
    pub piece: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_constants_match_board_layout() {
        assert_eq!(MAIN_CELL_COUNT, 68);
        assert_eq!(HOME_POSITION, 7);
        assert_eq!(STEPS_TO_HOME_FROM_ENTRY, 8);
        assert_eq!(PIECES_PER_PLAYER, 4);
        assert!(MIN_PLAYERS <= MAX_PLAYERS);
        assert_eq!(MAX_PLAYERS, Color::ALL.len());
    }

    #[test]
    fn clockwise_successor_cycles_through_all_colors() {
        let mut c = Color::Red;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(c);
            c = c.clockwise_next();
        }
        assert_eq!(c, Color::Red);
        assert_eq!(
            seen,
            vec![Color::Red, Color::Green, Color::Yellow, Color::Blue]
        );
    }

    #[test]
    fn dice_roll_values_by_selector() {
        let roll = DiceRoll::new(2, 6);
        assert_eq!(roll.value(DieSelector::First), 2);
        assert_eq!(roll.value(DieSelector::Second), 6);
        assert_eq!(roll.value(DieSelector::Sum), 8);
        assert!(!roll.is_double());
        assert!(roll.is_valid());
        assert!(!DiceRoll::new(0, 3).is_valid());
        assert!(!DiceRoll::new(7, 1).is_valid());
    }
}
