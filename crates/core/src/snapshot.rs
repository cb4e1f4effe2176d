//! Snapshot module - observable match state and its replay from events
//!
//! A client that only sees broadcast events can still rebuild the match:
//! `MatchStarted` lists every seat, so replay does not depend on the
//! `Welcome` events that only reach their own player.

use crate::event::GameEvent;
use crate::types::{Color, DiceRoll, PieceLocation, PlayerId, PIECES_PER_PLAYER};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub color: Color,
    pub name: String,
    pub pieces: [PieceLocation; PIECES_PER_PLAYER],
    pub is_admin: bool,
    pub finished: bool,
}

/// Observable match state: seats in turn order, whose turn it is, and the dice
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EngineSnapshot {
    pub players: Vec<PlayerSnapshot>,
    pub turn_index: usize,
    /// Present while a roll is in play
    pub dice: Option<DiceRoll>,
    pub match_started: bool,
    pub match_finished: bool,
}

impl EngineSnapshot {
    /// Color holding the turn once the match is running
    pub fn current(&self) -> Option<Color> {
        if !self.match_started || self.match_finished {
            return None;
        }
        self.players.get(self.turn_index).map(|p| p.color)
    }

    pub fn player(&self, color: Color) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.color == color)
    }

    fn position(&self, color: Color) -> Option<usize> {
        self.players.iter().position(|p| p.color == color)
    }
}

/// Rebuilds an [`EngineSnapshot`] from the engine's event stream
#[derive(Debug, Clone, Default)]
pub struct EventReplay {
    snapshot: EngineSnapshot,
}

impl EventReplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay a complete stream from an empty match
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a GameEvent>) -> EngineSnapshot {
        let mut replay = Self::new();
        for event in events {
            replay.apply(event);
        }
        replay.snapshot
    }

    pub fn snapshot(&self) -> &EngineSnapshot {
        &self.snapshot
    }

    pub fn apply(&mut self, event: &GameEvent) {
        let s = &mut self.snapshot;
        match event {
            GameEvent::Welcome {
                player,
                color,
                name,
            } => {
                let is_admin = s.players.is_empty();
                s.players.push(PlayerSnapshot {
                    id: *player,
                    color: *color,
                    name: name.clone(),
                    pieces: [PieceLocation::Jail; PIECES_PER_PLAYER],
                    is_admin,
                    finished: false,
                });
            }
            GameEvent::MatchStarted { players } => {
                s.match_started = true;
                let mut seated = std::mem::take(&mut s.players);
                for info in players {
                    let seat = match seated.iter().position(|p| p.color == info.color) {
                        Some(pos) => seated.remove(pos),
                        None => PlayerSnapshot {
                            id: info.id,
                            color: info.color,
                            name: info.name.clone(),
                            pieces: [PieceLocation::Jail; PIECES_PER_PLAYER],
                            is_admin: false,
                            finished: false,
                        },
                    };
                    s.players.push(seat);
                }
                // Before the start the admin is always the earliest joiner still seated.
                let admin = s.players.iter().map(|p| p.id).min();
                for p in &mut s.players {
                    p.is_admin = Some(p.id) == admin;
                }
                s.turn_index = 0;
            }
            GameEvent::TurnChanged { color } => {
                if let Some(pos) = s.position(*color) {
                    s.turn_index = pos;
                }
                s.dice = None;
            }
            GameEvent::DiceRolled { d1, d2, .. } => {
                s.dice = Some(DiceRoll::new(*d1, *d2));
            }
            GameEvent::TokenMoved {
                color, piece, to, ..
            } => {
                if let Some(slot) = s
                    .players
                    .iter_mut()
                    .find(|p| p.color == *color)
                    .and_then(|p| p.pieces.get_mut(*piece as usize))
                {
                    *slot = *to;
                }
            }
            GameEvent::TokensCaptured { captured, .. } => {
                for c in captured {
                    if let Some(slot) = s
                        .players
                        .iter_mut()
                        .find(|p| p.color == c.color)
                        .and_then(|p| p.pieces.get_mut(c.piece as usize))
                    {
                        *slot = PieceLocation::Jail;
                    }
                }
            }
            GameEvent::MatchWon { color } => {
                if let Some(p) = s.players.iter_mut().find(|p| p.color == *color) {
                    p.finished = true;
                }
            }
            GameEvent::PlayerLeft { color } => {
                let Some(idx) = s.position(*color) else {
                    return;
                };
                let held_turn = s.match_started && !s.match_finished && idx == s.turn_index;
                s.players.remove(idx);
                if idx < s.turn_index {
                    s.turn_index -= 1;
                } else if idx == s.turn_index {
                    s.turn_index = if s.players.is_empty() {
                        0
                    } else {
                        idx % s.players.len()
                    };
                }
                if held_turn {
                    s.dice = None;
                }
            }
            GameEvent::AdminChanged { color } => {
                for p in &mut s.players {
                    p.is_admin = p.color == *color;
                }
            }
            GameEvent::MatchFinished { .. } => {
                s.match_finished = true;
                s.dice = None;
            }
            GameEvent::WaitingForPlayers { .. }
            | GameEvent::DeterminationStarted
            | GameEvent::DeterminationRollResult { .. }
            | GameEvent::DeterminationTie { .. }
            | GameEvent::DeterminationFinished { .. }
            | GameEvent::BonusOffered { .. }
            | GameEvent::TurnPassed { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PlayerInfo;
    use crate::types::{CapturedPiece, DieSelector, MoveAction};

    fn welcome(id: u32, color: Color) -> GameEvent {
        GameEvent::Welcome {
            player: PlayerId(id),
            color,
            name: format!("p{id}"),
        }
    }

    #[test]
    fn test_first_joiner_is_admin() {
        let snap = EventReplay::replay(&[welcome(1, Color::Red), welcome(2, Color::Blue)]);
        assert_eq!(snap.players.len(), 2);
        assert!(snap.players[0].is_admin);
        assert!(!snap.players[1].is_admin);
        assert_eq!(snap.current(), None);
    }

    #[test]
    fn test_match_started_reorders_seats() {
        let events = vec![
            welcome(1, Color::Red),
            welcome(2, Color::Blue),
            GameEvent::MatchStarted {
                players: vec![
                    PlayerInfo {
                        id: PlayerId(2),
                        color: Color::Blue,
                        name: "p2".into(),
                    },
                    PlayerInfo {
                        id: PlayerId(1),
                        color: Color::Red,
                        name: "p1".into(),
                    },
                ],
            },
            GameEvent::TurnChanged { color: Color::Blue },
        ];
        let snap = EventReplay::replay(&events);
        assert_eq!(snap.players[0].color, Color::Blue);
        assert_eq!(snap.current(), Some(Color::Blue));
    }

    #[test]
    fn test_match_started_seats_players_never_welcomed() {
        // What Bo's connection sees: its own welcome, then only broadcasts.
        let events = vec![
            GameEvent::Welcome {
                player: PlayerId(2),
                color: Color::Blue,
                name: "bo".into(),
            },
            GameEvent::MatchStarted {
                players: vec![
                    PlayerInfo {
                        id: PlayerId(1),
                        color: Color::Red,
                        name: "ana".into(),
                    },
                    PlayerInfo {
                        id: PlayerId(2),
                        color: Color::Blue,
                        name: "bo".into(),
                    },
                ],
            },
            GameEvent::TurnChanged { color: Color::Blue },
        ];
        let snap = EventReplay::replay(&events);
        assert_eq!(snap.players.len(), 2);
        assert_eq!(snap.current(), Some(Color::Blue));
        let red = snap.player(Color::Red).unwrap();
        assert_eq!(red.name, "ana");
        assert!(red.is_admin);
        assert_eq!(red.pieces, [PieceLocation::Jail; PIECES_PER_PLAYER]);
        assert!(!snap.player(Color::Blue).unwrap().is_admin);

        let broadcast_only = EventReplay::replay(&events[1..]);
        assert_eq!(broadcast_only, snap);
    }

    #[test]
    fn test_moves_and_captures_update_pieces() {
        let events = vec![
            welcome(1, Color::Red),
            welcome(2, Color::Blue),
            GameEvent::TokenMoved {
                color: Color::Blue,
                piece: 0,
                from: PieceLocation::Jail,
                to: PieceLocation::Main(40),
                action: MoveAction::Release,
            },
            GameEvent::TokenMoved {
                color: Color::Red,
                piece: 2,
                from: PieceLocation::Main(38),
                to: PieceLocation::Main(40),
                action: MoveAction::Move(DieSelector::First),
            },
            GameEvent::TokensCaptured {
                by: Color::Red,
                captured: vec![CapturedPiece {
                    color: Color::Blue,
                    piece: 0,
                }],
            },
        ];
        let snap = EventReplay::replay(&events);
        let red = snap.player(Color::Red).unwrap();
        let blue = snap.player(Color::Blue).unwrap();
        assert_eq!(red.pieces[2], PieceLocation::Main(40));
        assert_eq!(blue.pieces[0], PieceLocation::Jail);
    }

    #[test]
    fn test_turn_change_clears_dice() {
        let mut replay = EventReplay::new();
        replay.apply(&welcome(1, Color::Red));
        replay.apply(&GameEvent::DiceRolled {
            color: Color::Red,
            d1: 3,
            d2: 4,
            sum: 7,
            is_double: false,
        });
        assert_eq!(replay.snapshot().dice, Some(DiceRoll::new(3, 4)));
        replay.apply(&GameEvent::TurnChanged { color: Color::Red });
        assert_eq!(replay.snapshot().dice, None);
    }
}
