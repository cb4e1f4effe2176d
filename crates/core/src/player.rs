//! Player module - a seat at the table with its four pieces

use arrayvec::ArrayVec;

use crate::error::IllegalAction;
use crate::piece::Piece;
use crate::types::{Color, ConnectionId, PieceState, PlayerId, PIECES_PER_PLAYER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    color: Color,
    name: String,
    pieces: [Piece; PIECES_PER_PLAYER],
    is_admin: bool,
    is_host: bool,
    connection: ConnectionId,
    finished: bool,
}

impl Player {
    pub fn new(id: PlayerId, color: Color, name: impl Into<String>, connection: ConnectionId) -> Self {
        Self {
            id,
            color,
            name: name.into(),
            pieces: std::array::from_fn(|i| Piece::new(color, i as u8)),
            is_admin: false,
            is_host: false,
            connection,
            finished: false,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// All four pieces reached Home
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn set_admin(&mut self, admin: bool) {
        self.is_admin = admin;
    }

    pub(crate) fn set_host(&mut self, host: bool) {
        self.is_host = host;
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn pieces(&self) -> &[Piece; PIECES_PER_PLAYER] {
        &self.pieces
    }

    pub fn piece(&self, index: u8) -> Result<&Piece, IllegalAction> {
        self.pieces
            .get(index as usize)
            .ok_or(IllegalAction::InvalidPiece(index))
    }

    pub(crate) fn piece_mut(&mut self, index: u8) -> Result<&mut Piece, IllegalAction> {
        self.pieces
            .get_mut(index as usize)
            .ok_or(IllegalAction::InvalidPiece(index))
    }

    /// Number of pieces in the given state
    pub fn count_in(&self, state: PieceState) -> usize {
        self.pieces.iter().filter(|p| p.state() == state).count()
    }

    pub fn has_jailed_pieces(&self) -> bool {
        self.pieces.iter().any(Piece::is_jailed)
    }

    pub fn all_home(&self) -> bool {
        self.pieces.iter().all(Piece::is_home)
    }

    /// Indices of pieces that may take the triple doubles bonus
    pub fn bonus_eligible(&self) -> ArrayVec<u8, PIECES_PER_PLAYER> {
        self.pieces
            .iter()
            .filter(|p| p.is_active() || p.in_home_lane())
            .map(Piece::index)
            .collect()
    }

    /// Active piece indices standing on `cell`
    pub fn active_on(&self, cell: u8) -> ArrayVec<u8, PIECES_PER_PLAYER> {
        self.pieces
            .iter()
            .filter(|p| p.main_position() == Some(cell))
            .map(Piece::index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PieceLocation;

    #[test]
    fn test_new_player_has_four_jailed_pieces() {
        let p = Player::new(PlayerId(1), Color::Red, "ana", ConnectionId(9));
        assert_eq!(p.pieces().len(), 4);
        assert_eq!(p.count_in(PieceState::Jailed), 4);
        assert!(p.has_jailed_pieces());
        assert!(!p.all_home());
        assert!(p.pieces().iter().all(|piece| piece.color() == Color::Red));
        assert_eq!(p.connection(), ConnectionId(9));
    }

    #[test]
    fn test_state_counts_always_sum_to_four() {
        let mut p = Player::new(PlayerId(1), Color::Blue, "bo", ConnectionId(1));
        p.piece_mut(0).unwrap().place(PieceLocation::Main(21));
        p.piece_mut(1).unwrap().place(PieceLocation::Lane(3));
        p.piece_mut(2).unwrap().send_home();
        let total: usize = [
            PieceState::Jailed,
            PieceState::Active,
            PieceState::HomeLane,
            PieceState::Home,
        ]
        .into_iter()
        .map(|s| p.count_in(s))
        .sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_bonus_eligible_excludes_jailed_and_home() {
        let mut p = Player::new(PlayerId(1), Color::Blue, "bo", ConnectionId(1));
        p.piece_mut(0).unwrap().place(PieceLocation::Main(21));
        p.piece_mut(1).unwrap().place(PieceLocation::Lane(3));
        p.piece_mut(2).unwrap().send_home();
        assert_eq!(p.bonus_eligible().as_slice(), &[0, 1]);
    }

    #[test]
    fn test_piece_index_out_of_range() {
        let p = Player::new(PlayerId(1), Color::Blue, "bo", ConnectionId(1));
        assert_eq!(p.piece(4).err(), Some(IllegalAction::InvalidPiece(4)));
    }
}
