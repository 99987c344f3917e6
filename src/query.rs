use arrayvec::ArrayVec;
use shakmaty::{CastlingMode, CastlingSide, Color, EnPassantMode, Position, Role, Square};

use crate::{errors::QueryError, types::Castling};

/// Maximum number of pieces of one color in a legal chess position.
pub const MAX_PIECES_PER_SIDE: usize = 16;

/// Square code terminating a [`PieceList`].
pub const NO_SQUARE: u32 = 64;

/// Piece code terminating a [`PieceList`].
pub const NO_PIECE: u8 = 0;

/// Pieces of one color, as parallel square and piece code arrays.
///
/// Both arrays are always terminated by [`NO_SQUARE`] and [`NO_PIECE`].
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PieceList {
    squares: ArrayVec<u32, { MAX_PIECES_PER_SIDE + 1 }>,
    pieces: ArrayVec<u8, { MAX_PIECES_PER_SIDE + 1 }>,
}

impl Default for PieceList {
    fn default() -> PieceList {
        let mut list = PieceList {
            squares: ArrayVec::new(),
            pieces: ArrayVec::new(),
        };
        list.squares.push(NO_SQUARE);
        list.pieces.push(NO_PIECE);
        list
    }
}

impl PieceList {
    fn push(&mut self, sq: Square, role: Role) -> Result<(), QueryError> {
        if self.len() >= MAX_PIECES_PER_SIDE {
            return Err(QueryError::TooManyPieces);
        }
        let end = self.len();
        self.squares.insert(end, u32::from(sq));
        self.pieces.insert(end, role as u8);
        Ok(())
    }

    /// Number of pieces, excluding the terminator.
    pub fn len(&self) -> usize {
        self.squares.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Square codes, including the terminator.
    pub fn squares(&self) -> &[u32] {
        &self.squares
    }

    /// Piece codes, including the terminator.
    pub fn pieces(&self) -> &[u8] {
        &self.pieces
    }

    /// Decodes the entries before the terminator.
    pub fn iter(&self) -> impl Iterator<Item = (Square, Role)> + '_ {
        self.squares
            .iter()
            .zip(self.pieces.iter())
            .take(self.len())
            .filter_map(|(&sq, &piece)| {
                let sq = *Square::ALL.get(usize::try_from(sq).ok()?)?;
                let role = *Role::ALL.get(usize::from(piece).checked_sub(1)?)?;
                Some((sq, role))
            })
    }
}

/// A position in the flat format expected by the probing library.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Query {
    pub turn: Color,
    pub ep_square: Option<Square>,
    pub castling: Castling,
    pub white: PieceList,
    pub black: PieceList,
}

impl Query {
    /// Translates a position.
    ///
    /// The same position always yields the same query: pieces are listed in
    /// order of increasing square index.
    ///
    /// # Errors
    ///
    /// * [`QueryError::AmbiguousCastling`] if castling rights are present
    ///   and `mode` is [`CastlingMode::Chess960`].
    /// * [`QueryError::TooManyPieces`] if a side has more than
    ///   [`MAX_PIECES_PER_SIDE`] pieces.
    pub fn from_position<P: Position>(pos: &P, mode: CastlingMode) -> Result<Query, QueryError> {
        let castles = pos.castles();
        let mut castling = Castling::empty();
        if castles.any() {
            if mode == CastlingMode::Chess960 {
                return Err(QueryError::AmbiguousCastling);
            }
            for (color, side, flag) in [
                (Color::White, CastlingSide::KingSide, Castling::WHITE_SHORT),
                (Color::White, CastlingSide::QueenSide, Castling::WHITE_LONG),
                (Color::Black, CastlingSide::KingSide, Castling::BLACK_SHORT),
                (Color::Black, CastlingSide::QueenSide, Castling::BLACK_LONG),
            ] {
                if castles.has(color, side) {
                    castling |= flag;
                }
            }
        }

        let board = pos.board();
        let mut white = PieceList::default();
        let mut black = PieceList::default();
        for (color, list) in [(Color::White, &mut white), (Color::Black, &mut black)] {
            for sq in board.by_color(color) {
                if let Some(role) = board.role_at(sq) {
                    list.push(sq, role)?;
                }
            }
        }

        Ok(Query {
            turn: pos.turn(),
            ep_square: pos.ep_square(EnPassantMode::Legal),
            castling,
            white,
            black,
        })
    }

    /// Side to move code: 0 for white, 1 for black.
    pub fn turn_code(&self) -> u32 {
        match self.turn {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// En passant square code, or [`NO_SQUARE`].
    pub fn ep_code(&self) -> u32 {
        self.ep_square.map_or(NO_SQUARE, u32::from)
    }

    pub fn by_color(&self, color: Color) -> &PieceList {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }
}
