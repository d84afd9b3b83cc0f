//! A move sequence played out from a starting position.

use cozy_chess::{Board, Move};

use crate::fen::{format_fen, parse_fen, FenError};
use crate::san::{format_san, legal_moves, parse_san, SanError};
use crate::types::PieceColor;
use crate::uci::convert_uci_castling_to_cozy;

/// A single step of a variation: a real move or a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Move(Move),
    Null,
}

/// A position reached from `start` by playing `steps` in order.
#[derive(Debug, Clone)]
pub struct Variation {
    start: Board,
    board: Board,
    steps: Vec<Step>,
}

impl Variation {
    /// Start a variation from the standard starting position.
    pub fn new() -> Self {
        Self::from_board(Board::default())
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        Ok(Self::from_board(parse_fen(fen)?))
    }

    fn from_board(board: Board) -> Self {
        Self {
            start: board.clone(),
            board,
            steps: Vec::new(),
        }
    }

    /// Current position.
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn fen(&self) -> String {
        format_fen(&self.board)
    }

    pub fn side_to_move(&self) -> PieceColor {
        self.board.side_to_move().into()
    }

    pub fn fullmove_number(&self) -> u32 {
        u32::from(self.board.fullmove_number())
    }

    /// True if any step of the variation is a pass.
    pub fn contains_null(&self) -> bool {
        self.steps.contains(&Step::Null)
    }

    /// Play a SAN move from the current position.
    pub fn play_san(&mut self, san: &str) -> Result<Move, VariationError> {
        let mv = parse_san(&self.board, san)?;
        self.play(mv)?;
        Ok(mv)
    }

    /// Play a move given in standard UCI text (`e2e4`, `e7e8q`, `e1g1`).
    pub fn play_uci(&mut self, uci: &str) -> Result<Move, VariationError> {
        let mv: Move = uci
            .parse()
            .map_err(|_| VariationError::InvalidUci(uci.to_string()))?;
        let mv = convert_uci_castling_to_cozy(mv, &legal_moves(&self.board));
        self.play(mv)?;
        Ok(mv)
    }

    /// Play a move after checking that it is legal.
    pub fn play(&mut self, mv: Move) -> Result<(), VariationError> {
        if !legal_moves(&self.board).contains(&mv) {
            return Err(VariationError::IllegalMove);
        }
        self.board.play_unchecked(mv);
        self.steps.push(Step::Move(mv));
        Ok(())
    }

    /// Pass the turn to the other side. Not allowed while in check.
    pub fn play_null(&mut self) -> Result<(), VariationError> {
        if !self.board.checkers().is_empty() {
            return Err(VariationError::NullMoveInCheck);
        }
        self.board = passed_board(&self.board)?;
        self.steps.push(Step::Null);
        Ok(())
    }

    /// SAN of every move, re-derived from the start position.
    ///
    /// Returns `None` if the variation contains a pass.
    pub fn san_moves(&self) -> Option<Vec<String>> {
        let mut board = self.start.clone();
        let mut sans = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let Step::Move(mv) = *step else {
                return None;
            };
            sans.push(format_san(&board, mv));
            board.play_unchecked(mv);
        }
        Some(sans)
    }

    /// Numbered SAN rendering of the whole variation, e.g.
    /// `1. e4 e5 2. Nf3` or `3... Nc6 4. Bb5` when starting with Black.
    pub fn to_san_line(&self) -> Option<String> {
        let sans = self.san_moves()?;
        let mut number = u32::from(self.start.fullmove_number());
        let mut side: PieceColor = self.start.side_to_move().into();
        let mut parts = Vec::with_capacity(sans.len() * 3 / 2);
        for (i, san) in sans.into_iter().enumerate() {
            match side {
                PieceColor::White => parts.push(format!("{}.", number)),
                PieceColor::Black if i == 0 => parts.push(format!("{}...", number)),
                PieceColor::Black => {}
            }
            parts.push(san);
            if side == PieceColor::Black {
                number += 1;
            }
            side = side.opposite();
        }
        Some(parts.join(" "))
    }
}

/// The same position with the other side to move, as written in FEN: no en
/// passant square, halfmove clock advanced, move number advanced after Black.
fn passed_board(board: &Board) -> Result<Board, VariationError> {
    let fen = format_fen(board);
    let mut fields: Vec<String> = fen.split_whitespace().map(str::to_string).collect();
    if fields.len() != 6 {
        return Err(VariationError::Fen(FenError::InvalidFormat));
    }
    let black_passes = fields[1] == "b";
    fields[1] = if black_passes { "w" } else { "b" }.to_string();
    fields[3] = "-".to_string();
    let halfmove: u32 = fields[4].parse().map_err(|_| FenError::InvalidFormat)?;
    fields[4] = (halfmove + 1).to_string();
    if black_passes {
        let fullmove: u32 = fields[5].parse().map_err(|_| FenError::InvalidFormat)?;
        fields[5] = (fullmove + 1).to_string();
    }
    Ok(parse_fen(&fields.join(" "))?)
}

impl Default for Variation {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VariationError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("Invalid UCI move {0:?}")]
    InvalidUci(String),
    #[error("Null move not allowed while in check")]
    NullMoveInCheck,
    #[error("SAN error: {0}")]
    San(#[from] SanError),
    #[error("FEN error: {0}")]
    Fen(#[from] FenError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_san_line_from_start() {
        let mut v = Variation::new();
        for san in ["e4", "e5", "Nf3"] {
            v.play_san(san).unwrap();
        }
        assert_eq!(v.to_san_line().unwrap(), "1. e4 e5 2. Nf3");
        assert_eq!(v.fullmove_number(), 2);
        assert_eq!(v.side_to_move(), PieceColor::Black);
    }

    #[test]
    fn test_san_line_is_canonical() {
        // Source text may omit the check marker; the rendered line does not.
        let mut v = Variation::new();
        for san in ["e4", "f5", "Qh5"] {
            v.play_san(san).unwrap();
        }
        assert_eq!(v.to_san_line().unwrap(), "1. e4 f5 2. Qh5+");
    }

    #[test]
    fn test_san_line_starting_with_black() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        let mut v = Variation::from_fen(fen).unwrap();
        v.play_san("c5").unwrap();
        v.play_san("Nf3").unwrap();
        assert_eq!(v.to_san_line().unwrap(), "1... c5 2. Nf3");
    }

    #[test]
    fn test_null_move() {
        let mut v = Variation::new();
        v.play_san("e4").unwrap();
        v.play_null().unwrap();
        assert_eq!(v.side_to_move(), PieceColor::White);
        assert_eq!(v.fullmove_number(), 2);
        assert!(v.contains_null());
        assert_eq!(
            v.fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 1 2"
        );
        v.play_san("d4").unwrap();
        assert_eq!(v.side_to_move(), PieceColor::Black);
        assert!(v.to_san_line().is_none());
    }

    #[test]
    fn test_null_move_refused_in_check() {
        let mut v = Variation::new();
        for san in ["e4", "f5", "Qh5"] {
            v.play_san(san).unwrap();
        }
        assert!(matches!(v.play_null(), Err(VariationError::NullMoveInCheck)));
    }

    #[test]
    fn test_illegal_san() {
        let mut v = Variation::new();
        assert!(v.play_san("Nf6").is_err());
        assert!(v.steps().is_empty());
    }

    #[test]
    fn test_play_uci_standard_castling() {
        let mut v = Variation::new();
        for uci in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "e1g1"] {
            v.play_uci(uci).unwrap();
        }
        assert_eq!(
            v.to_san_line().unwrap(),
            "1. e4 e5 2. Nf3 Nc6 3. Bc4 Nf6 4. O-O"
        );
        assert!(matches!(v.play_uci("e9e5"), Err(VariationError::InvalidUci(_))));
        assert!(matches!(v.play_uci("a7a4"), Err(VariationError::IllegalMove)));
    }
}
