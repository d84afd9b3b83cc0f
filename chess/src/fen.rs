use cozy_chess::Board;

use crate::types::PieceColor;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    if fen.split_whitespace().next().is_none() {
        return Err(FenError::InvalidFormat);
    }
    fen.parse().map_err(|_| FenError::InvalidFormat)
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// Piece placement field of a FEN (the part before the first space).
pub fn placement(fen: &str) -> &str {
    fen.split_whitespace().next().unwrap_or("")
}

/// Side to move as recorded in the FEN's second field.
pub fn side_to_move(fen: &str) -> Result<PieceColor, FenError> {
    match fen.split_whitespace().nth(1) {
        Some("w") => Ok(PieceColor::White),
        Some("b") => Ok(PieceColor::Black),
        _ => Err(FenError::InvalidFormat),
    }
}

/// Fullmove number as recorded in the FEN's sixth field.
pub fn fullmove_number(fen: &str) -> Result<u32, FenError> {
    fen.split_whitespace()
        .nth(5)
        .and_then(|n| n.parse().ok())
        .ok_or(FenError::InvalidFormat)
}

/// Depth of a position measured in plies: twice the move number, plus one
/// when Black is to move. The starting position has depth 2.
pub fn ply_depth(fen: &str) -> Result<u32, FenError> {
    let fullmove = fullmove_number(fen)?;
    let extra = match side_to_move(fen)? {
        PieceColor::White => 0,
        PieceColor::Black => 1,
    };
    Ok(2 * fullmove + extra)
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
}
