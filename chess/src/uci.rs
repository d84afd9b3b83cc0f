//! UCI (Universal Chess Interface) move notation

use cozy_chess::{Board, File, Move, Square};

use crate::converters::{format_piece, format_square};
use crate::san::is_castling;

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// Only converts when the resulting move is in `legal_moves`; otherwise the
/// move is returned unchanged.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    if mv.from.file() != File::E || mv.promotion.is_some() {
        return mv;
    }
    let rook_file = match mv.to.file() {
        File::G => File::H,
        File::C => File::A,
        _ => return mv,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };
    if mv.to.rank() == mv.from.rank() && legal_moves.contains(&converted) {
        converted
    } else {
        mv
    }
}

/// Convert a cozy_chess castling move (king takes rook) to standard UCI
/// notation (king moves two squares). Other moves are returned unchanged.
pub fn convert_cozy_castling_to_uci(board: &Board, mv: Move) -> Move {
    if !is_castling(board, mv) {
        return mv;
    }
    let king_file = if mv.to.file() as u8 > mv.from.file() as u8 {
        File::G
    } else {
        File::C
    };
    Move {
        from: mv.from,
        to: Square::new(king_file, mv.from.rank()),
        promotion: None,
    }
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Format a move played from `board` in standard UCI notation, so castling
/// is rendered as `e1g1` rather than cozy-chess's `e1h1`.
pub fn format_standard_uci(board: &Board, mv: Move) -> String {
    format_uci_move(convert_cozy_castling_to_uci(board, mv))
}
