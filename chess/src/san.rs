//! Standard Algebraic Notation on top of cozy-chess move generation.
//!
//! cozy-chess encodes castling as "king captures own rook" (`e1h1`); SAN
//! castling (`O-O`, `O-O-O`) is mapped onto those moves here.

use cozy_chess::{Board, Move, Piece, Square};

use crate::converters::{char_to_file, char_to_rank, file_to_char, format_square, rank_to_char};
use crate::types::PieceKind;

/// All legal moves in a position.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// True when `mv` is a castling move in cozy-chess encoding.
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

fn is_capture(board: &Board, mv: Move) -> bool {
    if is_castling(board, mv) {
        return false;
    }
    if board.piece_on(mv.to).is_some() {
        return true;
    }
    // En passant: a pawn changing file onto an empty square.
    board.piece_on(mv.from) == Some(Piece::Pawn) && mv.from.file() != mv.to.file()
}

/// Parse Standard Algebraic Notation (SAN) move
///
/// Check, mate and annotation suffixes (`+`, `#`, `!`, `?`) are ignored, as is
/// the capture marker. Promotions may be written `e8=Q` or `e8Q`.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let trimmed = san.trim_end_matches(['+', '#', '!', '?']);
    match trimmed {
        "O-O" | "0-0" => return find_castle(board, true, san),
        "O-O-O" | "0-0-0" => return find_castle(board, false, san),
        _ => {}
    }

    let mut chars: Vec<char> = trimmed.chars().collect();
    let piece = match chars.first().copied().and_then(PieceKind::from_san_letter) {
        Some(piece) => {
            chars.remove(0);
            piece
        }
        None => PieceKind::Pawn,
    };

    let mut promotion = None;
    if let Some(promo) = chars.last().copied().and_then(PieceKind::from_san_letter) {
        if piece != PieceKind::Pawn {
            return Err(SanError::InvalidPromotion(san.to_string()));
        }
        promotion = Some(Piece::from(promo));
        chars.pop();
        if chars.last() == Some(&'=') {
            chars.pop();
        }
    }

    let rank_char = chars.pop().ok_or_else(|| SanError::InvalidFormat(san.to_string()))?;
    let file_char = chars.pop().ok_or_else(|| SanError::InvalidFormat(san.to_string()))?;
    let to_rank = char_to_rank(rank_char).ok_or(SanError::InvalidRank(rank_char))?;
    let to_file = char_to_file(file_char).ok_or(SanError::InvalidFile(file_char))?;
    let to = Square::new(to_file, to_rank);

    let mut from_file = None;
    let mut from_rank = None;
    for c in chars {
        if c == 'x' {
            continue;
        }
        if let Some(file) = char_to_file(c) {
            from_file = Some(file);
        } else if let Some(rank) = char_to_rank(c) {
            from_rank = Some(rank);
        } else {
            return Err(SanError::InvalidFormat(san.to_string()));
        }
    }

    let wanted = Piece::from(piece);
    let candidates: Vec<Move> = legal_moves(board)
        .into_iter()
        .filter(|mv| {
            mv.to == to
                && board.piece_on(mv.from) == Some(wanted)
                && !is_castling(board, *mv)
                && mv.promotion == promotion
                && from_file.map_or(true, |f| mv.from.file() == f)
                && from_rank.map_or(true, |r| mv.from.rank() == r)
        })
        .collect();

    match candidates.as_slice() {
        [] => Err(SanError::NoLegalMove(san.to_string())),
        [mv] => Ok(*mv),
        _ => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

fn find_castle(board: &Board, king_side: bool, san: &str) -> Result<Move, SanError> {
    legal_moves(board)
        .into_iter()
        .find(|mv| {
            is_castling(board, *mv)
                && ((mv.to.file() as u8 > mv.from.file() as u8) == king_side)
        })
        .ok_or_else(|| SanError::NoLegalMove(san.to_string()))
}

/// Format a legal move as SAN, including disambiguation and the check or
/// mate suffix.
pub fn format_san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return format!("{}{}", format_square(mv.from), format_square(mv.to));
    };

    let mut san = String::new();
    if is_castling(board, mv) {
        if mv.to.file() as u8 > mv.from.file() as u8 {
            san.push_str("O-O");
        } else {
            san.push_str("O-O-O");
        }
    } else {
        let capture = is_capture(board, mv);
        if piece == Piece::Pawn {
            if capture {
                san.push(file_to_char(mv.from.file()));
            }
        } else {
            san.push(PieceKind::from(piece).san_letter());
            push_disambiguation(&mut san, board, mv, piece);
        }
        if capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));
        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(PieceKind::from(promo).san_letter());
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if after.status() == cozy_chess::GameStatus::Won {
        san.push('#');
    } else if !after.checkers().is_empty() {
        san.push('+');
    }
    san
}

fn push_disambiguation(san: &mut String, board: &Board, mv: Move, piece: Piece) {
    let rivals: Vec<Square> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && !is_castling(board, *other)
        })
        .map(|other| other.from)
        .collect();
    if rivals.is_empty() {
        return;
    }
    if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        san.push(file_to_char(mv.from.file()));
    } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        san.push(rank_to_char(mv.from.rank()));
    } else {
        san.push_str(&format_square(mv.from));
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid file: {0}")]
    InvalidFile(char),
    #[error("Invalid rank: {0}")]
    InvalidRank(char),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}
