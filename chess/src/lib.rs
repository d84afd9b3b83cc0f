//! Rules-facing helpers for the repertoire tools.
//!
//! Legal move generation and position bookkeeping come from cozy-chess; this
//! crate adds the notations the rest of the workspace speaks: FEN fields,
//! SAN parsing/formatting, standard UCI move text and numbered variations.

pub mod converters;
pub mod fen;
pub mod san;
pub mod types;
pub mod uci;
pub mod variation;

pub use converters::*;
pub use fen::{format_fen, parse_fen, FenError, START_FEN};
pub use san::{format_san, legal_moves, parse_san, SanError};
pub use types::{PieceColor, PieceKind};
pub use uci::{
    convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, format_standard_uci,
    format_uci_move,
};
pub use variation::{Step, Variation, VariationError};
