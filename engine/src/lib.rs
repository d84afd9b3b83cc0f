//! UCI engine process management.
//!
//! Spawns a UCI engine (Stockfish by default), drives it over stdin/stdout and
//! exposes a request/response `analyse` call on top of the raw protocol.

pub mod stockfish;
pub mod uci;

pub use stockfish::{find_stockfish_path, EngineConfig, StockfishEngine};
pub use uci::{UciError, UciMessage};

use cozy_chess::Move;

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    SetPosition { fen: String },
    SetOption { name: String, value: Option<String> },
    IsReady,
    /// Fixed-depth search.
    Go { depth: u8 },
    Quit,
}

/// Events received from the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    UciOk,
    ReadyOk,
    BestMove(Option<Move>),
    Info(EngineInfo),
}

/// Engine analysis information
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub score: Option<Score>,
    /// Set when the score is a lower or upper bound rather than exact.
    pub bound: bool,
    pub multipv: Option<u8>,
}

/// Engine score, always relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Moves to mate. Negative when the side to move gets mated.
    Mate(i32),
}

impl Score {
    /// Flip to the other side's perspective.
    pub fn negate(self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    /// Re-express a side-to-move score from White's point of view.
    pub fn white_relative(self, side_to_move: chess::PieceColor) -> Self {
        match side_to_move {
            chess::PieceColor::White => self,
            chess::PieceColor::Black => self.negate(),
        }
    }
}

/// Result of a finished search.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Last exact score reported, relative to the side to move.
    pub score: Option<Score>,
    pub depth: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_relative() {
        use chess::PieceColor;
        assert_eq!(
            Score::Centipawns(30).white_relative(PieceColor::Black),
            Score::Centipawns(-30)
        );
        assert_eq!(Score::Mate(2).white_relative(PieceColor::White), Score::Mate(2));
        assert_eq!(Score::Mate(-4).white_relative(PieceColor::Black), Score::Mate(4));
    }
}
