use crate::{EngineInfo, Score};
use cozy_chess::{Move, Piece};

/// Incoming message from UCI engine
#[derive(Debug, Clone)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `None` when the engine answers `bestmove (none)` in a terminal position.
    BestMove { mv: Option<Move> },
    Info(EngineInfo),
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, crate::UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            }
            Ok(UciMessage::Id {
                name: tokens[1].to_string(),
                value: tokens[2..].join(" "),
            })
        }

        Some(&"bestmove") => {
            let Some(&best) = tokens.get(1) else {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            };
            let mv = match best {
                "(none)" | "0000" => None,
                s => Some(parse_uci_move(s)?),
            };
            Ok(UciMessage::BestMove { mv })
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(crate::UciError::UnknownMessage(line.to_string())),
    }
}

/// Parse an "info" line from the engine
fn parse_info_line(tokens: &[&str]) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "multipv" => {
                i += 1;
                info.multipv = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                i += 1;
                if let (Some(&kind), Some(value)) = (tokens.get(i), tokens.get(i + 1)) {
                    i += 1;
                    info.score = match kind {
                        "cp" => value.parse().ok().map(Score::Centipawns),
                        "mate" => value.parse().ok().map(Score::Mate),
                        _ => None,
                    };
                    // Bounded scores come from aspiration windows and are not final.
                    if matches!(tokens.get(i + 1), Some(&"lowerbound") | Some(&"upperbound")) {
                        info.bound = true;
                        i += 1;
                    }
                }
            }
            // Everything after these runs to the end of the line.
            "pv" | "string" => break,
            _ => {}
        }
        i += 1;
    }

    info
}

/// Parse UCI move format (e2e4, e7e8q)
pub fn parse_uci_move(s: &str) -> Result<Move, crate::UciError> {
    let invalid = || crate::UciError::InvalidMove(s.to_string());
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(invalid());
    }

    let from = chess::parse_square(&s[0..2]).ok_or_else(invalid)?;
    let to = chess::parse_square(&s[2..4]).ok_or_else(invalid)?;
    let promotion = match s.get(4..5) {
        None => None,
        Some("q") => Some(Piece::Queen),
        Some("r") => Some(Piece::Rook),
        Some("b") => Some(Piece::Bishop),
        Some("n") => Some(Piece::Knight),
        Some(_) => return Err(invalid()),
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bestmove() {
        let msg = parse_uci_message("bestmove e2e4 ponder e7e5").unwrap();
        match msg {
            UciMessage::BestMove { mv } => {
                assert_eq!(chess::format_uci_move(mv.unwrap()), "e2e4");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_parse_bestmove_none() {
        let msg = parse_uci_message("bestmove (none)").unwrap();
        assert!(matches!(msg, UciMessage::BestMove { mv: None, .. }));
    }

    #[test]
    fn test_parse_info() {
        let msg = parse_uci_message("info depth 12 score cp 35 nodes 15234 pv e2e4 e7e5").unwrap();
        match msg {
            UciMessage::Info(info) => {
                assert_eq!(info.depth, Some(12));
                assert!(matches!(info.score, Some(Score::Centipawns(35))));
                assert!(!info.bound);
                assert_eq!(info.multipv, None);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_parse_info_mate_and_bound() {
        let msg =
            parse_uci_message("info depth 20 multipv 2 score mate -3 lowerbound nodes 10").unwrap();
        match msg {
            UciMessage::Info(info) => {
                assert!(matches!(info.score, Some(Score::Mate(-3))));
                assert!(info.bound);
                assert_eq!(info.multipv, Some(2));
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_parse_uci_move_rejects_garbage() {
        assert!(parse_uci_move("e2").is_err());
        assert!(parse_uci_move("e7e8x").is_err());
        assert!(parse_uci_move("z9e4").is_err());
    }
}
