//! Parser for plain-text repertoire notes.
//!
//! A note line looks like
//!
//! ```text
//! 3. Bb5 a6 (+0.30) : the main line
//! il. 5. Nxe5 : does not work because of Qd4
//! 12... Bb7 13. Nc3
//! ```
//!
//! Only lines starting (after optional spaces) with an optional `il.`
//! marker, an optional `~` and a digit are considered. Everything after the
//! first `:` is a comment for the last move of the line. A move is attached
//! to the most recently created node that has the matching move number and
//! side to move, which lets the author go back to an earlier branch point by
//! just writing its move number.

use std::collections::HashMap;

use chess::{PieceColor, Variation, VariationError};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::evaluation::Evaluation;

static VALID_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(il\.\s?)?~?\d").expect("valid line pattern"));

static MOVE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(il\.)?~?(\d+)(\.+)").expect("move number pattern"));

static MOVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(il\.)?((?:[KQBNR][a-h]?[1-8]?|[a-h])?x?[a-h][1-8](?:=?[QRBN])?[+#]?|O-O-O|O-O|0-0-0|0-0|\*)",
    )
    .expect("move pattern")
});

const ELLIPSIS: &str = "...";
const NULL_MOVE: &str = "*";
const ILLUSTRATIVE: &str = "il.";

/// A node as read from the notes, before pruning and evaluation.
#[derive(Debug, Clone)]
pub struct DraftNode {
    /// Creation index; the root is 0.
    pub uid: u32,
    pub parent: Option<u32>,
    /// Moves from the starting position to this node.
    pub variation: Variation,
    pub evaluation: Option<Evaluation>,
    pub comment: String,
    /// Move number prefixed move text, e.g. `"3. ... a6"`.
    pub label: String,
    pub illustrative: bool,
    /// 1-based line of the notes the node was read from; 0 for the root.
    pub source_line: usize,
    /// Canonical SAN line, filled in by the tree builder.
    pub line: String,
}

impl DraftNode {
    fn root() -> Self {
        Self {
            uid: 0,
            parent: None,
            variation: Variation::new(),
            evaluation: None,
            comment: String::new(),
            label: String::new(),
            illustrative: false,
            source_line: 0,
            line: String::new(),
        }
    }

    fn key(&self) -> (u32, PieceColor) {
        (self.variation.fullmove_number(), self.variation.side_to_move())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid move '{token}' at line {line}: {source}")]
    IllegalMove {
        line: usize,
        token: String,
        #[source]
        source: VariationError,
    },
}

/// Running state of a parse: the draft list plus the index used to find
/// parents.
struct NotesParser {
    nodes: Vec<DraftNode>,
    /// Most recent node for each (move number, side to move) of its position.
    latest: HashMap<(u32, PieceColor), u32>,
    fullmove_number: u32,
    turn: PieceColor,
}

impl NotesParser {
    fn new() -> Self {
        Self {
            nodes: vec![DraftNode::root()],
            latest: HashMap::new(),
            fullmove_number: 1,
            turn: PieceColor::White,
        }
    }

    fn parse_line(&mut self, line_number: usize, text: &str) -> Result<(), ParseError> {
        let (moves, comment) = match text.split_once(':') {
            Some((moves, comment)) => (moves, comment.trim()),
            None => (text, ""),
        };
        let line_illustrative = moves.trim_start().starts_with(ILLUSTRATIVE);
        let mut created: Option<u32> = None;

        for token in moves.split_whitespace() {
            let mut rest = token;

            if let Some(caps) = MOVE_NUMBER.captures(rest) {
                match caps[2].parse() {
                    Ok(number) => self.fullmove_number = number,
                    Err(e) => tracing::warn!(
                        line = line_number,
                        token,
                        "Keeping move number {}: {}",
                        self.fullmove_number,
                        e
                    ),
                }
                self.turn = if caps[3].len() >= 3 {
                    PieceColor::Black
                } else {
                    PieceColor::White
                };
                // "1.e4" carries a move after the number.
                rest = &rest[caps[0].len()..];
                if rest.is_empty() {
                    continue;
                }
            }

            if rest == ELLIPSIS {
                self.turn = PieceColor::Black;
            } else if let Some(caps) = MOVE.captures(rest) {
                let illustrative = line_illustrative || caps.get(1).is_some();
                let uid = self.push_move(line_number, &caps[2], illustrative)?;
                created = Some(uid);
            } else if rest.len() >= 2 && rest.starts_with('(') && rest.ends_with(')') {
                let inner = &rest[1..rest.len() - 1];
                match (created, inner.parse::<Evaluation>()) {
                    (Some(uid), Ok(evaluation)) => {
                        self.nodes[uid as usize].evaluation = Some(evaluation);
                    }
                    (None, _) => {
                        tracing::debug!(line = line_number, token, "Evaluation before any move, ignored");
                    }
                    (_, Err(e)) => {
                        tracing::warn!(line = line_number, token, "Ignoring annotation: {}", e);
                    }
                }
            } else {
                tracing::trace!(line = line_number, token, "Ignoring token");
            }
        }

        match created {
            Some(uid) => self.nodes[uid as usize].comment = comment.to_string(),
            None if !comment.is_empty() => {
                tracing::debug!(line = line_number, "Comment on a line without moves, ignored");
            }
            None => {}
        }
        Ok(())
    }

    fn push_move(
        &mut self,
        line_number: usize,
        move_text: &str,
        illustrative: bool,
    ) -> Result<u32, ParseError> {
        let parent_uid = self
            .latest
            .get(&(self.fullmove_number, self.turn))
            .copied()
            .unwrap_or(0);
        let parent = &self.nodes[parent_uid as usize];

        let mut variation = parent.variation.clone();
        let played = if move_text == NULL_MOVE {
            variation.play_null()
        } else {
            variation.play_san(move_text).map(|_| ())
        };
        played.map_err(|source| ParseError::IllegalMove {
            line: line_number,
            token: move_text.to_string(),
            source,
        })?;

        let mut label = format!("{}. ", self.fullmove_number);
        if self.turn == PieceColor::Black {
            label.push_str("... ");
        }
        label.push_str(move_text);

        let uid = self.nodes.len() as u32;
        let node = DraftNode {
            uid,
            parent: Some(parent_uid),
            variation,
            evaluation: None,
            comment: String::new(),
            label,
            illustrative,
            source_line: line_number,
            line: String::new(),
        };
        tracing::trace!(uid, parent = parent_uid, label = %node.label, "Created node");
        self.latest.insert(node.key(), uid);
        self.nodes.push(node);

        // Only move-number tokens change the number.
        self.turn = self.turn.opposite();
        Ok(uid)
    }
}

/// True if the line carries repertoire content.
pub fn is_valid_line(text: &str) -> bool {
    VALID_LINE.is_match(text)
}

/// Parse notes into the flat list of draft nodes, root first, indexed by uid.
///
/// Any illegal move aborts the whole parse.
pub fn parse_notes(text: &str) -> Result<Vec<DraftNode>, ParseError> {
    let mut parser = NotesParser::new();
    for (index, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() || !is_valid_line(raw) {
            continue;
        }
        parser.parse_line(index + 1, raw.trim())?;
    }
    tracing::info!("Parsed {} nodes from notes", parser.nodes.len());
    Ok(parser.nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(nodes: &[DraftNode]) -> Vec<&str> {
        nodes.iter().skip(1).map(|n| n.label.as_str()).collect()
    }

    #[test]
    fn test_simple_line() {
        let nodes = parse_notes("1. e4 e5 2. Nf3 (0.20)").unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(labels(&nodes), vec!["1. e4", "1. ... e5", "2. Nf3"]);
        assert_eq!(nodes[1].parent, Some(0));
        assert_eq!(nodes[2].parent, Some(1));
        assert_eq!(nodes[3].parent, Some(2));
        assert_eq!(nodes[3].evaluation, Some(Evaluation::Numeric(0.2)));
        assert_eq!(nodes[1].evaluation, None);
    }

    #[test]
    fn test_fullmove_numbers() {
        let nodes = parse_notes("1. e4 e5 2. Nf3").unwrap();
        // The move number of the position *before* each move.
        let before: Vec<u32> = nodes[1..]
            .iter()
            .map(|n| nodes[n.parent.unwrap() as usize].variation.fullmove_number())
            .collect();
        assert_eq!(before, vec![1, 1, 2]);
    }

    #[test]
    fn test_branch_resumes_from_move_number() {
        let notes = "\
1. e4 e5 2. Nf3 Nc6
    2. ... Nf6 : Petroff
1. ... c5 : Sicilian
";
        let nodes = parse_notes(notes).unwrap();
        assert_eq!(nodes.len(), 7);
        // 2... Nf6 hangs off 2. Nf3, the latest node with Black to move at move 2.
        assert_eq!(nodes[5].label, "2. ... Nf6");
        assert_eq!(nodes[5].parent, Some(3));
        assert_eq!(nodes[5].comment, "Petroff");
        // 1... c5 hangs off 1. e4.
        assert_eq!(nodes[6].parent, Some(1));
        assert_eq!(nodes[6].comment, "Sicilian");
    }

    #[test]
    fn test_black_move_number_shorthand() {
        let nodes = parse_notes("1. d4 d5 2. c4\n2... e6\n2. ... c6").unwrap();
        assert_eq!(nodes[4].label, "2. ... e6");
        assert_eq!(nodes[4].parent, Some(3));
        assert_eq!(nodes[5].label, "2. ... c6");
        assert_eq!(nodes[5].parent, Some(3));
    }

    #[test]
    fn test_move_number_glued_to_move() {
        let nodes = parse_notes("1.e4 e5 2.Nf3").unwrap();
        assert_eq!(labels(&nodes), vec!["1. e4", "1. ... e5", "2. Nf3"]);
    }

    #[test]
    fn test_unnumbered_white_move_keeps_move_number() {
        // No node has White to move at move 1 yet, so Nf3 starts from the root.
        let nodes = parse_notes("1. e4 e5 Nf3").unwrap();
        assert_eq!(nodes[3].label, "1. Nf3");
        assert_eq!(nodes[3].parent, Some(0));
    }

    #[test]
    fn test_overflowing_move_number_keeps_previous() {
        let nodes = parse_notes("1. e4 99999999999. ... e5").unwrap();
        assert_eq!(labels(&nodes), vec!["1. e4", "1. ... e5"]);
        assert_eq!(nodes[2].parent, Some(1));
    }

    #[test]
    fn test_invalid_lines_skipped() {
        let notes = "Ruy Lopez notes\n\n1. e4 e5\nsee also: other file\n";
        let nodes = parse_notes(notes).unwrap();
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_comment_keeps_colons() {
        let nodes = parse_notes("1. e4 : best by test: 1.e4").unwrap();
        assert_eq!(nodes[1].comment, "best by test: 1.e4");
    }

    #[test]
    fn test_comment_goes_to_last_node_of_line() {
        let nodes = parse_notes("1. e4 e5 : symmetric").unwrap();
        assert_eq!(nodes[1].comment, "");
        assert_eq!(nodes[2].comment, "symmetric");
    }

    #[test]
    fn test_illustrative_markers() {
        let notes = "1. e4 e5\nil. 2. Qh5 : premature\n2. il.Bc4 Nf6\n";
        let nodes = parse_notes(notes).unwrap();
        assert!(!nodes[1].illustrative);
        assert!(nodes[3].illustrative);
        assert!(nodes[4].illustrative);
        assert!(!nodes[5].illustrative);
    }

    #[test]
    fn test_null_move() {
        let nodes = parse_notes("1. e4 * 2. d4").unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[2].label, "1. ... *");
        assert!(nodes[2].variation.contains_null());
        assert_eq!(nodes[3].parent, Some(2));
    }

    #[test]
    fn test_unknown_tokens_ignored() {
        let nodes = parse_notes("1. e4 !? e5 (novelty) ±").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2].evaluation, None);
    }

    #[test]
    fn test_annotation_glyphs_stripped_from_label() {
        let nodes = parse_notes("1. e4! e5?!").unwrap();
        assert_eq!(labels(&nodes), vec!["1. e4", "1. ... e5"]);
    }

    #[test]
    fn test_illegal_move_reports_line_and_token() {
        let err = parse_notes("1. e4 e5\n\n2. Ke3").unwrap_err();
        match err {
            ParseError::IllegalMove { line, token, .. } => {
                assert_eq!(line, 3);
                assert_eq!(token, "Ke3");
            }
        }
    }

    #[test]
    fn test_mate_evaluation_annotation() {
        let nodes = parse_notes("1. f3 e5 2. g4 Qh4# (-M0)").unwrap();
        assert_eq!(nodes[4].evaluation, Some(Evaluation::MateForBlack(0)));
    }
}
