//! Exercises: a line to replay from a given position, where the player has
//! to find their own moves.

use chess::{PieceColor, Variation, VariationError};
use repertoire::{RepertoireTree, TreeError};
use serde::{Deserialize, Serialize};

use crate::position::PositionTraining;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseMove {
    /// The player has to find this move; otherwise it is played for them.
    pub ask: bool,
    /// Standard UCI text, e.g. `e1g1` for short castling.
    pub uci: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// FEN the moves start from.
    pub starting_position: String,
    /// FEN shown before the exercise starts.
    pub cover_position: String,
    pub moves: Vec<ExerciseMove>,
    /// Side to move in `starting_position`.
    pub first_move: PieceColor,
    #[serde(default)]
    pub created_at: u64,
}

impl Exercise {
    pub fn asked_moves(&self) -> usize {
        self.moves.iter().filter(|m| m.ask).count()
    }

    /// Play every move from the starting position, failing on the first
    /// illegal one.
    pub fn replay(&self) -> Result<Variation, VariationError> {
        let mut variation = Variation::from_fen(&self.starting_position)?;
        for mv in &self.moves {
            variation.play_uci(&mv.uci)?;
        }
        Ok(variation)
    }
}

/// Exercise for one pre-leaf node, with a fresh training record.
///
/// The player is the side to move at `pre_leaf` and the line ends with
/// their best reply. It starts `span` plies earlier, but never before the
/// first move of the repertoire. `None` when the line asks nothing.
pub fn generate_exercise(
    tree: &RepertoireTree,
    pre_leaf: u32,
    span: u32,
    now: u64,
) -> Result<Option<(Exercise, PositionTraining)>, TreeError> {
    let player = tree.get(pre_leaf)?.turn()?;
    let Some(leaf) = tree.best_child(pre_leaf, player) else {
        return Ok(None);
    };

    let mut root = tree.get(pre_leaf)?;
    for _ in 0..span {
        match tree.parent(root.uid) {
            Some(parent) if parent.parent.is_some() => root = parent,
            _ => break,
        }
    }

    // Nodes after `root` down to the leaf, in playing order.
    let mut path = vec![tree.get(leaf)?];
    while let Some(parent) = tree.parent(path[path.len() - 1].uid) {
        if parent.uid == root.uid {
            break;
        }
        path.push(parent);
    }
    path.reverse();

    let mut moves = Vec::with_capacity(path.len());
    let mut cover_position = None;
    let mut mover = root;
    for &node in &path {
        let ask = mover.turn()? == player;
        if ask && cover_position.is_none() {
            cover_position = Some(mover.fen.clone());
        }
        let uci = tree
            .move_uci(node.uid)
            .ok_or(TreeError::InvalidFen(node.uid))?;
        moves.push(ExerciseMove { ask, uci });
        mover = node;
    }

    let Some(cover_position) = cover_position else {
        tracing::debug!(pre_leaf, "Line has no move to ask, skipped");
        return Ok(None);
    };

    let leaf_node = tree.get(leaf)?;
    let id = uuid::Uuid::new_v4().to_string();
    let exercise = Exercise {
        id: id.clone(),
        title: leaf_node.line.clone(),
        description: leaf_node.comment.clone(),
        starting_position: root.fen.clone(),
        cover_position,
        moves,
        first_move: root.turn()?,
        created_at: now,
    };
    let training = PositionTraining::new(id, root.uid, leaf, root.depth()?, now);
    Ok(Some((exercise, training)))
}

/// One exercise per pre-leaf node of the tree.
pub fn generate_exercises(
    tree: &RepertoireTree,
    span: u32,
    now: u64,
) -> Result<Vec<(Exercise, PositionTraining)>, TreeError> {
    let mut generated = Vec::new();
    for pre_leaf in tree.pre_leaves() {
        if let Some(pair) = generate_exercise(tree, pre_leaf, span, now)? {
            generated.push(pair);
        }
    }
    tracing::info!("Generated {} exercises", generated.len());
    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repertoire::NodeRecord;

    /// Compile notes into a tree, scoring nodes from their labels.
    fn tree(notes: &str, scores: &[(&str, &str)]) -> RepertoireTree {
        let drafts = repertoire::build_repertoire(notes).unwrap();
        let records: Vec<NodeRecord> = drafts
            .iter()
            .map(|d| {
                let mut record = NodeRecord::from(d);
                record.ev = scores
                    .iter()
                    .find(|(label, _)| *label == record.lbl)
                    .map_or("0.00", |(_, ev)| *ev)
                    .to_string();
                record
            })
            .collect();
        RepertoireTree::from_records(records).unwrap()
    }

    fn ucis(exercise: &Exercise) -> Vec<(&str, bool)> {
        exercise.moves.iter().map(|m| (m.uci.as_str(), m.ask)).collect()
    }

    #[test]
    fn test_white_line_ends_on_best_reply() {
        let tree = tree(
            "1. e4 e5 2. Nf3 Nc6 3. Bb5\n3. Bc4",
            &[("3. Bb5", "+0.40"), ("3. Bc4", "+0.20")],
        );
        let pre_leaf = tree.find_by_line("1. e4 e5 2. Nf3 Nc6").unwrap().uid;
        let (exercise, training) = generate_exercise(&tree, pre_leaf, 6, 100).unwrap().unwrap();

        // Six plies up would pass the first move, so the line starts there.
        let start = tree.find_by_line("1. e4").unwrap();
        assert_eq!(training.node_root, start.uid);
        assert_eq!(exercise.starting_position, start.fen);
        assert_eq!(exercise.first_move, PieceColor::Black);
        assert_eq!(
            ucis(&exercise),
            vec![("e7e5", false), ("g1f3", true), ("b8c6", false), ("f1b5", true)]
        );
        assert_eq!(exercise.title, "1. e4 e5 2. Nf3 Nc6 3. Bb5");
        let end = exercise.replay().unwrap();
        assert_eq!(end.fen(), tree.find_by_line(&exercise.title).unwrap().fen);
        assert_eq!(training.node_leaf, tree.find_by_line(&exercise.title).unwrap().uid);
        // The player first moves after 1... e5.
        let cover = tree.find_by_line("1. e4 e5").unwrap();
        assert_eq!(exercise.cover_position, cover.fen);
        assert_eq!(training.root_depth, 3);
        assert_eq!(training.tries, 0);
        assert_eq!(training.elo, 1000.0);
    }

    #[test]
    fn test_black_picks_lowest_and_span_limits_start() {
        let tree = tree(
            "1. d4 d5 2. c4 e6 3. Nc3\n3. ... c6\n3. ... dxc4",
            &[("3. ... c6", "+0.30"), ("3. ... dxc4", "+0.50"), ("2. ... e6", "+0.35")],
        );
        let pre_leaf = tree.find_by_line("1. d4 d5 2. c4 e6 3. Nc3").unwrap().uid;
        let (exercise, training) = generate_exercise(&tree, pre_leaf, 2, 0).unwrap().unwrap();

        let start = tree.find_by_line("1. d4 d5 2. c4").unwrap();
        assert_eq!(training.node_root, start.uid);
        assert_eq!(exercise.first_move, PieceColor::Black);
        assert_eq!(
            ucis(&exercise),
            vec![("e7e6", true), ("b1c3", false), ("c7c6", true)]
        );
        assert_eq!(exercise.cover_position, start.fen);
        assert_eq!(exercise.asked_moves(), 2);
    }

    #[test]
    fn test_generate_for_every_pre_leaf() {
        let tree = tree("1. e4 e5 2. Nf3\n1. ... c5 2. Nf3\n2. c3", &[]);
        let generated = generate_exercises(&tree, 6, 0).unwrap();
        assert_eq!(generated.len(), 2);
        let ids: std::collections::HashSet<&str> =
            generated.iter().map(|(e, _)| e.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(generated.iter().all(|(e, t)| e.id == t.id));
    }

    #[test]
    fn test_exercise_json_shape() {
        let exercise = Exercise {
            id: "x".to_string(),
            title: "t".to_string(),
            description: String::new(),
            starting_position: chess::START_FEN.to_string(),
            cover_position: chess::START_FEN.to_string(),
            moves: vec![ExerciseMove {
                ask: true,
                uci: "e2e4".to_string(),
            }],
            first_move: PieceColor::White,
            created_at: 0,
        };
        let json = serde_json::to_value(&exercise).unwrap();
        assert_eq!(json["first_move"], "white");
        assert_eq!(json["moves"][0]["uci"], "e2e4");

        let authored: Exercise = serde_json::from_str(
            r#"{"id":"a","title":"Sicilian","starting_position":"s","cover_position":"c",
                "moves":[{"ask":false,"uci":"e2e4"}],"first_move":"black"}"#,
        )
        .unwrap();
        assert_eq!(authored.description, "");
        assert_eq!(authored.first_move, PieceColor::Black);
    }
}
