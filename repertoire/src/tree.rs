//! The persisted repertoire tree and read-only queries over it.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chess::PieceColor;
use serde::{Deserialize, Serialize};

use crate::evaluation::{cmp_optional, Evaluation, InvalidEvaluation};
use crate::notation::DraftNode;

/// A node as exchanged at the upload/export boundary.
///
/// Fields are declared in alphabetical order so the JSON keys come out
/// sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub cmt: String,
    pub ev: String,
    pub fen: String,
    pub lbl: String,
    pub line: String,
    pub p: Option<u32>,
    pub uid: u32,
}

impl From<&DraftNode> for NodeRecord {
    fn from(node: &DraftNode) -> Self {
        Self {
            cmt: node.comment.clone(),
            ev: node.evaluation.map(|e| e.to_string()).unwrap_or_default(),
            fen: node.variation.fen(),
            lbl: node.label.clone(),
            line: node.line.clone(),
            p: node.parent,
            uid: node.uid,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub uid: u32,
    pub parent: Option<u32>,
    pub fen: String,
    pub evaluation: Option<Evaluation>,
    pub comment: String,
    pub label: String,
    pub line: String,
}

impl Node {
    /// Side to move in the node's position.
    pub fn turn(&self) -> Result<PieceColor, TreeError> {
        chess::fen::side_to_move(&self.fen).map_err(|_| TreeError::InvalidFen(self.uid))
    }

    /// Depth in plies, see [`chess::fen::ply_depth`].
    pub fn depth(&self) -> Result<u32, TreeError> {
        chess::fen::ply_depth(&self.fen).map_err(|_| TreeError::InvalidFen(self.uid))
    }

    /// The move text of the label, e.g. `Nf3` for `"2. Nf3"`.
    pub fn move_san(&self) -> Option<&str> {
        self.label.split(' ').next_back().filter(|s| !s.is_empty())
    }
}

impl TryFrom<NodeRecord> for Node {
    type Error = TreeError;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        let evaluation = match record.ev.trim() {
            "" => None,
            text => Some(
                text.parse()
                    .map_err(|e| TreeError::InvalidEvaluation(record.uid, e))?,
            ),
        };
        Ok(Self {
            uid: record.uid,
            parent: record.p,
            fen: record.fen,
            evaluation,
            comment: record.cmt,
            label: record.lbl,
            line: record.line,
        })
    }
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            cmt: node.comment.clone(),
            ev: node.evaluation.map(|e| e.to_string()).unwrap_or_default(),
            fen: node.fen.clone(),
            lbl: node.label.clone(),
            line: node.line.clone(),
            p: node.parent,
            uid: node.uid,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("Tree has no root")]
    NoRoot,
    #[error("Tree has several roots: {0} and {1}")]
    SeveralRoots(u32, u32),
    #[error("Duplicate uid {0}")]
    DuplicateUid(u32),
    #[error("Node {0} references missing parent {1}")]
    MissingParent(u32, u32),
    #[error("Nodes {0} and {1} share the line {2:?}")]
    DuplicateLine(u32, u32, String),
    #[error("Node {0} is not reachable from the root")]
    Unreachable(u32),
    #[error("Node {0} has an invalid evaluation: {1}")]
    InvalidEvaluation(u32, #[source] InvalidEvaluation),
    #[error("Node {0} has an invalid FEN")]
    InvalidFen(u32),
    #[error("Unknown node {0}")]
    UnknownNode(u32),
}

/// Nodes included in a window, each mapped to its included children in
/// evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    /// Node the window hangs from after climbing towards the root.
    pub focus: u32,
    pub children: BTreeMap<u32, Vec<u32>>,
}

/// A validated repertoire: single root, acyclic, unique uids and lines.
#[derive(Debug, Clone)]
pub struct RepertoireTree {
    root: u32,
    nodes: BTreeMap<u32, Node>,
    /// Children of each node ordered by ascending evaluation.
    children: HashMap<u32, Vec<u32>>,
}

impl RepertoireTree {
    pub fn from_records(records: Vec<NodeRecord>) -> Result<Self, TreeError> {
        let mut nodes = BTreeMap::new();
        let mut root = None;
        for record in records {
            let node = Node::try_from(record)?;
            if node.parent.is_none() {
                if let Some(existing) = root {
                    return Err(TreeError::SeveralRoots(existing, node.uid));
                }
                root = Some(node.uid);
            }
            let uid = node.uid;
            if nodes.insert(uid, node).is_some() {
                return Err(TreeError::DuplicateUid(uid));
            }
        }
        let root = root.ok_or(TreeError::NoRoot)?;

        let mut lines: HashMap<&str, u32> = HashMap::new();
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for node in nodes.values() {
            if let Some(first) = lines.insert(node.line.as_str(), node.uid) {
                return Err(TreeError::DuplicateLine(first, node.uid, node.line.clone()));
            }
            if let Some(parent) = node.parent {
                if !nodes.contains_key(&parent) {
                    return Err(TreeError::MissingParent(node.uid, parent));
                }
                children.entry(parent).or_default().push(node.uid);
            }
        }

        for kids in children.values_mut() {
            kids.sort_by(|a, b| {
                cmp_optional(nodes[a].evaluation.as_ref(), nodes[b].evaluation.as_ref())
                    .then(a.cmp(b))
            });
        }

        let tree = Self {
            root,
            nodes,
            children,
        };
        tree.check_reachable()?;
        Ok(tree)
    }

    /// Every node must hang from the root; a cycle leaves its members
    /// unreachable.
    fn check_reachable(&self) -> Result<(), TreeError> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([self.root]);
        while let Some(uid) = queue.pop_front() {
            if seen.insert(uid) {
                queue.extend(self.children(uid).iter().copied());
            }
        }
        match self.nodes.keys().find(|uid| !seen.contains(uid)) {
            Some(uid) => Err(TreeError::Unreachable(*uid)),
            None => Ok(()),
        }
    }

    /// Records in uid order.
    pub fn to_records(&self) -> Vec<NodeRecord> {
        self.nodes.values().map(NodeRecord::from).collect()
    }

    pub fn root(&self) -> &Node {
        &self.nodes[&self.root]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, uid: u32) -> Result<&Node, TreeError> {
        self.nodes.get(&uid).ok_or(TreeError::UnknownNode(uid))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn find_by_line(&self, line: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.line == line)
    }

    /// Children ordered by ascending evaluation (best for Black first).
    pub fn children(&self, uid: u32) -> &[u32] {
        self.children.get(&uid).map_or(&[], Vec::as_slice)
    }

    pub fn parent(&self, uid: u32) -> Option<&Node> {
        self.nodes.get(&uid)?.parent.and_then(|p| self.nodes.get(&p))
    }

    /// Other children of the same parent.
    pub fn siblings(&self, uid: u32) -> Vec<u32> {
        match self.nodes.get(&uid).and_then(|n| n.parent) {
            Some(parent) => self
                .children(parent)
                .iter()
                .copied()
                .filter(|&c| c != uid)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The node followed by its ancestors, stopping before the unlabeled
    /// root.
    pub fn ancestors(&self, uid: u32) -> Result<Vec<&Node>, TreeError> {
        let mut result = vec![self.get(uid)?];
        while let Some(parent) = result.last().and_then(|n| self.parent(n.uid)) {
            if parent.label.is_empty() {
                break;
            }
            result.push(parent);
        }
        Ok(result)
    }

    pub fn is_leaf(&self, uid: u32) -> bool {
        self.children(uid).is_empty()
    }

    /// A node with children, all of which are leaves.
    pub fn is_pre_leaf(&self, uid: u32) -> bool {
        let kids = self.children(uid);
        !kids.is_empty() && kids.iter().all(|&c| self.is_leaf(c))
    }

    pub fn pre_leaves(&self) -> Vec<u32> {
        self.nodes
            .keys()
            .copied()
            .filter(|&uid| self.is_pre_leaf(uid))
            .collect()
    }

    /// Best child for `side`: highest evaluation for White, lowest for
    /// Black.
    pub fn best_child(&self, uid: u32, side: PieceColor) -> Option<u32> {
        let kids = self.children(uid);
        match side {
            PieceColor::White => kids.last().copied(),
            PieceColor::Black => kids.first().copied(),
        }
    }

    /// Child whose piece placement starts with the placement of `fen`. A
    /// full FEN and a bare (or partial) placement field both work.
    pub fn find_child_by_fen(&self, uid: u32, fen: &str) -> Option<u32> {
        let prefix = chess::fen::placement(fen);
        self.children(uid)
            .iter()
            .copied()
            .find(|c| chess::fen::placement(&self.nodes[c].fen).starts_with(prefix))
    }

    /// UCI text of the move leading to `uid`, re-derived from the parent
    /// position. `None` for the root.
    pub fn move_uci(&self, uid: u32) -> Option<String> {
        let node = self.nodes.get(&uid)?;
        let parent = self.parent(uid)?;
        let board = chess::parse_fen(&parent.fen).ok()?;
        let mv = chess::parse_san(&board, node.move_san()?).ok()?;
        Some(chess::format_standard_uci(&board, mv))
    }

    /// Window around `uid`.
    ///
    /// Climbs up to `pred` ancestors, widening `succ` by one per level
    /// climbed, then descends breadth-first from the reached node. A child is
    /// included only while the remaining `succ` is unbounded or positive.
    pub fn window(
        &self,
        uid: u32,
        pred: Option<u32>,
        succ: Option<u32>,
    ) -> Result<Window, TreeError> {
        let mut focus = self.get(uid)?.uid;
        let mut pred = pred.unwrap_or(0);
        let mut succ = succ;
        while pred > 0 {
            let Some(parent) = self.nodes[&focus].parent else {
                break;
            };
            focus = parent;
            pred -= 1;
            succ = succ.map(|s| s.saturating_add(1));
        }

        let mut children = BTreeMap::new();
        let mut queue = VecDeque::from([(focus, succ)]);
        while let Some((current, remaining)) = queue.pop_front() {
            let mut included = Vec::new();
            if remaining.map_or(true, |r| r > 0) {
                for &child in self.children(current) {
                    included.push(child);
                    queue.push_back((child, remaining.map(|r| r - 1)));
                }
            }
            children.insert(current, included);
        }

        Ok(Window { focus, children })
    }
}
