//! Turns the parsed draft list into the live repertoire.
//!
//! Illustrative moves, passes and everything below them are dropped. Every
//! kept node gets its canonical SAN line, which must be unique.

use std::collections::{HashMap, VecDeque};

use crate::notation::DraftNode;

/// Two notes lines that lead to the same canonical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateLine {
    pub first_source_line: usize,
    pub second_source_line: usize,
    pub line: String,
}

impl std::fmt::Display for DuplicateLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Duplicate lines {} and {} ({})",
            self.first_source_line, self.second_source_line, self.line
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Draft list is empty or does not start with the root")]
    MissingRoot,
    #[error("Found {} duplicate line(s): {}", .0.len(), format_duplicates(.0))]
    Duplicates(Vec<DuplicateLine>),
    #[error("No canonical line for '{label}' at line {source_line}")]
    NoCanonicalLine { source_line: usize, label: String },
}

fn format_duplicates(duplicates: &[DuplicateLine]) -> String {
    duplicates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Prune the draft list and fill in canonical lines.
///
/// Returns the live nodes in breadth-first order, root first. Fails with
/// every duplicate found if two kept nodes share a canonical line.
pub fn build_tree(drafts: Vec<DraftNode>) -> Result<Vec<DraftNode>, BuildError> {
    if drafts.first().map_or(true, |root| root.parent.is_some()) {
        return Err(BuildError::MissingRoot);
    }

    let total = drafts.len();
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for node in &drafts {
        if let Some(parent) = node.parent {
            children.entry(parent).or_default().push(node.uid);
        }
    }

    let mut slots: Vec<Option<DraftNode>> = drafts.into_iter().map(Some).collect();
    let mut live = Vec::new();
    let mut queue = VecDeque::from([0u32]);

    while let Some(uid) = queue.pop_front() {
        let Some(mut node) = slots.get_mut(uid as usize).and_then(Option::take) else {
            continue;
        };
        if uid != 0 {
            node.line = canonical_line(&node)?;
        }
        for child in children.get(&uid).into_iter().flatten() {
            let Some(draft) = slots.get(*child as usize).and_then(Option::as_ref) else {
                continue;
            };
            if !draft.illustrative && !draft.variation.contains_null() {
                queue.push_back(*child);
            }
        }
        live.push(node);
    }

    let duplicates = find_duplicates(&live);
    if !duplicates.is_empty() {
        for duplicate in &duplicates {
            tracing::error!("{}", duplicate);
        }
        return Err(BuildError::Duplicates(duplicates));
    }

    tracing::info!("Kept {} of {} nodes after pruning", live.len(), total);
    Ok(live)
}

/// SAN line from the root to `node`. Passes have none.
fn canonical_line(node: &DraftNode) -> Result<String, BuildError> {
    node.variation
        .to_san_line()
        .ok_or_else(|| BuildError::NoCanonicalLine {
            source_line: node.source_line,
            label: node.label.clone(),
        })
}

/// Every collision between canonical lines, in breadth-first order.
pub fn find_duplicates(nodes: &[DraftNode]) -> Vec<DuplicateLine> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    for node in nodes {
        match seen.get(node.line.as_str()) {
            Some(&first) => duplicates.push(DuplicateLine {
                first_source_line: first,
                second_source_line: node.source_line,
                line: node.line.clone(),
            }),
            None => {
                seen.insert(&node.line, node.source_line);
            }
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::parse_notes;

    fn build(notes: &str) -> Result<Vec<DraftNode>, BuildError> {
        build_tree(parse_notes(notes).unwrap())
    }

    #[test]
    fn test_pass_has_no_canonical_line() {
        let drafts = parse_notes("1. e4 *").unwrap();
        assert_eq!(canonical_line(&drafts[1]).unwrap(), "1. e4");
        match canonical_line(&drafts[2]) {
            Err(BuildError::NoCanonicalLine { source_line, label }) => {
                assert_eq!(source_line, 1);
                assert_eq!(label, "1. ... *");
            }
            other => panic!("expected NoCanonicalLine, got {:?}", other),
        }
    }

    #[test]
    fn test_canonical_lines() {
        let live = build("1. e4 e5 2. Nf3\n1. ... c5").unwrap();
        let lines: Vec<&str> = live.iter().map(|n| n.line.as_str()).collect();
        assert_eq!(lines, vec!["", "1. e4", "1. e4 e5", "1. e4 c5", "1. e4 e5 2. Nf3"]);
    }

    #[test]
    fn test_canonical_line_ignores_source_abbreviation() {
        let live = build("1. e4 f5 2. Qh5").unwrap();
        assert_eq!(live[3].line, "1. e4 f5 2. Qh5+");
        assert_eq!(live[3].label, "2. Qh5");
    }

    #[test]
    fn test_illustrative_subtree_pruned() {
        let live = build("1. e4 e5\nil. 2. Qh5 Nc6 3. Bc4\n2. Nf3").unwrap();
        let uids: Vec<u32> = live.iter().map(|n| n.uid).collect();
        assert_eq!(uids, vec![0, 1, 2, 6]);
    }

    #[test]
    fn test_null_move_subtree_pruned() {
        let live = build("1. e4 * 2. d4\n1. ... e5").unwrap();
        let labels: Vec<&str> = live.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["", "1. e4", "1. ... e5"]);
    }

    #[test]
    fn test_every_duplicate_reported() {
        let notes = "\
1. e4 e5
1. e4
1. d4 d5
1. d4
1. e4
";
        let err = build(notes).unwrap_err();
        let BuildError::Duplicates(duplicates) = err else {
            panic!("expected duplicates");
        };
        assert_eq!(duplicates.len(), 3);
        assert!(duplicates.iter().all(|d| d.line == "1. e4" || d.line == "1. d4"));
        assert_eq!(
            duplicates
                .iter()
                .filter(|d| d.line == "1. e4" && d.first_source_line == 1)
                .count(),
            2
        );
    }

    #[test]
    fn test_duplicate_through_transposed_abbreviation() {
        // Same move written with and without the check marker.
        let err = build("1. e4 f5 2. Qh5+\n2. Qh5").unwrap_err();
        let BuildError::Duplicates(duplicates) = err else {
            panic!("expected duplicates");
        };
        assert_eq!(
            duplicates,
            vec![DuplicateLine {
                first_source_line: 1,
                second_source_line: 2,
                line: "1. e4 f5 2. Qh5+".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicates_below_illustrative_ignored() {
        let live = build("1. e4\nil. 1. e4").unwrap();
        assert_eq!(live.len(), 2);
    }
}
